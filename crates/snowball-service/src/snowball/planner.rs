//! Fan-out planner.
//!
//! After a wave at depth `d` persists its accepted entries, the planner
//! produces the follow-up jobs: one jittered `verify-email` per entry and,
//! while `d < max_depth`, one `process-csv` at depth `d + 1` per contact
//! list of every accepted member who is a registered user and has not opted
//! out. The planner only describes jobs; the worker enqueues them.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use snowball_core::config::SnowballConfig;
use snowball_core::result::AppResult;
use snowball_database::store::UserStore;
use snowball_entity::email::EmailEntry;
use snowball_entity::job::{JobPayload, ProcessCsvPayload, VerifyEmailPayload};

/// A job the caller should enqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedJob {
    /// Typed payload; its default queue routes the job.
    pub payload: JobPayload,
    /// Delay before the job becomes eligible.
    pub delay_ms: i64,
    /// Claim priority.
    pub priority: i32,
}

/// Follow-up jobs of one wave.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanoutPlan {
    /// One verification per accepted entry.
    pub verifications: Vec<PlannedJob>,
    /// Next-depth waves.
    pub children: Vec<PlannedJob>,
}

impl FanoutPlan {
    /// All planned jobs, verifications first.
    pub fn into_jobs(self) -> impl Iterator<Item = PlannedJob> {
        self.verifications.into_iter().chain(self.children)
    }
}

/// Default source of rows in a child wave: they come from a registered
/// member's own contact list. A `source` column in the list still wins.
pub const MEMBER_LIST_SOURCE: &str = "verified_user";

/// Priority of a wave at `depth`: shallower waves run first.
pub fn child_priority(max_depth: u32, depth: u32) -> i32 {
    (max_depth as i32 + 1) - depth as i32
}

/// Plans verification and next-depth jobs for accepted entries.
#[derive(Debug, Clone)]
pub struct SnowballPlanner {
    users: Arc<dyn UserStore>,
    config: SnowballConfig,
}

impl SnowballPlanner {
    /// Create a new planner.
    pub fn new(users: Arc<dyn UserStore>, config: SnowballConfig) -> Self {
        Self { users, config }
    }

    /// Plan the follow-up jobs of the wave described by `params`.
    pub async fn plan(
        &self,
        params: &ProcessCsvPayload,
        accepted: &[EmailEntry],
    ) -> AppResult<FanoutPlan> {
        let verifications = accepted
            .iter()
            .map(|entry| PlannedJob {
                payload: JobPayload::VerifyEmail(VerifyEmailPayload {
                    email: entry.address.clone(),
                    repository_id: entry.repository_id,
                }),
                delay_ms: self.jitter_ms(),
                priority: 0,
            })
            .collect();

        let mut plan = FanoutPlan {
            verifications,
            children: Vec::new(),
        };
        if params.depth >= self.config.max_depth {
            debug!(depth = params.depth, "Maximum snowball depth reached");
            return Ok(plan);
        }

        let child_depth = params.depth + 1;
        let delay_ms = (child_depth as i64)
            .saturating_mul(self.config.depth_delay_seconds as i64)
            .saturating_mul(1000);
        let priority = child_priority(self.config.max_depth, child_depth);

        for entry in accepted {
            let Some(member) = self.users.find_by_email(&entry.address).await? else {
                continue;
            };
            if member.id == params.user_id || !member.allows_snowball() {
                continue;
            }
            for list in self.users.contact_lists_for(member.id).await? {
                plan.children.push(PlannedJob {
                    payload: JobPayload::ProcessCsv(ProcessCsvPayload {
                        repository_id: params.repository_id,
                        csv_payload: list.csv_payload,
                        user_id: member.id,
                        depth: child_depth,
                        source: Some(MEMBER_LIST_SOURCE.to_string()),
                        contact_list_id: Some(list.id),
                    }),
                    delay_ms,
                    priority,
                });
            }
        }

        debug!(
            repository_id = %params.repository_id,
            depth = params.depth,
            verifications = plan.verifications.len(),
            children = plan.children.len(),
            "Fan-out planned"
        );
        Ok(plan)
    }

    fn jitter_ms(&self) -> i64 {
        let max = self.config.verification_jitter_max_ms;
        if max == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..=max) as i64
    }
}
