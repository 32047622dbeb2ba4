//! Recursive, depth-bounded fan-out ("snowball").

pub mod planner;

pub use planner::{FanoutPlan, MEMBER_LIST_SOURCE, PlannedJob, SnowballPlanner, child_priority};
