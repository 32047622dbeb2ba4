//! Integration tests for snowball waves run through the job executor.

mod helpers;

use chrono::Utc;

use snowball_core::types::id::UserId;
use snowball_core::types::queue::{EMAIL_PROCESSING, SNOWBALL_DISTRIBUTION};
use snowball_entity::email::VerificationStatus;
use snowball_entity::job::JobStatus;
use snowball_entity::user::{ContactList, User};

async fn drain_all(app: &helpers::TestApp) {
    loop {
        let ran = app.drain(EMAIL_PROCESSING).await + app.drain(SNOWBALL_DISTRIBUTION).await;
        if ran == 0 {
            break;
        }
    }
}

#[tokio::test]
async fn test_reference_upload_end_to_end() {
    let app = helpers::TestApp::new().await;
    let repo = app.seed_repository(&["trusted.org"]).await;

    let job = app
        .upload(
            repo.id,
            UserId::new(),
            "email,name,source\na@trusted.org,Alice,verified_user\nbad-email,Bob,\n",
            0,
        )
        .await
        .unwrap();
    assert_eq!(job.queue, EMAIL_PROCESSING);

    let (ran, outcome) = app.run_next(EMAIL_PROCESSING).await.unwrap();
    assert_eq!(ran.id, job.id);
    let report = outcome.unwrap().unwrap();
    assert_eq!(report["processed"], 2);
    assert_eq!(report["added"], 1);
    assert_eq!(report["skipped"], 1);
    assert_eq!(report["reasons"]["malformed"], 1);
    assert_eq!(report["verificationsScheduled"], 1);
    assert_eq!(report["childrenScheduled"], 0);

    let entry = app
        .store
        .emails
        .find(repo.id, "a@trusted.org")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.quality_score, 0.7);
    assert_eq!(entry.name.as_deref(), Some("Alice"));
    assert_eq!(entry.verification_status, VerificationStatus::Pending);

    // The verification job follows on the same queue.
    assert_eq!(app.drain(EMAIL_PROCESSING).await, 1);
    let entry = app
        .store
        .emails
        .find(repo.id, "a@trusted.org")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.verification_status, VerificationStatus::Active);

    assert_eq!(app.job(job.id).await.status, JobStatus::Completed);

    let stored = app.store.repositories.find_by_id(repo.id).await.unwrap().unwrap();
    assert_eq!(stored.email_count, 1);
    assert_eq!(stored.growth_history.len(), 1);
    assert_eq!(stored.growth_rate, 0.0);

    let sent = app.notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, repo.owner_id);
    assert_eq!(sent[0].1, "repository_growth");
}

#[tokio::test]
async fn test_cascade_stops_at_max_depth() {
    let app = helpers::TestApp::new().await;
    let repo = app.seed_repository(&["trusted.org"]).await;

    // m0 knows m1, m1 knows m2, and so on.
    for i in 0..5 {
        app.seed_member(
            &format!("m{i}@trusted.org"),
            &format!("email,source\nm{}@trusted.org,verified_user\n", i + 1),
        )
        .await;
    }

    app.upload(
        repo.id,
        UserId::new(),
        "email,source\nm0@trusted.org,verified_user\n",
        0,
    )
    .await
    .unwrap();
    drain_all(&app).await;

    let members = app.store.emails.list_by_repository(repo.id).await.unwrap();
    let mut depths: Vec<(String, i32)> = members
        .iter()
        .map(|e| (e.address.clone(), e.snowball_depth))
        .collect();
    depths.sort();
    assert_eq!(
        depths,
        vec![
            ("m0@trusted.org".to_string(), 0),
            ("m1@trusted.org".to_string(), 1),
            ("m2@trusted.org".to_string(), 2),
            ("m3@trusted.org".to_string(), 3),
        ]
    );

    let completed = app
        .store
        .jobs
        .list_by_status(JobStatus::Completed, 100)
        .await
        .unwrap();
    let waves: Vec<_> = completed
        .iter()
        .filter(|j| j.job_type == "process-csv")
        .collect();
    assert_eq!(waves.len(), 4);
    assert!(waves.iter().all(|j| j.payload["depth"].as_u64().unwrap() <= 3));
    let deepest = waves
        .iter()
        .find(|j| j.payload["depth"] == 3)
        .expect("depth-3 wave ran");
    assert_eq!(deepest.result.as_ref().unwrap()["childrenScheduled"], 0);
    assert_eq!(deepest.queue, SNOWBALL_DISTRIBUTION);

    let failed = app.store.jobs.list_by_status(JobStatus::Failed, 10).await.unwrap();
    assert!(failed.is_empty());
}

#[tokio::test]
async fn test_member_list_without_source_column_fans_out() {
    let app = helpers::TestApp::new().await;
    let repo = app.seed_repository(&["trusted.org"]).await;
    app.seed_member("m0@trusted.org", "email\nfriend@trusted.org\n").await;

    app.upload(
        repo.id,
        UserId::new(),
        "email,source\nm0@trusted.org,verified_user\n",
        0,
    )
    .await
    .unwrap();
    drain_all(&app).await;

    let friend = app
        .store
        .emails
        .find(repo.id, "friend@trusted.org")
        .await
        .unwrap()
        .expect("member list contact added");
    assert_eq!(friend.snowball_depth, 1);
    assert_eq!(friend.source, "verified_user");
    assert_eq!(friend.quality_score, 0.7);
}

#[tokio::test]
async fn test_resubmission_adds_nothing() {
    let app = helpers::TestApp::new().await;
    let repo = app.seed_repository(&["trusted.org"]).await;
    let csv = "email,source\nx@trusted.org,verified_user\ny@trusted.org,verified_user\n";

    app.upload(repo.id, UserId::new(), csv, 0).await.unwrap();
    drain_all(&app).await;
    app.upload(repo.id, UserId::new(), csv, 0).await.unwrap();
    let (_, outcome) = app.run_next(EMAIL_PROCESSING).await.unwrap();
    let report = outcome.unwrap().unwrap();

    assert_eq!(report["added"], 0);
    assert_eq!(report["reasons"]["duplicate"], 2);
    assert_eq!(report["verificationsScheduled"], 0);

    let stored = app.store.repositories.find_by_id(repo.id).await.unwrap().unwrap();
    assert_eq!(stored.email_count, 2);
    assert_eq!(stored.growth_history.len(), 1);
}

#[tokio::test]
async fn test_opted_out_member_not_fanned_out() {
    let app = helpers::TestApp::new().await;
    let repo = app.seed_repository(&["trusted.org"]).await;

    let mut shy = User::new("shy@trusted.org", "Shy", Utc::now());
    shy.metadata.allow_snowball = Some(false);
    app.store.users.insert(&shy).await.unwrap();
    app.store
        .users
        .insert_contact_list(&ContactList::new(
            shy.id,
            None,
            "friends.csv",
            "email,source\nfriend@trusted.org,verified_user\n",
            Utc::now(),
        ))
        .await
        .unwrap();

    app.upload(
        repo.id,
        UserId::new(),
        "email,source\nshy@trusted.org,verified_user\n",
        0,
    )
    .await
    .unwrap();
    let (_, outcome) = app.run_next(EMAIL_PROCESSING).await.unwrap();
    assert_eq!(outcome.unwrap().unwrap()["childrenScheduled"], 0);

    drain_all(&app).await;
    assert!(
        app.store
            .emails
            .find(repo.id, "friend@trusted.org")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_low_quality_rows_rejected() {
    let app = helpers::TestApp::new().await;
    let repo = app.seed_repository(&["trusted.org"]).await;

    app.upload(
        repo.id,
        UserId::new(),
        "email\nnobody@elsewhere.net\nfan@reputable.com\n",
        0,
    )
    .await
    .unwrap();
    let (_, outcome) = app.run_next(EMAIL_PROCESSING).await.unwrap();
    let report = outcome.unwrap().unwrap();

    assert_eq!(report["processed"], 2);
    assert_eq!(report["added"], 0);
    assert_eq!(report["rejected"], 2);
    assert_eq!(report["reasons"]["low_quality"], 2);
    assert!(app.notifier.sent.lock().await.is_empty());
}
