//! Integration tests for the PostgreSQL job store.
//!
//! These need a disposable database:
//! `MODSYNC_TEST_DATABASE_URL=postgres://... cargo test -- --ignored --test-threads=1`

use modsync_core::error::ErrorKind;
use modsync_database::migration::run_migrations;
use modsync_database::{DatabasePool, JobStore};
use modsync_entity::job::{JobStatus, TerminalStatus, UpdatePayload};
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> DatabasePool {
    let url = std::env::var("MODSYNC_TEST_DATABASE_URL")
        .expect("MODSYNC_TEST_DATABASE_URL must be set for ignored tests");
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database");
    run_migrations(&pool).await.expect("Failed to run migrations");
    DatabasePool::from_pool(pool)
}

fn payload(to: &str) -> UpdatePayload {
    UpdatePayload {
        from_version: Some("1.0.0".to_string()),
        to_version: to.to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn test_enqueue_returns_existing_job_for_same_key() {
    let db = test_pool().await;
    let store = db.job_store::<UpdatePayload>();
    let subject = Uuid::new_v4();

    let first = store.enqueue(subject, "k1", &payload("1.1.0")).await.unwrap();
    let second = store.enqueue(subject, "k1", &payload("2.0.0")).await.unwrap();

    assert!(!first.already_existed);
    assert!(second.already_existed);
    assert_eq!(first.job_id, second.job_id);
    assert_eq!(
        store.get(first.job_id).await.unwrap().payload.to_version,
        "1.1.0"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_enqueue_creates_one_job() {
    let db = test_pool().await;
    let store = db.job_store::<UpdatePayload>();
    let subject = Uuid::new_v4();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.enqueue(subject, "same-key", &payload("1.1.0")).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    let created = outcomes.iter().filter(|o| !o.already_existed).count();
    assert_eq!(created, 1);
    let job_id = outcomes[0].job_id;
    assert!(outcomes.iter().all(|o| o.job_id == job_id));
    assert_eq!(store.list_for_subject(subject, 10).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_claims_have_one_winner() {
    let db = test_pool().await;
    let store = db.job_store::<UpdatePayload>();
    let job_id = store
        .enqueue(Uuid::new_v4(), "k", &payload("1.1.0"))
        .await
        .unwrap()
        .job_id;

    let claims = (0..8).map(|i| {
        let store = store.clone();
        async move { store.try_claim(job_id, &format!("w{i}")).await.unwrap() }
    });
    let wins = futures::future::join_all(claims)
        .await
        .into_iter()
        .filter(|won| *won)
        .count();

    assert_eq!(wins, 1);
    assert_eq!(store.get(job_id).await.unwrap().status, JobStatus::Running);
}

#[tokio::test]
#[ignore]
async fn test_finished_job_rejects_further_transitions() {
    let db = test_pool().await;
    let store = db.job_store::<UpdatePayload>();
    let job_id = store
        .enqueue(Uuid::new_v4(), "k", &payload("1.1.0"))
        .await
        .unwrap()
        .job_id;

    assert!(store.try_claim(job_id, "w1").await.unwrap());
    store
        .mark_terminal(job_id, TerminalStatus::Succeeded, None)
        .await
        .unwrap();

    let err = store
        .mark_terminal(job_id, TerminalStatus::Failed, Some("late"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTransition);

    // Direct writes are refused by the trigger as well.
    let direct = sqlx::query("UPDATE update_jobs SET status = 'queued' WHERE id = $1")
        .bind(job_id)
        .execute(db.pool())
        .await;
    assert!(direct.is_err());
}

#[tokio::test]
#[ignore]
async fn test_requeue_orphaned_only_touches_running_jobs() {
    let db = test_pool().await;
    let store = db.job_store::<UpdatePayload>();
    let subject = Uuid::new_v4();
    let orphan = store.enqueue(subject, "a", &payload("1.1.0")).await.unwrap().job_id;
    let done = store.enqueue(subject, "b", &payload("1.2.0")).await.unwrap().job_id;

    store.try_claim(orphan, "crashed").await.unwrap();
    store.try_claim(done, "w1").await.unwrap();
    store
        .mark_terminal(done, TerminalStatus::Failed, None)
        .await
        .unwrap();

    // Other tests may leave running jobs behind; only ours are asserted on.
    let requeued = store.requeue_orphaned().await.unwrap();
    assert!(requeued.contains(&orphan));
    assert!(!requeued.contains(&done));

    let job = store.get(orphan).await.unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.started_at.is_none());

    let failed = store.get(done).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("job failed"));
}
