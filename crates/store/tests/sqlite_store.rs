//! Integration tests for the SQLite transactional backend.

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use sqlx::SqlitePool;
use telq_core::clock;
use telq_store::{CompleteOutcome, JobStatus, NewJob, SqliteStore};

fn new_job(status: JobStatus, description: impl Into<String>) -> NewJob {
    let timestamp = clock::utc_now();
    NewJob {
        status,
        created_at: timestamp,
        updated_at: timestamp,
        description: description.into(),
    }
}

#[sqlx::test(migrations = false)]
async fn assigns_consecutive_ids_from_one(pool: SqlitePool) {
    let store = SqliteStore::from_pool(pool).await.unwrap();

    let ids = store
        .create_jobs(3, |id| new_job(JobStatus::Pending, format!("Job #{id}")))
        .await
        .unwrap();
    assert_eq!(ids, vec![1, 2, 3]);

    let ids = store
        .create_jobs(2, |id| new_job(JobStatus::Pending, format!("Job #{id}")))
        .await
        .unwrap();
    assert_eq!(ids, vec![4, 5]);

    let jobs = store.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 5);
    assert!(jobs.iter().all(|job| job.status == JobStatus::Pending));
    assert_eq!(jobs[0].description, "Job #1");
    assert_eq!(jobs[4].description, "Job #5");
}

#[sqlx::test(migrations = false)]
async fn lifecycle_scenario(pool: SqlitePool) {
    let store = SqliteStore::from_pool(pool).await.unwrap();

    let ids = store
        .create_jobs(3, |id| new_job(JobStatus::Pending, format!("Job #{id}")))
        .await
        .unwrap();
    assert_eq!(ids, vec![1, 2, 3]);

    let first = store.reserve_next().await.unwrap().unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(first.status, JobStatus::InProgress);
    assert!(first.updated_at >= first.created_at);

    let second = store.reserve_next().await.unwrap().unwrap();
    assert_eq!(second.id, 2);

    assert_matches!(
        store.mark_done(1).await.unwrap(),
        CompleteOutcome::Completed
    );
    let jobs = store.list_jobs().await.unwrap();
    assert_eq!(jobs[0].status, JobStatus::Done);

    assert_matches!(store.mark_done(99).await.unwrap(), CompleteOutcome::NotFound);

    let third = store.reserve_next().await.unwrap().unwrap();
    assert_eq!(third.id, 3);

    assert_eq!(store.reserve_next().await.unwrap(), None);
}

#[sqlx::test(migrations = false)]
async fn reserve_on_empty_store_returns_none(pool: SqlitePool) {
    let store = SqliteStore::from_pool(pool).await.unwrap();
    assert_eq!(store.reserve_next().await.unwrap(), None);
    assert!(store.list_jobs().await.unwrap().is_empty());
}

#[sqlx::test(migrations = false)]
async fn reserve_serves_lowest_pending_id(pool: SqlitePool) {
    let store = SqliteStore::from_pool(pool).await.unwrap();

    // Jobs enqueued directly in a non-pending state are never served.
    let statuses = [JobStatus::Done, JobStatus::InProgress, JobStatus::Pending];
    store
        .create_jobs(3, |id| {
            new_job(statuses[(id - 1) as usize], format!("Job #{id}"))
        })
        .await
        .unwrap();

    let job = store.reserve_next().await.unwrap().unwrap();
    assert_eq!(job.id, 3);
    assert_eq!(store.reserve_next().await.unwrap(), None);
}

#[sqlx::test(migrations = false)]
async fn mark_done_requires_in_progress(pool: SqlitePool) {
    let store = SqliteStore::from_pool(pool).await.unwrap();

    store
        .create_jobs(1, |id| new_job(JobStatus::Pending, format!("Job #{id}")))
        .await
        .unwrap();

    assert_matches!(
        store.mark_done(1).await.unwrap(),
        CompleteOutcome::InvalidStatus(JobStatus::Pending)
    );

    store.reserve_next().await.unwrap().unwrap();
    assert_matches!(
        store.mark_done(1).await.unwrap(),
        CompleteOutcome::Completed
    );
    assert_matches!(
        store.mark_done(1).await.unwrap(),
        CompleteOutcome::InvalidStatus(JobStatus::Done)
    );
}

#[sqlx::test(migrations = false)]
async fn round_trip_preserves_all_fields(pool: SqlitePool) {
    let store = SqliteStore::from_pool(pool).await.unwrap();

    let descriptions = [
        "plain label".to_string(),
        "with, a comma".to_string(),
        "say \"hi\", twice".to_string(),
    ];
    store
        .create_jobs(descriptions.len(), |id| {
            new_job(JobStatus::Pending, descriptions[(id - 1) as usize].clone())
        })
        .await
        .unwrap();

    let jobs = store.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), descriptions.len());
    for (job, expected) in jobs.iter().zip(&descriptions) {
        assert_eq!(&job.description, expected);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.created_at, job.updated_at);
    }
}

#[sqlx::test(migrations = false)]
async fn concurrent_reservations_claim_distinct_jobs(pool: SqlitePool) {
    let store = Arc::new(SqliteStore::from_pool(pool).await.unwrap());

    store
        .create_jobs(8, |id| new_job(JobStatus::Pending, format!("Job #{id}")))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.reserve_next().await.unwrap().unwrap().id
        }));
    }

    let mut claimed = BTreeSet::new();
    for handle in handles {
        assert!(claimed.insert(handle.await.unwrap()));
    }
    assert_eq!(claimed, (1..=8).collect::<BTreeSet<_>>());

    assert_eq!(store.reserve_next().await.unwrap(), None);
    let jobs = store.list_jobs().await.unwrap();
    assert!(jobs.iter().all(|job| job.status == JobStatus::InProgress));
}

#[sqlx::test(migrations = false)]
async fn schema_init_is_idempotent(pool: SqlitePool) {
    let first = SqliteStore::from_pool(pool.clone()).await.unwrap();
    first
        .create_jobs(1, |id| new_job(JobStatus::Pending, format!("Job #{id}")))
        .await
        .unwrap();

    // A second handle over the same database must not clobber existing rows.
    let second = SqliteStore::from_pool(pool).await.unwrap();
    assert_eq!(second.list_jobs().await.unwrap().len(), 1);
}
