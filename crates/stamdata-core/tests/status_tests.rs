//! Import status repository tests

mod helpers;

use chrono::Duration;
use helpers::*;
use sqlx::SqlitePool;
use stamdata_core::clock::{Clock, ManualClock};
use stamdata_core::status::{
    ImportStatusRepository, Outcome, SqliteImportStatusRepository, StatusError,
};
use std::sync::Arc;

async fn repository() -> (SqliteImportStatusRepository, Arc<ManualClock>, SqlitePool) {
    init_tracing();
    let pool = memory_pool().await;
    let clock = Arc::new(ManualClock::new(t0()));
    let repo =
        SqliteImportStatusRepository::new(pool.clone(), PERSON_HOME, clock.clone(), 1).unwrap();
    repo.ensure_table().await.unwrap();
    (repo, clock, pool)
}

#[tokio::test]
async fn test_no_status_before_first_import() {
    let (repo, _, _) = repository().await;

    assert_eq!(repo.table(), "personImportStatus");
    assert_eq!(repo.latest_status().await.unwrap(), None);
    assert!(!repo.is_overdue().await.unwrap());
}

#[tokio::test]
async fn test_started_then_succeeded() {
    let (repo, clock, pool) = repository().await;

    {
        let mut conn = pool.acquire().await.unwrap();
        repo.import_started_at(&mut conn, clock.now()).await.unwrap();
    }

    let running = repo.latest_status().await.unwrap().unwrap();
    assert_eq!(running.start_time, t0());
    assert_eq!(running.end_time, None);
    assert_eq!(running.outcome, None);

    clock.advance(Duration::seconds(42));
    {
        let mut conn = pool.acquire().await.unwrap();
        repo.import_ended_with_success(&mut conn, clock.now())
            .await
            .unwrap();
    }

    let done = repo.latest_status().await.unwrap().unwrap();
    assert_eq!(done.end_time, Some(t0() + Duration::seconds(42)));
    assert_eq!(done.outcome, Some(Outcome::Success));
    assert!(done.to_string().contains("Processing took 42 seconds"));
}

#[tokio::test]
async fn test_ending_without_start_is_a_no_op() {
    let (repo, clock, pool) = repository().await;

    {
        let mut conn = pool.acquire().await.unwrap();
        repo.import_ended_with_failure(&mut conn, clock.now())
            .await
            .unwrap();
    }

    assert_eq!(repo.latest_status().await.unwrap(), None);
}

#[tokio::test]
async fn test_latest_attempt_is_the_one_ended() {
    let (repo, clock, pool) = repository().await;

    {
        let mut conn = pool.acquire().await.unwrap();
        repo.import_started_at(&mut conn, t0()).await.unwrap();
        repo.import_ended_with_success(&mut conn, t0()).await.unwrap();

        clock.advance(Duration::hours(1));
        repo.import_started_at(&mut conn, clock.now()).await.unwrap();
        repo.import_ended_with_failure(&mut conn, clock.now())
            .await
            .unwrap();
    }

    let latest = repo.latest_status().await.unwrap().unwrap();
    assert_eq!(latest.start_time, t0() + Duration::hours(1));
    assert_eq!(latest.outcome, Some(Outcome::Failure));

    let outcomes: Vec<Option<String>> = sqlx::query_scalar(&format!(
        "SELECT Outcome FROM {} ORDER BY StartTime",
        repo.table()
    ))
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(
        outcomes,
        vec![Some("SUCCESS".to_string()), Some("FAILURE".to_string())]
    );
}

#[tokio::test]
async fn test_overdue_after_max_days() {
    let (repo, clock, pool) = repository().await;

    {
        let mut conn = pool.acquire().await.unwrap();
        repo.import_started_at(&mut conn, t0()).await.unwrap();
    }

    clock.advance(Duration::days(1));
    assert!(!repo.is_overdue().await.unwrap());

    clock.advance(Duration::days(1));
    assert!(repo.is_overdue().await.unwrap());
}

#[tokio::test]
async fn test_unreachable_threshold_is_never_overdue() {
    init_tracing();
    let pool = memory_pool().await;
    let clock = Arc::new(ManualClock::new(t0()));
    let repo = SqliteImportStatusRepository::new(
        pool.clone(),
        PERSON_HOME,
        clock.clone(),
        200_000_000_000,
    )
    .unwrap();
    repo.ensure_table().await.unwrap();

    {
        let mut conn = pool.acquire().await.unwrap();
        repo.import_started_at(&mut conn, t0()).await.unwrap();
    }
    clock.advance(Duration::days(365));

    assert!(!repo.is_overdue().await.unwrap());
}

#[tokio::test]
async fn test_db_alive() {
    let (repo, _, pool) = repository().await;
    assert!(repo.is_db_alive().await);

    pool.close().await;
    assert!(!repo.is_db_alive().await);
}

#[tokio::test]
async fn test_db_not_alive_without_table() {
    let clock = Arc::new(ManualClock::new(t0()));
    let repo =
        SqliteImportStatusRepository::new(memory_pool().await, PERSON_HOME, clock, 1).unwrap();

    assert!(!repo.is_db_alive().await);
}

#[tokio::test]
async fn test_home_must_be_an_identifier() {
    let clock = Arc::new(ManualClock::new(t0()));

    let result =
        SqliteImportStatusRepository::new(memory_pool().await, "person; DROP TABLE x", clock, 1);

    assert!(matches!(result, Err(StatusError::InvalidHome(_))));
}
