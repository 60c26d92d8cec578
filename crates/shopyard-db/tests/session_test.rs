//! Session lifecycle integration tests.
//!
//! Run with: `cargo test -p shopyard-db --test session_test`. Requires
//! Docker for testcontainers (Postgres).

mod helpers;

use chrono::{Duration, Utc};
use helpers::{create_test_user, setup_test_db};
use shopyard_db::SessionRepository;

#[tokio::test]
async fn expired_sessions_are_pruned() {
    let db = setup_test_db().await;
    let user = create_test_user(&db.pool, "user@example.com").await;
    let sessions = SessionRepository::new(db.pool.clone());

    sessions
        .create(user.id, "live-token", Utc::now() + Duration::hours(24))
        .await
        .expect("live session");
    sessions
        .create(user.id, "stale-token", Utc::now() - Duration::hours(1))
        .await
        .expect("stale session");

    let removed = sessions.delete_expired().await.expect("prune");
    assert_eq!(removed, 1);

    assert!(sessions
        .find_user_by_token("live-token")
        .await
        .expect("live lookup")
        .is_some());
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
        .fetch_one(&db.pool)
        .await
        .expect("count sessions");
    assert_eq!(count, 1, "only the live session remains");
}
