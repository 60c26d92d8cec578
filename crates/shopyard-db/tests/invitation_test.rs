//! Invitation redemption integration tests.
//!
//! Run with: `cargo test -p shopyard-db --test invitation_test`. Requires
//! Docker for testcontainers (Postgres).

mod helpers;

use chrono::{Duration, Utc};
use helpers::{create_test_tenant, create_test_user, setup_test_db};
use shopyard_core::rbac::Role;
use shopyard_core::AppError;
use shopyard_db::InvitationRepository;

#[tokio::test]
async fn invitation_token_is_single_use() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db.pool, "owner@example.com").await;
    let tenant = create_test_tenant(&db.pool, owner.id, "pet-paradise").await;
    let invitee = create_test_user(&db.pool, "staff@example.com").await;

    let invitations = InvitationRepository::new(db.pool.clone());
    let invitation = invitations
        .create(
            "staff@example.com",
            tenant.id,
            Role::Staff,
            owner.id,
            "tok-single-use",
            Utc::now() + Duration::days(7),
        )
        .await
        .expect("create invitation");

    invitations
        .accept_with_user(invitation.id, tenant.id, Role::Staff, invitee.id)
        .await
        .expect("first accept");

    let replay = invitations
        .accept_with_user(invitation.id, tenant.id, Role::Staff, invitee.id)
        .await;
    assert!(matches!(replay, Err(AppError::BadRequest(_))));

    let (members,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_tenants WHERE tenant_id = $1")
            .bind(tenant.id)
            .fetch_one(&db.pool)
            .await
            .expect("count members");
    assert_eq!(members, 2, "owner plus the one accepted invitee");
}

#[tokio::test]
async fn new_account_acceptance_creates_user_session_and_membership() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db.pool, "owner@example.com").await;
    let tenant = create_test_tenant(&db.pool, owner.id, "pet-paradise").await;

    let invitations = InvitationRepository::new(db.pool.clone());
    let invitation = invitations
        .create(
            "newcomer@example.com",
            tenant.id,
            Role::Staff,
            owner.id,
            "tok-new-account",
            Utc::now() + Duration::days(7),
        )
        .await
        .expect("create invitation");

    let (user, membership) = invitations
        .accept_with_new_user(
            invitation.id,
            tenant.id,
            Role::Staff,
            "New Person",
            "newcomer@example.com",
            "$argon2id$test-hash",
            "session-tok-1",
            Utc::now() + Duration::hours(24),
        )
        .await
        .expect("accept with new account");

    assert_eq!(user.email, "newcomer@example.com");
    assert_eq!(membership.user_id, user.id);
    assert_eq!(membership.role, Role::Staff);

    let session: Option<(String,)> =
        sqlx::query_as("SELECT session_token FROM sessions WHERE user_id = $1")
            .bind(user.id)
            .fetch_optional(&db.pool)
            .await
            .expect("session lookup");
    assert_eq!(session, Some(("session-tok-1".to_string(),)));
}

#[tokio::test]
async fn lost_claim_race_leaves_no_orphan_account() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db.pool, "owner@example.com").await;
    let tenant = create_test_tenant(&db.pool, owner.id, "pet-paradise").await;
    let earlier = create_test_user(&db.pool, "earlier@example.com").await;

    let invitations = InvitationRepository::new(db.pool.clone());
    let invitation = invitations
        .create(
            "newcomer@example.com",
            tenant.id,
            Role::Staff,
            owner.id,
            "tok-raced",
            Utc::now() + Duration::days(7),
        )
        .await
        .expect("create invitation");

    // The token gets redeemed first through another path.
    invitations
        .accept_with_user(invitation.id, tenant.id, Role::Staff, earlier.id)
        .await
        .expect("winning accept");

    let lost = invitations
        .accept_with_new_user(
            invitation.id,
            tenant.id,
            Role::Staff,
            "New Person",
            "newcomer@example.com",
            "$argon2id$test-hash",
            "session-tok-raced",
            Utc::now() + Duration::hours(24),
        )
        .await;
    assert!(matches!(lost, Err(AppError::BadRequest(_))));

    let orphan: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind("newcomer@example.com")
            .fetch_optional(&db.pool)
            .await
            .expect("user lookup");
    assert!(orphan.is_none(), "no account may survive a lost claim");

    let session: Option<(String,)> =
        sqlx::query_as("SELECT session_token FROM sessions WHERE session_token = $1")
            .bind("session-tok-raced")
            .fetch_optional(&db.pool)
            .await
            .expect("session lookup");
    assert!(session.is_none(), "no session may survive a lost claim");
}
