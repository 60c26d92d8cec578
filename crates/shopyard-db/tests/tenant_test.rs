//! Tenant registration integration tests.
//!
//! Run with: `cargo test -p shopyard-db --test tenant_test`. Requires
//! Docker for testcontainers (Postgres).

mod helpers;

use helpers::{create_test_user, setup_test_db};
use shopyard_core::AppError;
use shopyard_db::TenantRepository;

#[tokio::test]
async fn same_name_different_subdomains_coexist() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db.pool, "owner@example.com").await;
    let tenants = TenantRepository::new(db.pool.clone());

    // The slug mirrors the subdomain; display names are free-form and may
    // repeat across businesses.
    tenants
        .create_with_owner("Happy Paws", "happy-paws-jakarta", "happy-paws-jakarta", owner.id)
        .await
        .expect("first tenant");
    tenants
        .create_with_owner("Happy Paws", "happy-paws-bandung", "happy-paws-bandung", owner.id)
        .await
        .expect("second tenant with the same name");

    let taken = tenants
        .create_with_owner("Another Shop", "happy-paws-jakarta", "happy-paws-jakarta", owner.id)
        .await;
    assert!(matches!(taken, Err(AppError::Conflict(_))));
}
