//! Application state.
//!
//! AppState aggregates the repositories and external collaborators built at
//! startup; handlers reach repositories through the `db` sub-struct.

use crate::services::email::EmailService;
use crate::services::payments::PaymentGateway;
use shopyard_core::Config;
use shopyard_db::{
    BillingRepository, InvitationRepository, MembershipRepository, PlanRepository,
    SessionRepository, TenantRepository, UserRepository,
};
use sqlx::PgPool;
use std::sync::Arc;

/// Database pool and repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub tenants: TenantRepository,
    pub users: UserRepository,
    pub sessions: SessionRepository,
    pub memberships: MembershipRepository,
    pub invitations: InvitationRepository,
    pub plans: PlanRepository,
    pub billing: BillingRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tenants: TenantRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            memberships: MembershipRepository::new(pool.clone()),
            invitations: InvitationRepository::new(pool.clone()),
            plans: PlanRepository::new(pool.clone()),
            billing: BillingRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Main application state: repositories plus injected collaborators.
/// The payment gateway is a trait object constructed at process startup
/// and passed explicitly, never a process-wide global.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub config: Config,
    pub gateway: Arc<dyn PaymentGateway>,
    pub email: Option<EmailService>,
    pub is_production: bool,
}
