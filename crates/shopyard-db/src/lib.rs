//! Shopyard Database Layer
//!
//! This crate provides the sqlx/Postgres repositories for the platform:
//! tenants, users and sessions, memberships, invitations, plans, and the
//! subscription/payment state machine.

pub mod db;

// Re-exports: repositories and helpers
pub use db::billing::GatewayPaymentUpdate;
pub use db::{
    BillingRepository, InvitationRepository, MembershipRepository, PlanRepository,
    SessionRepository, TenantRepository, UserRepository,
};

pub use db::transaction::with_transaction;
