//! Database repositories for the data access layer
//!
//! Each repository is responsible for a specific domain entity and provides
//! CRUD operations and specialized queries. Multi-step writes that must be
//! both-or-neither (tenant + owner membership, subscription + invoice,
//! invoice payment + activation) run through the transaction helper.

pub mod billing;
pub mod invitation;
pub mod membership;
pub mod plan;
pub mod session;
pub mod tenant;
pub mod transaction;
pub mod user;

pub use billing::BillingRepository;
pub use invitation::InvitationRepository;
pub use membership::MembershipRepository;
pub use plan::PlanRepository;
pub use session::SessionRepository;
pub use tenant::TenantRepository;
pub use user::UserRepository;
