pub mod auth;
pub mod billing;
pub mod dashboard;
pub mod health;
pub mod invitations;
pub mod plans;
pub mod team;
pub mod tenants;
pub mod user;
