pub mod request_id;
pub mod tenant;

pub use request_id::request_id_middleware;
pub use tenant::{tenant_middleware, TenantContext};
