//! Shared constants for the API layer.

/// Cookie carrying the session token on tenant subdomains.
pub const SESSION_COOKIE: &str = "session_token";

/// Session and invitation tokens are 32 random bytes, hex-encoded.
pub const TOKEN_BYTES: usize = 32;

/// Invitations expire after this many days.
pub const INVITATION_EXPIRY_DAYS: i64 = 7;

/// The gateway rejects order ids longer than 50 characters.
pub const MAX_ORDER_ID_LEN: usize = 50;

/// Forwarded tenant-context headers set by the router for downstream
/// consumers.
pub const HEADER_TENANT_ID: &str = "x-tenant-id";
pub const HEADER_TENANT_SUBDOMAIN: &str = "x-tenant-subdomain";
pub const HEADER_TENANT_NAME: &str = "x-tenant-name";

/// Paths reachable on a tenant subdomain without a session, and even when
/// the tenant is not active. Everything auth-related must stay reachable
/// so a suspended tenant's members can still sign in or accept an invite.
pub const PUBLIC_TENANT_PATHS: &[&str] = &["/login", "/register", "/invitations/accept"];

/// Prefixes of public paths (API auth endpoints and invitation acceptance
/// take sub-paths).
pub const PUBLIC_TENANT_PREFIXES: &[&str] = &["/api/auth/", "/api/invitations/"];
