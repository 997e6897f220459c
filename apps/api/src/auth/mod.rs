mod session;

pub use session::{login_handler, logout_handler, me_handler};

pub const SESSION_PRINCIPAL_KEY: &str = "principal_identity";
/// Absolute session creation timestamp for OWASP absolute timeout enforcement.
pub const SESSION_CREATED_AT_KEY: &str = "session_created_at";
