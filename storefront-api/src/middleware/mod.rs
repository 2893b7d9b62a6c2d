/// Middleware modules for the API server
///
/// - `gate`: session and role checks in front of protected routes
/// - `security`: security response headers

pub mod gate;
pub mod security;
