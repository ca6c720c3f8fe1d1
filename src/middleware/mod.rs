pub mod auth;
pub mod security_headers;

pub use auth::{AdminAuth, AdminKey};
pub use security_headers::SecurityHeaders;
