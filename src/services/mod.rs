pub mod access_gate;
pub mod email_service;
pub mod notifier;
pub mod signup_service;
pub mod token_store;

pub use access_gate::*;
pub use email_service::*;
pub use notifier::*;
pub use signup_service::*;
pub use token_store::*;
