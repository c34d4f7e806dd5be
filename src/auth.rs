//! Credentials, cached token models, and the single-flight token manager.

pub mod credentials;
pub mod manager;
pub mod token;

pub use credentials::*;
pub use manager::*;
pub use token::*;
