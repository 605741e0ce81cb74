pub mod config;
pub mod domain;
pub mod errors;

pub use domain::user_configuration::{UserConfiguration, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
