use async_trait::async_trait;
use thiserror::Error;

use autoreply_core::domain::user_configuration::{UserConfiguration, UserId};
use autoreply_core::errors::ApplicationError;

pub mod memory;
pub mod user_configuration;

pub use memory::InMemoryUserConfigurationRepository;
pub use user_configuration::SqlUserConfigurationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl RepositoryError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Unavailable(error.to_string()),
            sqlx::Error::Database(ref db_error) if is_busy_or_locked(db_error.code().as_deref()) => {
                Self::Unavailable(error.to_string())
            }
            other => Self::Database(other),
        }
    }
}

// SQLite reports extended result codes; the low byte is the primary code
// (SQLITE_BUSY = 5, SQLITE_LOCKED = 6).
fn is_busy_or_locked(code: Option<&str>) -> bool {
    code.and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::StorageUnavailable(error.to_string())
    }
}

/// Per-user reply configuration store.
///
/// `put` returns `true` when a record was inserted or its fields changed and `false` when the
/// stored record already matched. `get` reports absence as `Ok(None)`.
#[async_trait]
pub trait UserConfigurationRepository: Send + Sync {
    async fn put(&self, config: UserConfiguration) -> Result<bool, RepositoryError>;
    async fn get(&self, user_id: &UserId) -> Result<Option<UserConfiguration>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use autoreply_core::errors::ApplicationError;

    use super::{is_busy_or_locked, RepositoryError};

    #[test]
    fn pool_timeouts_classify_as_unavailable() {
        let error = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(error.is_unavailable());
    }

    #[test]
    fn closed_pool_classifies_as_unavailable() {
        let error = RepositoryError::from(sqlx::Error::PoolClosed);
        assert!(error.is_unavailable());
    }

    #[test]
    fn missing_rows_are_database_errors() {
        let error = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(!error.is_unavailable());
    }

    #[test]
    fn extended_busy_and_locked_codes_are_transient() {
        assert!(is_busy_or_locked(Some("5")));
        assert!(is_busy_or_locked(Some("6")));
        assert!(is_busy_or_locked(Some("262")), "SQLITE_LOCKED_SHAREDCACHE");
        assert!(is_busy_or_locked(Some("517")), "SQLITE_BUSY_SNAPSHOT");
        assert!(!is_busy_or_locked(Some("2067")), "SQLITE_CONSTRAINT_UNIQUE");
        assert!(!is_busy_or_locked(Some("1")));
        assert!(!is_busy_or_locked(Some("not-a-code")));
        assert!(!is_busy_or_locked(None));
    }

    #[test]
    fn repository_errors_map_to_storage_unavailable() {
        let error = ApplicationError::from(RepositoryError::Unavailable("down".to_owned()));
        assert!(matches!(error, ApplicationError::StorageUnavailable(ref message) if message.contains("down")));
    }
}
