//! Slack Integration - Events API and slash command auto-responder
//!
//! This crate provides the Slack-facing logic for autoreply:
//! - **Events** (`events`) - `url_verification` handshakes and `message` callbacks
//! - **Slash Commands** (`commands`) - `/autoreply <message>` stores a user's reply
//! - **Web API** (`web_api`) - outbound `chat.postMessage` client
//! - **Signing** (`signature`) - `X-Slack-Signature` request verification
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Point Event Subscriptions at `POST /slack/events` and subscribe to `message.*` events
//! 3. Add a slash command (e.g. `/autoreply`) pointing at `POST /slack/commands`
//! 4. Set env vars: `AUTOREPLY_SLACK_VERIFICATION_TOKEN`, `AUTOREPLY_SLACK_BOT_TOKEN`
//!    and optionally `AUTOREPLY_SLACK_SIGNING_SECRET`
//!
//! # Architecture
//!
//! ```text
//! POST /slack/events   → EventCallbackHandler → UserConfigurationRepository (get)
//!                                   ↓
//!                           MessagingClient::send_message
//!
//! POST /slack/commands → CommandRouter → UserConfigurationRepository (put)
//! ```
//!
//! Handlers receive the store and the messaging client as injected `Arc<dyn _>` handles, so
//! tests substitute in-memory and recording fakes.

pub mod commands;
pub mod events;
pub mod signature;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod web_api;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use autoreply_core::domain::user_configuration::{UserConfiguration, UserId};
    use autoreply_db::{RepositoryError, UserConfigurationRepository};

    /// Counts store calls and otherwise behaves like an empty store.
    #[derive(Default)]
    pub struct CountingRepository {
        calls: AtomicUsize,
    }

    impl CountingRepository {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserConfigurationRepository for CountingRepository {
        async fn put(&self, _config: UserConfiguration) -> Result<bool, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn get(&self, _user_id: &UserId) -> Result<Option<UserConfiguration>, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    pub struct UnavailableRepository;

    #[async_trait]
    impl UserConfigurationRepository for UnavailableRepository {
        async fn put(&self, _config: UserConfiguration) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Unavailable("database is locked".to_owned()))
        }

        async fn get(&self, _user_id: &UserId) -> Result<Option<UserConfiguration>, RepositoryError> {
            Err(RepositoryError::Unavailable("database is locked".to_owned()))
        }
    }

    /// Fails every call with a non-transient database error.
    pub struct FaultyRepository;

    fn malformed() -> RepositoryError {
        RepositoryError::Database(sqlx::Error::Protocol("database disk image is malformed".to_owned()))
    }

    #[async_trait]
    impl UserConfigurationRepository for FaultyRepository {
        async fn put(&self, _config: UserConfiguration) -> Result<bool, RepositoryError> {
            Err(malformed())
        }

        async fn get(&self, _user_id: &UserId) -> Result<Option<UserConfiguration>, RepositoryError> {
            Err(malformed())
        }
    }
}
