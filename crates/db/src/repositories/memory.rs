use std::collections::HashMap;

use tokio::sync::RwLock;

use autoreply_core::domain::user_configuration::{UserConfiguration, UserId};

use super::{RepositoryError, UserConfigurationRepository};

#[derive(Default)]
pub struct InMemoryUserConfigurationRepository {
    configurations: RwLock<HashMap<UserId, UserConfiguration>>,
}

impl InMemoryUserConfigurationRepository {
    pub async fn len(&self) -> usize {
        self.configurations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.configurations.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl UserConfigurationRepository for InMemoryUserConfigurationRepository {
    async fn put(&self, config: UserConfiguration) -> Result<bool, RepositoryError> {
        let mut configurations = self.configurations.write().await;
        if configurations.get(&config.user_id) == Some(&config) {
            return Ok(false);
        }
        configurations.insert(config.user_id.clone(), config);
        Ok(true)
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<UserConfiguration>, RepositoryError> {
        let configurations = self.configurations.read().await;
        Ok(configurations.get(user_id).cloned())
    }
}
