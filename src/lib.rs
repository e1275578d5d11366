//! Quota Console Library
//!
//! Business rules for administering user memberships, quota grants and
//! enterprise rosters against the membership backend.

use std::sync::Arc;

use tokio::sync::Mutex;

pub mod cli;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
use services::directory::{DirectoryCache, EmailDirectory};
use services::enterprise::EnterpriseService;
use services::quota_query::QuotaQueryCoordinator;
use services::BackendClient;
use utils::error::AppResult;

/// Session state shared by every console operation
pub struct ConsoleContext {
    /// Application configuration
    pub config: AppConfig,
    /// Membership backend client
    pub client: Arc<BackendClient>,
    /// Registered-user directory snapshot
    pub directory: DirectoryCache,
    /// Usage query coordinator holding the last result
    pub usage: Mutex<QuotaQueryCoordinator<Arc<BackendClient>>>,
}

impl ConsoleContext {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let client = Arc::new(BackendClient::new(&config.backend)?);
        Ok(Self {
            usage: Mutex::new(QuotaQueryCoordinator::new(Arc::clone(&client))),
            directory: DirectoryCache::new(),
            client,
            config,
        })
    }

    /// Directory snapshot, fetched on first use
    pub async fn directory(&self) -> AppResult<Arc<EmailDirectory>> {
        self.directory.get_or_load(self.client.as_ref()).await
    }

    /// Replace the directory snapshot with a fresh copy
    pub async fn refresh_directory(&self) -> AppResult<Arc<EmailDirectory>> {
        self.directory.refresh(self.client.as_ref()).await
    }

    pub fn enterprises(&self) -> EnterpriseService<'_> {
        EnterpriseService::new(&self.client, &self.config.membership)
    }
}
