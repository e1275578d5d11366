//! Registered-user directory
//!
//! The directory is the authoritative list of registered email addresses. It is
//! fetched once, shared read-only, and replaced wholesale when refreshed.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::services::backend::BackendClient;
use crate::utils::error::AppResult;

/// Snapshot of registered email addresses
#[derive(Debug, Clone, Default)]
pub struct EmailDirectory {
    emails: Vec<String>,
    index: HashSet<String>,
}

impl EmailDirectory {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = HashSet::new();
        let mut ordered = Vec::new();
        for email in emails {
            let email = email.into();
            if index.insert(email.clone()) {
                ordered.push(email);
            }
        }
        Self {
            emails: ordered,
            index,
        }
    }

    /// Exact-match membership test
    pub fn contains(&self, email: &str) -> bool {
        self.index.contains(email)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    /// Case-insensitive substring filter; a blank query matches everything
    pub fn search(&self, query: &str) -> Vec<&str> {
        let needle = query.trim().to_lowercase();
        self.emails
            .iter()
            .filter(|email| needle.is_empty() || email.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

/// Anything that can produce the registered-email list
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn fetch_emails(&self) -> AppResult<Vec<String>>;
}

#[async_trait]
impl DirectorySource for BackendClient {
    async fn fetch_emails(&self) -> AppResult<Vec<String>> {
        BackendClient::fetch_emails(self).await?.into_data()
    }
}

/// Shared, lazily loaded directory snapshot
#[derive(Debug, Clone, Default)]
pub struct DirectoryCache {
    snapshot: Arc<RwLock<Option<Arc<EmailDirectory>>>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, fetching it on first use
    pub async fn get_or_load<S: DirectorySource + ?Sized>(
        &self,
        source: &S,
    ) -> AppResult<Arc<EmailDirectory>> {
        if let Some(directory) = self.snapshot.read().await.as_ref() {
            debug!("Directory cache hit ({} emails)", directory.len());
            return Ok(Arc::clone(directory));
        }
        self.refresh(source).await
    }

    /// Fetch a fresh snapshot and replace the held one
    ///
    /// On failure the previous snapshot is kept.
    pub async fn refresh<S: DirectorySource + ?Sized>(
        &self,
        source: &S,
    ) -> AppResult<Arc<EmailDirectory>> {
        let emails = source.fetch_emails().await?;
        let directory = Arc::new(EmailDirectory::new(emails));
        info!("Loaded email directory with {} entries", directory.len());

        let mut guard = self.snapshot.write().await;
        *guard = Some(Arc::clone(&directory));
        Ok(directory)
    }

    /// Snapshot if one has been loaded
    pub async fn current(&self) -> Option<Arc<EmailDirectory>> {
        self.snapshot.read().await.clone()
    }
}
