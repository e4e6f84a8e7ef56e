use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::flight::FlightCache;
use crate::core::{
    errors::CofreResult,
    models::{AttachmentMetadata, Project, Secret},
};
use crate::gateway::r#trait::VaultGateway;

/// Read caches for one vault session: active and trashed secrets, active
/// and trashed projects, and one attachment-metadata cache per secret id.
/// Dropped with the session on lock, never shared across sessions.
pub struct VaultCache {
    gateway: Arc<dyn VaultGateway>,
    active_secrets: FlightCache<Secret>,
    trashed_secrets: FlightCache<Secret>,
    active_projects: FlightCache<Project>,
    trashed_projects: FlightCache<Project>,
    attachments: Mutex<HashMap<i64, Arc<FlightCache<AttachmentMetadata>>>>,
}

impl VaultCache {
    pub fn new(gateway: Arc<dyn VaultGateway>) -> Self {
        Self {
            gateway,
            active_secrets: FlightCache::new(),
            trashed_secrets: FlightCache::new(),
            active_projects: FlightCache::new(),
            trashed_projects: FlightCache::new(),
            attachments: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load_active_secrets(&self) -> CofreResult<Arc<Vec<Secret>>> {
        let gateway = self.gateway.clone();
        self.active_secrets
            .load(move || async move { gateway.list_active_secrets().await })
            .await
    }

    pub async fn load_trashed_secrets(&self) -> CofreResult<Arc<Vec<Secret>>> {
        let gateway = self.gateway.clone();
        self.trashed_secrets
            .load(move || async move { gateway.list_trashed_secrets().await })
            .await
    }

    pub async fn load_active_projects(&self) -> CofreResult<Arc<Vec<Project>>> {
        let gateway = self.gateway.clone();
        self.active_projects
            .load(move || async move { gateway.list_active_projects().await })
            .await
    }

    pub async fn load_trashed_projects(&self) -> CofreResult<Arc<Vec<Project>>> {
        let gateway = self.gateway.clone();
        self.trashed_projects
            .load(move || async move { gateway.list_trashed_projects().await })
            .await
    }

    pub fn peek_active_secrets(&self) -> Option<Arc<Vec<Secret>>> {
        self.active_secrets.peek()
    }

    pub fn peek_active_projects(&self) -> Option<Arc<Vec<Project>>> {
        self.active_projects.peek()
    }

    pub async fn load_attachments(&self, secret_id: i64) -> CofreResult<Arc<Vec<AttachmentMetadata>>> {
        let slot = self.attachment_slot(secret_id);
        let gateway = self.gateway.clone();
        slot.load(move || async move { gateway.list_attachments(secret_id).await })
            .await
    }

    pub fn invalidate_attachments(&self, secret_id: i64) {
        if let Some(slot) = self
            .attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&secret_id)
        {
            slot.invalidate();
        }
    }

    /// Discards every record cache; the next loads re-fetch server truth.
    pub fn invalidate_records(&self) {
        self.active_secrets.invalidate();
        self.trashed_secrets.invalidate();
        self.active_projects.invalidate();
        self.trashed_projects.invalidate();
        tracing::debug!("record caches invalidated");
    }

    fn attachment_slot(&self, secret_id: i64) -> Arc<FlightCache<AttachmentMetadata>> {
        self.attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(secret_id)
            .or_default()
            .clone()
    }
}
