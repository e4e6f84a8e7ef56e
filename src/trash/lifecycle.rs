use std::sync::Arc;

use crate::cache::store::VaultCache;
use crate::core::errors::CofreResult;
use crate::core::models::{Project, Secret, TrashItem, TrashKind};
use crate::gateway::r#trait::VaultGateway;

/// Unified view over trashed secrets and projects, plus the restore and
/// purge operations that move records out of the trash.
pub struct TrashLifecycle {
    gateway: Arc<dyn VaultGateway>,
    cache: Arc<VaultCache>,
}

impl TrashLifecycle {
    pub fn new(gateway: Arc<dyn VaultGateway>, cache: Arc<VaultCache>) -> Self {
        Self { gateway, cache }
    }

    /// Both trashed collections merged into one list, most recently
    /// deleted first.
    pub async fn items(&self) -> CofreResult<Vec<TrashItem>> {
        let secrets = self.cache.load_trashed_secrets().await?;
        let projects = self.cache.load_trashed_projects().await?;
        Ok(merge_items(&secrets, &projects))
    }

    pub async fn restore(&self, kind: TrashKind, id: i64) -> CofreResult<()> {
        match kind {
            TrashKind::Secret => self.gateway.restore_secret(id).await?,
            TrashKind::Project => self.gateway.restore_project(id).await?,
        }
        self.cache.invalidate_records();
        Ok(())
    }

    pub async fn purge(&self, kind: TrashKind, id: i64) -> CofreResult<()> {
        match kind {
            TrashKind::Secret => self.gateway.purge_secret(id).await?,
            TrashKind::Project => self.gateway.purge_project(id).await?,
        }
        self.cache.invalidate_records();
        Ok(())
    }

    /// Purges everything in the trash in one backend call. The caches stay
    /// untouched when the call fails.
    pub async fn empty(&self) -> CofreResult<()> {
        self.gateway.empty_trash().await?;
        self.cache.invalidate_records();
        Ok(())
    }
}

fn merge_items(secrets: &[Secret], projects: &[Project]) -> Vec<TrashItem> {
    let mut items: Vec<TrashItem> = secrets
        .iter()
        .cloned()
        .map(TrashItem::Secret)
        .chain(projects.iter().cloned().map(TrashItem::Project))
        .collect();
    items.sort_by(|a, b| b.deleted_at().cmp(&a.deleted_at()));
    items
}
