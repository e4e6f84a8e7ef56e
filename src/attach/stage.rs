use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::cache::store::VaultCache;
use crate::core::{
    errors::{CofreError, CofreResult},
    models::PendingAttachment,
};
use crate::gateway::r#trait::VaultGateway;

/// Holds files attached to a secret that may not exist at the backend yet.
/// Entries are purely local until `flush` runs against a confirmed secret
/// id; no byte ever reaches the backend before that.
#[derive(Default)]
pub struct AttachmentStage {
    pending: Mutex<Vec<PendingAttachment>>,
}

impl AttachmentStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, filename: String, mime_type: String, content: Vec<u8>) -> Uuid {
        let entry = PendingAttachment::new(filename, mime_type, content);
        let local_id = entry.local_id;
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        local_id
    }

    pub fn unstage(&self, local_id: Uuid) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let before = pending.len();
        pending.retain(|entry| entry.local_id != local_id);
        pending.len() < before
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending(&self) -> Vec<PendingAttachment> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Uploads the staged batch sequentially, in insertion order, against a
    /// confirmed secret id. Each entry leaves the stage as soon as the
    /// backend confirms it, so a retry after failure re-sends only the
    /// remainder. Stops at the first failure and reports an aggregate error;
    /// the metadata cache is invalidated once the whole batch is persisted.
    pub async fn flush(
        &self,
        gateway: &dyn VaultGateway,
        cache: &VaultCache,
        secret_id: i64,
    ) -> CofreResult<usize> {
        let batch = self.pending();
        if batch.is_empty() {
            return Ok(0);
        }

        let total = batch.len();
        for (index, entry) in batch.iter().enumerate() {
            match gateway
                .add_attachment(secret_id, &entry.filename, &entry.mime_type, &entry.content)
                .await
            {
                Ok(_) => {
                    self.unstage(entry.local_id);
                }
                Err(err) => {
                    tracing::warn!(
                        secret_id,
                        uploaded = index,
                        remaining = total - index,
                        error = %err,
                        "attachment flush stopped"
                    );
                    return Err(CofreError::Flush {
                        uploaded: index,
                        remaining: total - index,
                    });
                }
            }
        }

        cache.invalidate_attachments(secret_id);
        tracing::debug!(secret_id, uploaded = total, "attachment flush complete");
        Ok(total)
    }
}
