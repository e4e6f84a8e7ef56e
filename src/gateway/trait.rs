use async_trait::async_trait;
use secrecy::SecretString;

use crate::core::{
    errors::CofreResult,
    models::{AttachmentMetadata, Project, ProjectDraft, Secret, SecretDraft},
};

/// The remote-call boundary to the vault backend. One operation per backend
/// capability; every call may fail with an opaque error, carries no retry
/// policy, and holds no client-side state.
#[async_trait]
pub trait VaultGateway: Send + Sync {
    async fn status(&self) -> CofreResult<bool>;
    async fn setup(&self, master_password: SecretString) -> CofreResult<()>;
    async fn unlock(&self, master_password: SecretString) -> CofreResult<()>;
    async fn lock(&self) -> CofreResult<()>;

    async fn list_active_secrets(&self) -> CofreResult<Vec<Secret>>;
    async fn list_trashed_secrets(&self) -> CofreResult<Vec<Secret>>;
    async fn create_secret(&self, draft: &SecretDraft) -> CofreResult<Secret>;
    async fn update_secret(&self, id: i64, draft: &SecretDraft) -> CofreResult<()>;
    async fn soft_delete_secret(&self, id: i64) -> CofreResult<()>;
    async fn restore_secret(&self, id: i64) -> CofreResult<()>;
    async fn purge_secret(&self, id: i64) -> CofreResult<()>;

    async fn list_active_projects(&self) -> CofreResult<Vec<Project>>;
    async fn list_trashed_projects(&self) -> CofreResult<Vec<Project>>;
    async fn create_project(&self, draft: &ProjectDraft) -> CofreResult<Project>;
    async fn update_project(&self, id: i64, draft: &ProjectDraft) -> CofreResult<()>;
    async fn soft_delete_project(&self, id: i64) -> CofreResult<()>;
    async fn restore_project(&self, id: i64) -> CofreResult<()>;
    async fn purge_project(&self, id: i64) -> CofreResult<()>;

    async fn list_attachments(&self, secret_id: i64) -> CofreResult<Vec<AttachmentMetadata>>;
    async fn add_attachment(
        &self,
        secret_id: i64,
        filename: &str,
        mime_type: &str,
        content: &[u8],
    ) -> CofreResult<AttachmentMetadata>;
    async fn fetch_attachment(&self, attachment_id: i64) -> CofreResult<Vec<u8>>;
    async fn delete_attachment(&self, attachment_id: i64) -> CofreResult<()>;

    async fn empty_trash(&self) -> CofreResult<()>;

    async fn export_vault(&self, destination: &str, password: SecretString) -> CofreResult<()>;
    async fn import_vault(&self, source: &str, password: SecretString) -> CofreResult<String>;
}
