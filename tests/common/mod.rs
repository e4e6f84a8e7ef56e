#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::Notify;

use cofre::{
    core::{
        errors::{CofreError, CofreResult},
        models::{AttachmentMetadata, Project, ProjectDraft, Secret, SecretDraft},
    },
    gateway::{r#trait::VaultGateway, sqlite::SqliteGateway},
};

pub const MASTER: &str = "master-pass";

/// An in-memory backend with call counters and failure switches, so tests
/// can observe fetch counts and force specific calls to fail.
pub struct TestGateway {
    inner: SqliteGateway,
    pub secret_list_calls: AtomicUsize,
    pub attachment_list_calls: AtomicUsize,
    pub attachment_add_calls: AtomicUsize,
    pub fail_create_secret: AtomicBool,
    pub fail_list_secrets: AtomicBool,
    /// 1-based index of the add_attachment call that fails; 0 disables.
    pub fail_attachment_at: AtomicUsize,
    /// When set, create_secret waits for this notification before running.
    pub create_gate: Mutex<Option<Arc<Notify>>>,
}

impl TestGateway {
    pub async fn unlocked() -> CofreResult<Self> {
        let inner = SqliteGateway::connect("sqlite::memory:").await?;
        inner.setup(master_password()).await?;
        inner.unlock(master_password()).await?;
        Ok(Self {
            inner,
            secret_list_calls: AtomicUsize::new(0),
            attachment_list_calls: AtomicUsize::new(0),
            attachment_add_calls: AtomicUsize::new(0),
            fail_create_secret: AtomicBool::new(false),
            fail_list_secrets: AtomicBool::new(false),
            fail_attachment_at: AtomicUsize::new(0),
            create_gate: Mutex::new(None),
        })
    }

    pub fn gate_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        if let Ok(mut slot) = self.create_gate.lock() {
            *slot = Some(gate.clone());
        }
        gate
    }
}

pub fn master_password() -> SecretString {
    SecretString::new(MASTER.to_owned().into_boxed_str())
}

pub fn draft(title: &str) -> SecretDraft {
    SecretDraft {
        title: title.to_owned(),
        username: None,
        password: "pw".to_owned(),
        project_id: None,
    }
}

#[async_trait]
impl VaultGateway for TestGateway {
    async fn status(&self) -> CofreResult<bool> {
        self.inner.status().await
    }

    async fn setup(&self, master_password: SecretString) -> CofreResult<()> {
        self.inner.setup(master_password).await
    }

    async fn unlock(&self, master_password: SecretString) -> CofreResult<()> {
        self.inner.unlock(master_password).await
    }

    async fn lock(&self) -> CofreResult<()> {
        self.inner.lock().await
    }

    async fn list_active_secrets(&self) -> CofreResult<Vec<Secret>> {
        self.secret_list_calls.fetch_add(1, Ordering::SeqCst);
        // Keeps the fetch in flight long enough for callers to overlap.
        tokio::time::sleep(Duration::from_millis(10)).await;
        if self.fail_list_secrets.load(Ordering::SeqCst) {
            return Err(CofreError::Remote("listing unavailable".to_owned()));
        }
        self.inner.list_active_secrets().await
    }

    async fn list_trashed_secrets(&self) -> CofreResult<Vec<Secret>> {
        self.inner.list_trashed_secrets().await
    }

    async fn create_secret(&self, draft: &SecretDraft) -> CofreResult<Secret> {
        let gate = self
            .create_gate
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_create_secret.load(Ordering::SeqCst) {
            return Err(CofreError::Remote("create rejected".to_owned()));
        }
        self.inner.create_secret(draft).await
    }

    async fn update_secret(&self, id: i64, draft: &SecretDraft) -> CofreResult<()> {
        self.inner.update_secret(id, draft).await
    }

    async fn soft_delete_secret(&self, id: i64) -> CofreResult<()> {
        self.inner.soft_delete_secret(id).await
    }

    async fn restore_secret(&self, id: i64) -> CofreResult<()> {
        self.inner.restore_secret(id).await
    }

    async fn purge_secret(&self, id: i64) -> CofreResult<()> {
        self.inner.purge_secret(id).await
    }

    async fn list_active_projects(&self) -> CofreResult<Vec<Project>> {
        self.inner.list_active_projects().await
    }

    async fn list_trashed_projects(&self) -> CofreResult<Vec<Project>> {
        self.inner.list_trashed_projects().await
    }

    async fn create_project(&self, draft: &ProjectDraft) -> CofreResult<Project> {
        self.inner.create_project(draft).await
    }

    async fn update_project(&self, id: i64, draft: &ProjectDraft) -> CofreResult<()> {
        self.inner.update_project(id, draft).await
    }

    async fn soft_delete_project(&self, id: i64) -> CofreResult<()> {
        self.inner.soft_delete_project(id).await
    }

    async fn restore_project(&self, id: i64) -> CofreResult<()> {
        self.inner.restore_project(id).await
    }

    async fn purge_project(&self, id: i64) -> CofreResult<()> {
        self.inner.purge_project(id).await
    }

    async fn list_attachments(&self, secret_id: i64) -> CofreResult<Vec<AttachmentMetadata>> {
        self.attachment_list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_attachments(secret_id).await
    }

    async fn add_attachment(
        &self,
        secret_id: i64,
        filename: &str,
        mime_type: &str,
        content: &[u8],
    ) -> CofreResult<AttachmentMetadata> {
        let call = self.attachment_add_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_attachment_at.load(Ordering::SeqCst) {
            return Err(CofreError::Remote("attachment rejected".to_owned()));
        }
        self.inner
            .add_attachment(secret_id, filename, mime_type, content)
            .await
    }

    async fn fetch_attachment(&self, attachment_id: i64) -> CofreResult<Vec<u8>> {
        self.inner.fetch_attachment(attachment_id).await
    }

    async fn delete_attachment(&self, attachment_id: i64) -> CofreResult<()> {
        self.inner.delete_attachment(attachment_id).await
    }

    async fn empty_trash(&self) -> CofreResult<()> {
        self.inner.empty_trash().await
    }

    async fn export_vault(&self, destination: &str, password: SecretString) -> CofreResult<()> {
        self.inner.export_vault(destination, password).await
    }

    async fn import_vault(&self, source: &str, password: SecretString) -> CofreResult<String> {
        self.inner.import_vault(source, password).await
    }
}
