use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use secrecy::SecretString;

use crate::attach::stage::AttachmentStage;
use crate::cache::store::VaultCache;
use crate::core::{
    errors::{CofreError, CofreResult},
    models::{
        AttachmentMetadata, Project, ProjectDraft, Secret, SecretDraft, is_temp_id,
        temp_record_id,
    },
    validate,
};
use crate::gateway::r#trait::VaultGateway;
use crate::sync::optimistic::{OptimisticSecrets, SecretAction};
use crate::trash::lifecycle::TrashLifecycle;

/// One user session over the vault: owns the read caches and the
/// pending-action log, and drives every mutation through the
/// optimistic-then-reconcile protocol. Secret mutations apply to the local
/// view immediately; success and failure both end in a refresh so the view
/// converges to backend truth.
pub struct VaultSession {
    gateway: Arc<dyn VaultGateway>,
    cache: Arc<VaultCache>,
    secrets: Mutex<OptimisticSecrets>,
}

impl VaultSession {
    pub fn new(gateway: Arc<dyn VaultGateway>) -> Self {
        let cache = Arc::new(VaultCache::new(gateway.clone()));
        Self {
            gateway,
            cache,
            secrets: Mutex::new(OptimisticSecrets::default()),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn VaultGateway> {
        &self.gateway
    }

    pub fn cache(&self) -> &Arc<VaultCache> {
        &self.cache
    }

    pub fn trash(&self) -> TrashLifecycle {
        TrashLifecycle::new(self.gateway.clone(), self.cache.clone())
    }

    // Vault lifecycle passthroughs.

    pub async fn status(&self) -> CofreResult<bool> {
        self.gateway.status().await
    }

    pub async fn setup(&self, master_password: SecretString) -> CofreResult<()> {
        self.gateway.setup(master_password).await
    }

    pub async fn unlock(&self, master_password: SecretString) -> CofreResult<()> {
        self.gateway.unlock(master_password).await
    }

    pub async fn lock(&self) -> CofreResult<()> {
        self.gateway.lock().await
    }

    /// The active-secrets view: last cache resolution with the pending
    /// optimistic actions applied on top. A fresh snapshot (new fetch after
    /// invalidation) discards the log.
    pub async fn active_secrets(&self) -> CofreResult<Vec<Secret>> {
        let snapshot = self.cache.load_active_secrets().await?;
        let mut log = self.secrets.lock().unwrap_or_else(PoisonError::into_inner);
        if !Arc::ptr_eq(log.base(), &snapshot) {
            log.rebase(snapshot);
        }
        Ok(log.view())
    }

    pub async fn create_secret(
        &self,
        draft: SecretDraft,
        stage: &AttachmentStage,
    ) -> CofreResult<Secret> {
        let draft = validate::secret_draft(&draft)?;

        // Local projection shown before the round trip completes.
        let projection = Secret {
            id: temp_record_id(),
            title: draft.title.clone(),
            username: draft.username.clone(),
            password: draft.password.clone(),
            created_at: Utc::now(),
            project_id: draft.project_id,
            deleted_at: None,
        };
        self.push_action(SecretAction::Create(projection));

        let created = match self.gateway.create_secret(&draft).await {
            Ok(secret) => secret,
            Err(err) => {
                tracing::debug!(error = %err, "secret create rejected, refreshing");
                self.refresh();
                return Err(err);
            }
        };

        // Staged files flush only now that the id is authoritative.
        let flushed = stage
            .flush(self.gateway.as_ref(), &self.cache, created.id)
            .await;
        self.refresh();
        flushed?;
        Ok(created)
    }

    pub async fn update_secret(
        &self,
        id: i64,
        draft: SecretDraft,
        stage: &AttachmentStage,
    ) -> CofreResult<()> {
        if is_temp_id(id) {
            return Err(CofreError::Validation(
                "record is awaiting creation".to_owned(),
            ));
        }
        let draft = validate::secret_draft(&draft)?;

        let original = self
            .cache
            .peek_active_secrets()
            .and_then(|secrets| secrets.iter().find(|s| s.id == id).cloned());
        let projection = Secret {
            id,
            title: draft.title.clone(),
            username: draft.username.clone(),
            password: draft.password.clone(),
            created_at: original
                .map(|secret| secret.created_at)
                .unwrap_or_else(Utc::now),
            project_id: draft.project_id,
            deleted_at: None,
        };
        self.push_action(SecretAction::Update(projection));

        match self.gateway.update_secret(id, &draft).await {
            Ok(()) => {
                let flushed = stage.flush(self.gateway.as_ref(), &self.cache, id).await;
                self.refresh();
                flushed?;
                Ok(())
            }
            Err(err) => {
                tracing::debug!(id, error = %err, "secret update rejected, refreshing");
                self.refresh();
                Err(err)
            }
        }
    }

    pub async fn soft_delete_secret(&self, id: i64) -> CofreResult<()> {
        if is_temp_id(id) {
            return Err(CofreError::Validation(
                "record is awaiting creation".to_owned(),
            ));
        }
        self.push_action(SecretAction::Delete(id));

        let result = self.gateway.soft_delete_secret(id).await;
        self.refresh();
        result
    }

    // Projects carry no optimistic log; their mutations invalidate and
    // re-fetch only.

    pub async fn active_projects(&self) -> CofreResult<Arc<Vec<Project>>> {
        self.cache.load_active_projects().await
    }

    pub async fn create_project(&self, draft: ProjectDraft) -> CofreResult<Project> {
        let draft = validate::project_draft(&draft)?;
        let result = self.gateway.create_project(&draft).await;
        self.refresh();
        result
    }

    pub async fn update_project(&self, id: i64, draft: ProjectDraft) -> CofreResult<()> {
        let draft = validate::project_draft(&draft)?;
        let result = self.gateway.update_project(id, &draft).await;
        self.refresh();
        result
    }

    pub async fn soft_delete_project(&self, id: i64) -> CofreResult<()> {
        let result = self.gateway.soft_delete_project(id).await;
        self.refresh();
        result
    }

    // Attachments of an existing secret. Content bytes are fetched on
    // demand and never cached.

    pub async fn attachments(&self, secret_id: i64) -> CofreResult<Arc<Vec<AttachmentMetadata>>> {
        self.cache.load_attachments(secret_id).await
    }

    /// Uploads a staged batch against a secret that already has a backend
    /// id, without editing the record itself.
    pub async fn add_attachments(
        &self,
        secret_id: i64,
        stage: &AttachmentStage,
    ) -> CofreResult<usize> {
        if is_temp_id(secret_id) {
            return Err(CofreError::Validation(
                "record is awaiting creation".to_owned(),
            ));
        }
        stage.flush(self.gateway.as_ref(), &self.cache, secret_id).await
    }

    pub async fn fetch_attachment(&self, attachment_id: i64) -> CofreResult<Vec<u8>> {
        self.gateway.fetch_attachment(attachment_id).await
    }

    pub async fn delete_attachment(&self, attachment_id: i64, secret_id: i64) -> CofreResult<()> {
        self.gateway.delete_attachment(attachment_id).await?;
        self.cache.invalidate_attachments(secret_id);
        Ok(())
    }

    // Backup passthroughs; import changes records, so it refreshes.

    pub async fn export_vault(&self, destination: &str, password: SecretString) -> CofreResult<()> {
        self.gateway.export_vault(destination, password).await
    }

    pub async fn import_vault(&self, source: &str, password: SecretString) -> CofreResult<String> {
        let message = self.gateway.import_vault(source, password).await?;
        self.refresh();
        Ok(message)
    }

    /// Invalidates every record cache so the next loads re-fetch backend
    /// truth, discarding any optimistic state with the old base snapshot.
    pub fn refresh(&self) {
        self.cache.invalidate_records();
    }

    fn push_action(&self, action: SecretAction) {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
    }
}
