use std::fs;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};

use crate::core::{
    backup::{self, BackupFile},
    crypto::{self, MasterKey},
    errors::{CofreError, CofreResult},
    models::{AttachmentMetadata, Project, ProjectDraft, Secret, SecretDraft},
};
use crate::gateway::r#trait::VaultGateway;

/// Reference backend: the vault service the synchronization core talks to,
/// hosted in-process over SQLite. Record payloads are encrypted with the
/// session key; the key itself lives only in memory between unlock and lock.
pub struct SqliteGateway {
    pool: SqlitePool,
    key: Mutex<Option<MasterKey>>,
}

impl SqliteGateway {
    pub async fn connect(database_url: &str) -> CofreResult<Self> {
        let normalized = Self::normalize_sqlite_url(database_url);
        // One connection: serializes writes and keeps sqlite::memory:
        // pointing at a single database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&normalized)
            .await?;

        let gateway = Self {
            pool,
            key: Mutex::new(None),
        };
        gateway.init_schema().await?;
        Ok(gateway)
    }

    fn normalize_sqlite_url(database_url: &str) -> String {
        if !database_url.starts_with("sqlite://") || database_url.contains("mode=") {
            return database_url.to_owned();
        }

        if database_url.contains('?') {
            format!("{database_url}&mode=rwc")
        } else {
            format!("{database_url}?mode=rwc")
        }
    }

    async fn init_schema(&self) -> CofreResult<()> {
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS auth (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                salt TEXT NOT NULL,
                verifier TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                deleted_at TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS secrets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
                title TEXT NOT NULL,
                username TEXT,
                password_cipher BLOB NOT NULL,
                password_nonce BLOB NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                secret_id INTEGER NOT NULL REFERENCES secrets(id) ON DELETE CASCADE,
                filename TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                content_cipher BLOB NOT NULL,
                content_nonce BLOB NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn session_key(&self) -> CofreResult<MasterKey> {
        let guard = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(key) => Ok(MasterKey::from_bytes(*key.bytes())),
            None => Err(CofreError::Locked),
        }
    }

    fn store_key(&self, key: MasterKey) {
        *self.key.lock().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    fn parse_timestamp(text: &str) -> CofreResult<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(text)
            .map_err(|_| CofreError::Storage)?
            .with_timezone(&Utc))
    }

    fn parse_optional_timestamp(text: Option<String>) -> CofreResult<Option<DateTime<Utc>>> {
        text.as_deref().map(Self::parse_timestamp).transpose()
    }

    fn nonce_from_blob(blob: &[u8]) -> CofreResult<[u8; crypto::NONCE_SIZE]> {
        if blob.len() != crypto::NONCE_SIZE {
            return Err(CofreError::Storage);
        }
        let mut nonce = [0u8; crypto::NONCE_SIZE];
        nonce.copy_from_slice(blob);
        Ok(nonce)
    }

    fn secret_from_row(row: &sqlx::sqlite::SqliteRow, key: &MasterKey) -> CofreResult<Secret> {
        let cipher: Vec<u8> = row.try_get("password_cipher")?;
        let nonce_blob: Vec<u8> = row.try_get("password_nonce")?;
        let nonce = Self::nonce_from_blob(&nonce_blob)?;
        let plaintext = crypto::decrypt(key, &nonce, &cipher)?;
        let password = String::from_utf8(plaintext).map_err(|_| CofreError::Storage)?;

        let created_at_text: String = row.try_get("created_at")?;
        let deleted_at_text: Option<String> = row.try_get("deleted_at")?;

        Ok(Secret {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            username: row.try_get("username")?,
            password,
            created_at: Self::parse_timestamp(&created_at_text)?,
            project_id: row.try_get("project_id")?,
            deleted_at: Self::parse_optional_timestamp(deleted_at_text)?,
        })
    }

    fn project_from_row(row: &sqlx::sqlite::SqliteRow) -> CofreResult<Project> {
        let created_at_text: String = row.try_get("created_at")?;
        let deleted_at_text: Option<String> = row.try_get("deleted_at")?;

        Ok(Project {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: Self::parse_timestamp(&created_at_text)?,
            deleted_at: Self::parse_optional_timestamp(deleted_at_text)?,
        })
    }

    async fn list_secrets(&self, trashed: bool) -> CofreResult<Vec<Secret>> {
        let key = self.session_key()?;
        let query = if trashed {
            "SELECT id, project_id, title, username, password_cipher, password_nonce, created_at, deleted_at
             FROM secrets WHERE deleted_at IS NOT NULL ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT id, project_id, title, username, password_cipher, password_nonce, created_at, deleted_at
             FROM secrets WHERE deleted_at IS NULL ORDER BY created_at DESC, id DESC"
        };

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Self::secret_from_row(row, &key))
            .collect()
    }

    async fn list_projects(&self, trashed: bool) -> CofreResult<Vec<Project>> {
        self.session_key()?;
        let query = if trashed {
            "SELECT id, name, description, created_at, deleted_at
             FROM projects WHERE deleted_at IS NOT NULL ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT id, name, description, created_at, deleted_at
             FROM projects WHERE deleted_at IS NULL ORDER BY created_at DESC, id DESC"
        };

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::project_from_row).collect()
    }

    async fn insert_secret_row(&self, secret: &Secret, key: &MasterKey) -> CofreResult<()> {
        let blob = crypto::encrypt(key, secret.password.as_bytes())?;
        sqlx::query(
            "INSERT INTO secrets (id, project_id, title, username, password_cipher, password_nonce, created_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
               project_id=excluded.project_id,
               title=excluded.title,
               username=excluded.username,
               password_cipher=excluded.password_cipher,
               password_nonce=excluded.password_nonce,
               created_at=excluded.created_at,
               deleted_at=excluded.deleted_at",
        )
        .bind(secret.id)
        .bind(secret.project_id)
        .bind(&secret.title)
        .bind(&secret.username)
        .bind(&blob.ciphertext)
        .bind(blob.nonce.to_vec())
        .bind(secret.created_at.to_rfc3339())
        .bind(secret.deleted_at.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_project_row(&self, project: &Project) -> CofreResult<()> {
        sqlx::query(
            "INSERT INTO projects (id, name, description, created_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
               name=excluded.name,
               description=excluded.description,
               created_at=excluded.created_at,
               deleted_at=excluded.deleted_at",
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.created_at.to_rfc3339())
        .bind(project.deleted_at.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VaultGateway for SqliteGateway {
    async fn status(&self) -> CofreResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM auth")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("n")?;
        Ok(count > 0)
    }

    async fn setup(&self, master_password: SecretString) -> CofreResult<()> {
        if self.status().await? {
            return Err(CofreError::VaultExists);
        }

        let (material, key) = crypto::create_auth_material(&master_password)?;
        sqlx::query("INSERT INTO auth (id, salt, verifier) VALUES (1, ?1, ?2)")
            .bind(&material.salt)
            .bind(&material.verifier)
            .execute(&self.pool)
            .await?;

        self.store_key(key);
        Ok(())
    }

    async fn unlock(&self, master_password: SecretString) -> CofreResult<()> {
        let row = sqlx::query("SELECT salt, verifier FROM auth WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CofreError::VaultMissing)?;

        let salt: String = row.try_get("salt")?;
        let verifier: String = row.try_get("verifier")?;
        let key = crypto::verify_master_password(&master_password, &salt, &verifier)?;
        self.store_key(key);
        Ok(())
    }

    async fn lock(&self) -> CofreResult<()> {
        *self.key.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    async fn list_active_secrets(&self) -> CofreResult<Vec<Secret>> {
        self.list_secrets(false).await
    }

    async fn list_trashed_secrets(&self) -> CofreResult<Vec<Secret>> {
        self.list_secrets(true).await
    }

    async fn create_secret(&self, draft: &SecretDraft) -> CofreResult<Secret> {
        let key = self.session_key()?;
        let blob = crypto::encrypt(&key, draft.password.as_bytes())?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO secrets (project_id, title, username, password_cipher, password_nonce, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(draft.project_id)
        .bind(&draft.title)
        .bind(&draft.username)
        .bind(&blob.ciphertext)
        .bind(blob.nonce.to_vec())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Secret {
            id: result.last_insert_rowid(),
            title: draft.title.clone(),
            username: draft.username.clone(),
            password: draft.password.clone(),
            created_at: now,
            project_id: draft.project_id,
            deleted_at: None,
        })
    }

    async fn update_secret(&self, id: i64, draft: &SecretDraft) -> CofreResult<()> {
        let key = self.session_key()?;
        let blob = crypto::encrypt(&key, draft.password.as_bytes())?;

        let result = sqlx::query(
            "UPDATE secrets
             SET title = ?1, username = ?2, password_cipher = ?3, password_nonce = ?4, project_id = ?5
             WHERE id = ?6",
        )
        .bind(&draft.title)
        .bind(&draft.username)
        .bind(&blob.ciphertext)
        .bind(blob.nonce.to_vec())
        .bind(draft.project_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        Ok(())
    }

    async fn soft_delete_secret(&self, id: i64) -> CofreResult<()> {
        self.session_key()?;
        let result = sqlx::query("UPDATE secrets SET deleted_at = ?1 WHERE id = ?2")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        Ok(())
    }

    async fn restore_secret(&self, id: i64) -> CofreResult<()> {
        self.session_key()?;
        let result = sqlx::query("UPDATE secrets SET deleted_at = NULL WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        Ok(())
    }

    async fn purge_secret(&self, id: i64) -> CofreResult<()> {
        self.session_key()?;
        let result = sqlx::query("DELETE FROM secrets WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        Ok(())
    }

    async fn list_active_projects(&self) -> CofreResult<Vec<Project>> {
        self.list_projects(false).await
    }

    async fn list_trashed_projects(&self) -> CofreResult<Vec<Project>> {
        self.list_projects(true).await
    }

    async fn create_project(&self, draft: &ProjectDraft) -> CofreResult<Project> {
        self.session_key()?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO projects (name, description, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Project {
            id: result.last_insert_rowid(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            created_at: now,
            deleted_at: None,
        })
    }

    async fn update_project(&self, id: i64, draft: &ProjectDraft) -> CofreResult<()> {
        self.session_key()?;
        let result = sqlx::query("UPDATE projects SET name = ?1, description = ?2 WHERE id = ?3")
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        Ok(())
    }

    async fn soft_delete_project(&self, id: i64) -> CofreResult<()> {
        self.session_key()?;
        let mut tx = self.pool.begin().await?;

        // Orphan the project's secrets; deleting a project never cascades.
        sqlx::query("UPDATE secrets SET project_id = NULL WHERE project_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("UPDATE projects SET deleted_at = ?1 WHERE id = ?2")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    async fn restore_project(&self, id: i64) -> CofreResult<()> {
        self.session_key()?;
        let result = sqlx::query("UPDATE projects SET deleted_at = NULL WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        Ok(())
    }

    async fn purge_project(&self, id: i64) -> CofreResult<()> {
        self.session_key()?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE secrets SET project_id = NULL WHERE project_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_attachments(&self, secret_id: i64) -> CofreResult<Vec<AttachmentMetadata>> {
        self.session_key()?;
        let rows = sqlx::query(
            "SELECT id, secret_id, filename, mime_type, file_size, created_at
             FROM attachments WHERE secret_id = ?1 ORDER BY created_at ASC, id ASC",
        )
        .bind(secret_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let created_at_text: String = row.try_get("created_at")?;
                Ok(AttachmentMetadata {
                    id: row.try_get("id")?,
                    secret_id: row.try_get("secret_id")?,
                    filename: row.try_get("filename")?,
                    mime_type: row.try_get("mime_type")?,
                    file_size: row.try_get("file_size")?,
                    created_at: Self::parse_timestamp(&created_at_text)?,
                })
            })
            .collect()
    }

    async fn add_attachment(
        &self,
        secret_id: i64,
        filename: &str,
        mime_type: &str,
        content: &[u8],
    ) -> CofreResult<AttachmentMetadata> {
        let key = self.session_key()?;
        let blob = crypto::encrypt(&key, content)?;
        let now = Utc::now();
        let file_size = content.len() as i64;

        let result = sqlx::query(
            "INSERT INTO attachments (secret_id, filename, mime_type, file_size, content_cipher, content_nonce, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(secret_id)
        .bind(filename)
        .bind(mime_type)
        .bind(file_size)
        .bind(&blob.ciphertext)
        .bind(blob.nonce.to_vec())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AttachmentMetadata {
            id: result.last_insert_rowid(),
            secret_id,
            filename: filename.to_owned(),
            mime_type: mime_type.to_owned(),
            file_size,
            created_at: now,
        })
    }

    async fn fetch_attachment(&self, attachment_id: i64) -> CofreResult<Vec<u8>> {
        let key = self.session_key()?;
        let row = sqlx::query(
            "SELECT content_cipher, content_nonce FROM attachments WHERE id = ?1",
        )
        .bind(attachment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CofreError::NotFound)?;

        let cipher: Vec<u8> = row.try_get("content_cipher")?;
        let nonce_blob: Vec<u8> = row.try_get("content_nonce")?;
        let nonce = Self::nonce_from_blob(&nonce_blob)?;
        crypto::decrypt(&key, &nonce, &cipher)
    }

    async fn delete_attachment(&self, attachment_id: i64) -> CofreResult<()> {
        self.session_key()?;
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?1")
            .bind(attachment_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CofreError::NotFound);
        }
        Ok(())
    }

    async fn empty_trash(&self) -> CofreResult<()> {
        self.session_key()?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM secrets WHERE deleted_at IS NOT NULL")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM projects WHERE deleted_at IS NOT NULL")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn export_vault(&self, destination: &str, password: SecretString) -> CofreResult<()> {
        let mut secrets = self.list_secrets(false).await?;
        secrets.extend(self.list_secrets(true).await?);
        let mut projects = self.list_projects(false).await?;
        projects.extend(self.list_projects(true).await?);

        let file = backup::export_encrypted(secrets, projects, &password)?;
        let serialized = serde_json::to_string_pretty(&file)?;
        fs::write(destination, serialized).map_err(|_| CofreError::Storage)?;
        Ok(())
    }

    async fn import_vault(&self, source: &str, password: SecretString) -> CofreResult<String> {
        let key = self.session_key()?;
        let content = fs::read_to_string(source).map_err(|_| CofreError::Storage)?;
        let file: BackupFile = serde_json::from_str(&content)?;
        let payload = backup::import_encrypted(&file, &password)?;

        // Projects first so imported secrets can reference them.
        for project in &payload.projects {
            self.insert_project_row(project).await?;
        }
        for secret in &payload.secrets {
            self.insert_secret_row(secret, &key).await?;
        }

        Ok(format!(
            "Imported {} secrets and {} projects",
            payload.secrets.len(),
            payload.projects.len()
        ))
    }
}
