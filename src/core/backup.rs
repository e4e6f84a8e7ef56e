use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::{
    crypto,
    errors::{CofreError, CofreResult},
    models::{Project, Secret},
};

const BACKUP_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupPayload {
    pub schema_version: u32,
    pub exported_at: String,
    pub secrets: Vec<Secret>,
    pub projects: Vec<Project>,
}

/// Self-contained backup file: carries its own salt, so only the backup
/// password is needed to decrypt it.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackupFile {
    pub format_version: u32,
    pub salt: String,
    pub nonce_b64: String,
    pub ciphertext_b64: String,
    pub checksum_hex: String,
}

pub fn export_encrypted(
    secrets: Vec<Secret>,
    projects: Vec<Project>,
    password: &SecretString,
) -> CofreResult<BackupFile> {
    let payload = BackupPayload {
        schema_version: BACKUP_FORMAT_VERSION,
        exported_at: Utc::now().to_rfc3339(),
        secrets,
        projects,
    };

    let salt = crypto::generate_salt();
    let key = crypto::derive_key(password, &salt)?;
    let serialized = serde_json::to_vec(&payload)?;
    let encrypted = crypto::encrypt(&key, &serialized)?;

    let mut hasher = Sha256::new();
    hasher.update(encrypted.nonce);
    hasher.update(&encrypted.ciphertext);
    let checksum = hasher.finalize();

    Ok(BackupFile {
        format_version: BACKUP_FORMAT_VERSION,
        salt,
        nonce_b64: STANDARD.encode(encrypted.nonce),
        ciphertext_b64: STANDARD.encode(encrypted.ciphertext),
        checksum_hex: hex::encode(checksum),
    })
}

pub fn import_encrypted(file: &BackupFile, password: &SecretString) -> CofreResult<BackupPayload> {
    if file.format_version != BACKUP_FORMAT_VERSION {
        return Err(CofreError::Config(
            "unsupported backup format version".to_owned(),
        ));
    }

    let nonce_bytes = STANDARD
        .decode(file.nonce_b64.as_bytes())
        .map_err(|_| CofreError::Serialization)?;
    if nonce_bytes.len() != crypto::NONCE_SIZE {
        return Err(CofreError::Serialization);
    }
    let ciphertext = STANDARD
        .decode(file.ciphertext_b64.as_bytes())
        .map_err(|_| CofreError::Serialization)?;

    let mut hasher = Sha256::new();
    hasher.update(&nonce_bytes);
    hasher.update(&ciphertext);
    if hex::encode(hasher.finalize()) != file.checksum_hex {
        return Err(CofreError::Crypto);
    }

    let key = crypto::derive_key(password, &file.salt)?;
    let mut nonce = [0u8; crypto::NONCE_SIZE];
    nonce.copy_from_slice(&nonce_bytes);
    let plaintext = crypto::decrypt(&key, &nonce, &ciphertext)
        .map_err(|_| CofreError::InvalidCredentials)?;

    let payload: BackupPayload = serde_json::from_slice(&plaintext)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;

    use super::{export_encrypted, import_encrypted};
    use crate::core::models::{Project, Secret};

    fn password(value: &str) -> SecretString {
        SecretString::new(value.to_owned().into_boxed_str())
    }

    fn sample_records() -> (Vec<Secret>, Vec<Project>) {
        let secret = Secret {
            id: 1,
            title: "GitHub".to_owned(),
            username: Some("a@b.com".to_owned()),
            password: "x".to_owned(),
            created_at: Utc::now(),
            project_id: None,
            deleted_at: None,
        };
        let project = Project {
            id: 1,
            name: "Infra".to_owned(),
            description: None,
            created_at: Utc::now(),
            deleted_at: None,
        };
        (vec![secret], vec![project])
    }

    #[test]
    fn export_import_roundtrip() {
        let (secrets, projects) = sample_records();
        let file =
            export_encrypted(secrets.clone(), projects, &password("backup-pass")).expect("export");

        let payload = import_encrypted(&file, &password("backup-pass")).expect("import");
        assert_eq!(payload.secrets, secrets);
        assert_eq!(payload.projects.len(), 1);
    }

    #[test]
    fn import_rejects_wrong_password() {
        let (secrets, projects) = sample_records();
        let file = export_encrypted(secrets, projects, &password("backup-pass")).expect("export");

        assert!(import_encrypted(&file, &password("other-pass")).is_err());
    }

    #[test]
    fn import_rejects_tampered_ciphertext() {
        let (secrets, projects) = sample_records();
        let mut file = export_encrypted(secrets, projects, &password("backup-pass")).expect("export");
        file.checksum_hex = "00".repeat(32);

        assert!(import_encrypted(&file, &password("backup-pass")).is_err());
    }
}
