use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A credential record. The client only ever holds a read-through copy;
/// the vault backend owns the persisted, encrypted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub project_id: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Secret {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Attachment content bytes are never cached client-side; only this
/// metadata is, per owning secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    pub id: i64,
    pub secret_id: i64,
    pub filename: String,
    pub mime_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

/// A file held locally between "user attached it" and "parent secret has a
/// confirmed backend id". Never persisted; no relation to any backend id.
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    pub local_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl PendingAttachment {
    pub fn new(filename: String, mime_type: String, content: Vec<u8>) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            filename,
            mime_type,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashKind {
    Secret,
    Project,
}

/// One row of the unified trash view, tagged by kind so restore and purge
/// need no per-kind branching at the call site.
#[derive(Debug, Clone, PartialEq)]
pub enum TrashItem {
    Secret(Secret),
    Project(Project),
}

impl TrashItem {
    pub fn kind(&self) -> TrashKind {
        match self {
            TrashItem::Secret(_) => TrashKind::Secret,
            TrashItem::Project(_) => TrashKind::Project,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            TrashItem::Secret(secret) => secret.id,
            TrashItem::Project(project) => project.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TrashItem::Secret(secret) => &secret.title,
            TrashItem::Project(project) => &project.name,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TrashItem::Secret(secret) => secret.deleted_at,
            TrashItem::Project(project) => project.deleted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecretDraft {
    pub title: String,
    pub username: Option<String>,
    pub password: String,
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub description: Option<String>,
}

/// Temporary id for an optimistically displayed record. Backend rowids are
/// always positive, so the negative range can never collide.
pub fn temp_record_id() -> i64 {
    -Utc::now().timestamp_millis()
}

pub fn is_temp_id(id: i64) -> bool {
    id < 0
}
