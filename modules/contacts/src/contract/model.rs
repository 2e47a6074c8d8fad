use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored contact (no serde; the REST layer owns the wire shape)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create request exactly as received, before any validation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Validated and normalized data for a new contact; the store assigns id and created_at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: Option<String>,
}
