use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::contract::model::{Contact, ContactInput};

/// REST DTO for contact representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// REST DTO for creating a new contact.
///
/// Every field is optional on the wire so that missing fields reach
/// validation instead of failing deserialization. Form clients often send
/// numbers (a phone of `5551234`), so scalars are read as their text;
/// objects and arrays are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateContactReq {
    #[serde(default, deserialize_with = "required_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "required_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "required_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub message: Option<String>,
}

fn scalar_text<E: serde::de::Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => {
            Err(E::custom("expected a string, number or boolean"))
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// `0` and `false` count as not provided for required fields.
fn required_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if is_falsy(&value) {
        return Ok(Some(String::new()));
    }
    scalar_text(value)
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_text(Value::deserialize(deserializer)?)
}

/// `{message}` body for confirmations and client errors, `{message, error}` for failures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    pub fn with_error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

// Conversion implementations between REST DTOs and contract models

impl From<Contact> for ContactDto {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            message: contact.message,
            created_at: contact.created_at,
        }
    }
}

impl From<CreateContactReq> for ContactInput {
    fn from(req: CreateContactReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            message: req.message,
        }
    }
}
