use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Name, email, and phone are required")]
    MissingRequiredFields,

    #[error("Invalid email format: '{email}'")]
    InvalidEmail { email: String },

    #[error("Contact not found: {id}")]
    ContactNotFound { id: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl DomainError {
    pub fn missing_required_fields() -> Self {
        Self::MissingRequiredFields
    }

    pub fn invalid_email(email: impl Into<String>) -> Self {
        Self::InvalidEmail {
            email: email.into(),
        }
    }

    pub fn contact_not_found(id: impl Into<String>) -> Self {
        Self::ContactNotFound { id: id.into() }
    }

    /// Outer context plus the root cause; this is what clients see in the
    /// `error` field. Intermediate layers often repeat their source in their
    /// own message, so they are skipped.
    pub fn persistence(err: &anyhow::Error) -> Self {
        let root = err.root_cause();
        let message = if err.chain().count() > 1 {
            format!("{err}: {root}")
        } else {
            err.to_string()
        };
        Self::Persistence { message }
    }
}
