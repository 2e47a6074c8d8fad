//! Write-path rules for contacts, applied in this order:
//! presence of the required fields as received, email shape,
//! then trimming/lowercasing into a [`NewContact`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::contract::model::{ContactInput, NewContact};
use crate::domain::error::DomainError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

/// `name`, `email` and `phone` must be present and non-empty. Whitespace is
/// not stripped yet, so `"  "` passes here.
pub fn check_required(input: &ContactInput) -> Result<(), DomainError> {
    if present(&input.name) && present(&input.email) && present(&input.phone) {
        Ok(())
    } else {
        Err(DomainError::missing_required_fields())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn check_email_format(email: &str) -> Result<(), DomainError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(DomainError::invalid_email(email))
    }
}

/// Trim every field and lowercase the email. Required fields that end up
/// empty after trimming are rejected like missing ones.
pub fn normalize(input: ContactInput) -> Result<NewContact, DomainError> {
    fn required(value: Option<String>) -> Result<String, DomainError> {
        let trimmed = value.as_deref().map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Err(DomainError::missing_required_fields());
        }
        Ok(trimmed.to_owned())
    }

    let name = required(input.name)?;
    let email = required(input.email)?.to_lowercase();
    let phone = required(input.phone)?;
    let message = input.message.map(|m| m.trim().to_owned());

    check_email_format(&email)?;

    Ok(NewContact {
        name,
        email,
        phone,
        message,
    })
}

/// Full create-path validation: required check strictly before the format check.
pub fn validate_new_contact(input: ContactInput) -> Result<NewContact, DomainError> {
    check_required(&input)?;
    if let Some(email) = input.email.as_deref() {
        check_email_format(email)?;
    }
    normalize(input)
}
