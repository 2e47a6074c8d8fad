use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::rest::dto::MessageResponse;
use crate::domain::error::DomainError;

pub const REQUIRED_FIELDS_MSG: &str = "Name, email, and phone are required";
pub const INVALID_EMAIL_MSG: &str = "Invalid email format";
pub const NOT_FOUND_MSG: &str = "Contact not found";
pub const INVALID_BODY_MSG: &str = "Invalid request body";

/// Which endpoint failed; selects the 500 message clients see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Delete,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Error fetching contacts",
            Operation::Create => "Error creating contact",
            Operation::Delete => "Error deleting contact",
        }
    }
}

/// Error response: a status plus the JSON `{message, error?}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: MessageResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, body: MessageResponse) -> Self {
        Self { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                error = self.body.error.as_deref().unwrap_or_default(),
                "{}",
                self.body.message
            );
        } else {
            tracing::warn!(status = self.status.as_u16(), "{}", self.body.message);
        }
        (self.status, Json(self.body)).into_response()
    }
}

/// Map domain error to the HTTP status and body for `op`
pub fn map_domain_error(e: &DomainError, op: Operation) -> ApiError {
    match e {
        DomainError::MissingRequiredFields => ApiError::new(
            StatusCode::BAD_REQUEST,
            MessageResponse::new(REQUIRED_FIELDS_MSG),
        ),
        DomainError::InvalidEmail { .. } => ApiError::new(
            StatusCode::BAD_REQUEST,
            MessageResponse::new(INVALID_EMAIL_MSG),
        ),
        DomainError::ContactNotFound { .. } => {
            ApiError::new(StatusCode::NOT_FOUND, MessageResponse::new(NOT_FOUND_MSG))
        }
        DomainError::Persistence { message } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            MessageResponse::with_error(op.failure_message(), message.clone()),
        ),
    }
}

/// Unparseable or mistyped JSON bodies.
pub fn map_json_rejection(rejection: &JsonRejection) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        MessageResponse::with_error(INVALID_BODY_MSG, rejection.body_text()),
    )
}
