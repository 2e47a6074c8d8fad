use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    response::Json,
    Extension,
};
use tracing::info;

use crate::api::rest::dto::{ContactDto, CreateContactReq, MessageResponse};
use crate::api::rest::error::{map_domain_error, map_json_rejection, ApiError, Operation};
use crate::domain::service::Service;

/// List all contacts, newest first
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "contacts",
    operation_id = "contacts.list_contacts",
    responses(
        (status = 200, description = "All contacts, newest first", body = [ContactDto]),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn list_contacts(
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<Vec<ContactDto>>, ApiError> {
    info!("Listing contacts");

    let contacts = svc
        .list_contacts()
        .await
        .map_err(|e| map_domain_error(&e, Operation::List))?;

    Ok(Json(contacts.into_iter().map(ContactDto::from).collect()))
}

/// Create a new contact
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "contacts",
    operation_id = "contacts.create_contact",
    request_body = CreateContactReq,
    responses(
        (status = 201, description = "Created contact", body = ContactDto),
        (status = 400, description = "Missing fields, invalid email or malformed body", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn create_contact(
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateContactReq>, JsonRejection>,
) -> Result<(StatusCode, Json<ContactDto>), ApiError> {
    let Json(req_body) = payload.map_err(|rejection| map_json_rejection(&rejection))?;
    info!("Creating contact");

    let contact = svc
        .create_contact(req_body.into())
        .await
        .map_err(|e| map_domain_error(&e, Operation::Create))?;

    Ok((StatusCode::CREATED, Json(ContactDto::from(contact))))
}

/// Delete a contact by ID
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "contacts",
    operation_id = "contacts.delete_contact",
    params(("id" = String, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact deleted", body = MessageResponse),
        (status = 404, description = "No contact with that id", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn delete_contact(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    info!("Deleting contact: {}", id);

    svc.delete_contact(&id)
        .await
        .map_err(|e| map_domain_error(&e, Operation::Delete))?;

    Ok(Json(MessageResponse::new("Contact deleted successfully")))
}
