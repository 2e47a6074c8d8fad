use utoipa::OpenApi;

use crate::api::rest::{dto, handlers};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_contacts,
        handlers::create_contact,
        handlers::delete_contact
    ),
    components(schemas(dto::ContactDto, dto::CreateContactReq, dto::MessageResponse)),
    tags((name = "contacts", description = "Contact management"))
)]
pub struct ContactsApiDoc;
