use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Extension, Router,
};

use crate::api::rest::handlers;
use crate::domain::service::Service;

pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    // GET /api/contacts - list, POST /api/contacts - create
    let contacts = Router::new()
        .route(
            "/api/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        // DELETE /api/contacts/{id} - delete by id
        .route("/api/contacts/{id}", delete(handlers::delete_contact))
        .layer(Extension(service));

    router.merge(contacts)
}
