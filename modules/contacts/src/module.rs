use std::sync::Arc;

use db::DbHandle;
use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use utoipa::OpenApi;

use crate::api::rest::{openapi::ContactsApiDoc, routes};
use crate::domain::repo::ContactsRepository;
use crate::domain::service::Service;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::sea_orm_repo::SeaOrmContactsRepository;

/// The contacts module: wires the SeaORM store into the domain service and
/// exposes the REST routes.
#[derive(Clone)]
pub struct Contacts {
    service: Arc<Service>,
}

impl Contacts {
    /// Build the module on top of a shared database handle.
    pub fn new(db: Arc<DbHandle>) -> Self {
        info!("Initializing contacts module");
        Self::with_repository(Arc::new(SeaOrmContactsRepository::new(db)))
    }

    /// Build the module over any repository implementation.
    pub fn with_repository(repo: Arc<dyn ContactsRepository>) -> Self {
        Self {
            service: Arc::new(Service::new(repo)),
        }
    }

    /// Register the contacts REST routes on `router`.
    pub fn register_rest(&self, router: axum::Router) -> axum::Router {
        info!("Registering contacts REST routes");
        routes::register_routes(router, self.service.clone())
    }

    /// OpenAPI document for the contacts routes.
    pub fn openapi() -> utoipa::openapi::OpenApi {
        ContactsApiDoc::openapi()
    }
}

/// Bring the schema up to date; registered as the `DbHandle` on-connect hook.
pub async fn migrate(conn: DatabaseConnection) -> Result<(), DbErr> {
    info!("Running contacts database migrations");
    Migrator::up(&conn, None).await?;
    info!("Contacts database migrations completed successfully");
    Ok(())
}
