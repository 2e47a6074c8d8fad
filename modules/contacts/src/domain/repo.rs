use crate::contract::model::{Contact, NewContact};
use async_trait::async_trait;
use uuid::Uuid;

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait ContactsRepository: Send + Sync {
    /// Persist a validated contact.
    ///
    /// The store assigns `id` and `created_at` and returns the stored record.
    async fn insert(&self, new_contact: NewContact) -> anyhow::Result<Contact>;
    /// All contacts, newest `created_at` first. Empty when none exist.
    async fn list_all(&self) -> anyhow::Result<Vec<Contact>>;
    /// Delete by id. Returns true if a row was deleted, false if it was absent.
    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool>;
}
