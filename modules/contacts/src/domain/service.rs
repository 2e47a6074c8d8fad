use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{Contact, ContactInput};
use crate::domain::error::DomainError;
use crate::domain::repo::ContactsRepository;
use crate::domain::validation;

/// Domain service with business rules for contact management.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn ContactsRepository>,
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(repo: Arc<dyn ContactsRepository>) -> Self {
        Self { repo }
    }

    #[instrument(name = "contacts.service.list_contacts", skip(self))]
    pub async fn list_contacts(&self) -> Result<Vec<Contact>, DomainError> {
        debug!("Listing contacts");

        let contacts = self
            .repo
            .list_all()
            .await
            .map_err(|e| DomainError::persistence(&e))?;

        debug!("Successfully listed {} contacts", contacts.len());
        Ok(contacts)
    }

    #[instrument(name = "contacts.service.create_contact", skip(self, input))]
    pub async fn create_contact(&self, input: ContactInput) -> Result<Contact, DomainError> {
        info!("Creating new contact");

        let new_contact = validation::validate_new_contact(input)?;

        let contact = self
            .repo
            .insert(new_contact)
            .await
            .map_err(|e| DomainError::persistence(&e))?;

        info!("Successfully created contact with id={}", contact.id);
        Ok(contact)
    }

    #[instrument(name = "contacts.service.delete_contact", skip(self), fields(contact_id = %id))]
    pub async fn delete_contact(&self, id: &str) -> Result<(), DomainError> {
        info!("Deleting contact");

        // A malformed id cannot name a stored contact.
        let Ok(uuid) = Uuid::parse_str(id) else {
            debug!("Contact id is not a UUID");
            return Err(DomainError::contact_not_found(id));
        };

        let deleted = self
            .repo
            .delete_by_id(uuid)
            .await
            .map_err(|e| DomainError::persistence(&e))?;

        if !deleted {
            return Err(DomainError::contact_not_found(id));
        }

        info!("Successfully deleted contact");
        Ok(())
    }
}
