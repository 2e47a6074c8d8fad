//! SeaORM-backed repository implementation for the domain port.
//!
//! The repository asks the shared [`DbHandle`] for a connection on every
//! call, so a database that was down at startup is picked up as soon as it
//! becomes reachable; until then each call fails with the connect error.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use db::DbHandle;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::contract::model::{Contact, NewContact};
use crate::domain::repo::ContactsRepository;
use crate::infra::storage::entity::{ActiveModel as ContactAM, Column, Entity as ContactEntity};

/// SeaORM repository impl.
pub struct SeaOrmContactsRepository {
    db: Arc<DbHandle>,
}

impl SeaOrmContactsRepository {
    pub fn new(db: Arc<DbHandle>) -> Self {
        Self { db }
    }

    async fn conn(&self) -> anyhow::Result<DatabaseConnection> {
        self.db.connect().await.context("database unavailable")
    }
}

#[async_trait::async_trait]
impl ContactsRepository for SeaOrmContactsRepository {
    async fn insert(&self, new_contact: NewContact) -> anyhow::Result<Contact> {
        let conn = self.conn().await?;
        let m = ContactAM {
            id: Set(Uuid::new_v4()),
            name: Set(new_contact.name),
            email: Set(new_contact.email),
            phone: Set(new_contact.phone),
            message: Set(new_contact.message),
            created_at: Set(Utc::now()),
        };
        let saved = m.insert(&conn).await.context("insert failed")?;
        Ok(saved.into())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Contact>> {
        let conn = self.conn().await?;
        let rows = ContactEntity::find()
            .order_by_desc(Column::CreatedAt)
            .all(&conn)
            .await
            .context("list_all failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
        let conn = self.conn().await?;
        let res = ContactEntity::delete_by_id(id)
            .exec(&conn)
            .await
            .context("delete failed")?;
        Ok(res.rows_affected > 0)
    }
}
