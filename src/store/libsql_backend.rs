//! libSQL backend for recipient policies.
//!
//! Table `recipients`: primary key `recipient_email`, with the approved
//! senders and destination addresses stored as JSON arrays.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::pipeline::types::PolicyRecord;
use crate::store::migrations;
use crate::store::traits::PolicyStore;

/// libSQL-backed [`PolicyStore`].
pub struct LibSqlPolicyStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlPolicyStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Policy database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to create in-memory database: {e}")))?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Insert or replace a policy record.
    pub async fn upsert(&self, record: &PolicyRecord) -> Result<(), StoreError> {
        let approved = serde_json::to_string(&record.approved_senders)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let destinations = serde_json::to_string(&record.destinations)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO recipients (recipient_email, approved_emails, destination_emails, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(recipient_email) DO UPDATE SET
                    approved_emails = excluded.approved_emails,
                    destination_emails = excluded.destination_emails,
                    updated_at = excluded.updated_at",
                params![
                    record.recipient.as_str(),
                    approved,
                    destinations,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("upsert recipient: {e}")))?;

        debug!(recipient = %record.recipient, "Upserted policy record");
        Ok(())
    }

    /// Remove a recipient. Returns whether a row was deleted.
    #[cfg(test)]
    pub async fn remove(&self, recipient: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM recipients WHERE recipient_email = ?1",
                params![recipient],
            )
            .await
            .map_err(|e| StoreError::Query(format!("delete recipient: {e}")))?;
        Ok(affected > 0)
    }
}

/// Map a row `(recipient_email, approved_emails, destination_emails)`.
fn row_to_record(row: &libsql::Row) -> Result<PolicyRecord, StoreError> {
    let recipient: String = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("row parse: {e}")))?;
    let approved: String = row
        .get(1)
        .map_err(|e| StoreError::Query(format!("row parse: {e}")))?;
    let destinations: String = row
        .get(2)
        .map_err(|e| StoreError::Query(format!("row parse: {e}")))?;

    Ok(PolicyRecord {
        recipient,
        approved_senders: serde_json::from_str(&approved)
            .map_err(|e| StoreError::Serialization(format!("approved_emails: {e}")))?,
        destinations: serde_json::from_str(&destinations)
            .map_err(|e| StoreError::Serialization(format!("destination_emails: {e}")))?,
    })
}

#[async_trait]
impl PolicyStore for LibSqlPolicyStore {
    async fn get(&self, recipient: &str) -> Result<Option<PolicyRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT recipient_email, approved_emails, destination_emails
                 FROM recipients WHERE recipient_email = ?1",
                params![recipient],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get recipient: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get recipient: {e}"))),
        }
    }
}
