//! Backend-agnostic `EmailStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{EmailRecord, EmailStats, NewEmail};

/// Persistence collaborator for the delivery pipeline.
///
/// Implementations must make each write durable before returning; the
/// pipeline relies on every step's effect being persisted before the next
/// step starts.
#[async_trait]
pub trait EmailStore: Send + Sync {
    /// Insert a new email record with `spam_score = 0`, `delivered = false`,
    /// `sent_at = NULL`. Returns the created record.
    async fn create_email(&self, new: &NewEmail) -> Result<EmailRecord, StoreError>;

    /// Look up a record by id.
    async fn get_email(&self, id: Uuid) -> Result<Option<EmailRecord>, StoreError>;

    /// List an owner's records, newest first.
    async fn list_emails(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EmailRecord>, StoreError>;

    /// Persist a computed spam score on an existing record.
    async fn update_spam_score(&self, id: Uuid, score: f64) -> Result<(), StoreError>;

    /// Persist the delivery outcome on an existing record.
    async fn update_delivery_status(
        &self,
        id: Uuid,
        delivered: bool,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Aggregate stats for one owner.
    async fn email_stats(&self, owner_id: &str) -> Result<EmailStats, StoreError>;
}
