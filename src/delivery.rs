//! Delivery pipeline — the ordered sequence that sends one email.
//!
//! Sequence: persist draft → score → persist score → transport send →
//! persist delivery status. Every outcome is reported as a value; nothing
//! here panics or propagates an error past the boundary. Records are
//! retained whatever happens — a failed send leaves an audit trail with
//! `delivered = false`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::model::NewEmail;
use crate::spam::SpamScorer;
use crate::store::EmailStore;
use crate::transport::{MailTransport, OutgoingEmail};

/// Outcome of one `send_email` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Message accepted by the transport and the record marked delivered.
    Sent { record_id: Uuid, message_id: String },
    /// The sequence stopped. `record_id` is `None` only when the initial
    /// record insert itself failed.
    Failed {
        record_id: Option<Uuid>,
        reason: String,
    },
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Sequences record creation, scoring, transport send, and status updates.
///
/// No retry logic lives here; retry policy is the caller's concern.
pub struct DeliveryPipeline {
    store: Arc<dyn EmailStore>,
    transport: Arc<dyn MailTransport>,
    scorer: SpamScorer,
    from_address: String,
}

impl DeliveryPipeline {
    pub fn new(
        store: Arc<dyn EmailStore>,
        transport: Arc<dyn MailTransport>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            scorer: SpamScorer::new(),
            from_address: from_address.into(),
        }
    }

    /// Send one email on behalf of `owner_id`.
    ///
    /// Strictly ordered, no step skipped:
    /// 1. create the record (score 0, not delivered)
    /// 2. score and persist the score — a store failure here aborts without
    ///    attempting delivery
    /// 3. transport send
    /// 4. on success, persist `delivered = true` and the delivery instant
    pub async fn send_email(
        &self,
        owner_id: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> DeliveryOutcome {
        let new = NewEmail {
            owner_id: owner_id.to_string(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        let record = match self.store.create_email(&new).await {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Failed to create email record");
                return DeliveryOutcome::Failed {
                    record_id: None,
                    reason: format!("persistence failure: {e}"),
                };
            }
        };

        let spam_score = self.scorer.score(subject, body);
        if let Err(e) = self.store.update_spam_score(record.id, spam_score).await {
            error!(id = %record.id, error = %e, "Failed to persist spam score, aborting send");
            return DeliveryOutcome::Failed {
                record_id: Some(record.id),
                reason: format!("persistence failure: {e}"),
            };
        }

        info!(id = %record.id, spam_score, "Email record scored");

        let outgoing = OutgoingEmail {
            from: format!("\"MailHub\" <{}>", self.from_address),
            to: recipient.to_string(),
            subject: subject.to_string(),
            text_body: body.to_string(),
            html_body: render_html_body(subject, body, spam_score),
        };

        let receipt = match self.transport.send(&outgoing).await {
            Ok(receipt) => receipt,
            Err(e) => {
                // Record stays as an audit trail: delivered=false, sent_at=NULL.
                warn!(id = %record.id, error = %e, "Transport send failed");
                return DeliveryOutcome::Failed {
                    record_id: Some(record.id),
                    reason: format!("transport failure: {e}"),
                };
            }
        };

        let sent_at = Utc::now();
        if let Err(e) = self
            .store
            .update_delivery_status(record.id, true, Some(sent_at))
            .await
        {
            error!(id = %record.id, error = %e, "Sent but failed to persist delivery status");
            return DeliveryOutcome::Failed {
                record_id: Some(record.id),
                reason: format!("persistence failure after send: {e}"),
            };
        }

        info!(id = %record.id, message_id = %receipt.message_id, "Email delivered");
        DeliveryOutcome::Sent {
            record_id: record.id,
            message_id: receipt.message_id,
        }
    }
}

/// HTML rendering of the outbound message, with the spam score in the footer.
fn render_html_body(subject: &str, body: &str, spam_score: f64) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\">\
         <h2>{subject}</h2>\
         <div style=\"white-space: pre-wrap;\">{body}</div>\
         <hr style=\"margin: 20px 0; border: none; border-top: 1px solid #eee;\">\
         <p style=\"font-size: 12px; color: #666;\">\
         Sent via MailHub | Spam Score: {:.1}%</p></div>",
        spam_score * 100.0
    )
}
