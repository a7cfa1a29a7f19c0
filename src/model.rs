//! Domain types — email records and per-owner stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted email — the unit of work for the delivery pipeline.
///
/// Created once at the start of a send, then mutated exactly twice by the
/// same pipeline call: the spam-score update and the delivery-status update.
/// `delivered` only ever moves `false → true`; `sent_at` is set exactly once,
/// together with that transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Spam-risk score in `[0.0, 1.0]`. Starts at 0.0.
    pub spam_score: f64,
    pub delivered: bool,
    /// Set iff `delivered` is true.
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new email record.
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub owner_id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Per-owner aggregate stats over sent and attempted emails.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmailStats {
    pub total: u64,
    pub delivered: u64,
    /// Emails with spam_score > 0.5.
    pub spam_count: u64,
    pub avg_spam_score: f64,
}

impl EmailStats {
    /// Delivered emails as a percentage of all attempts.
    pub fn delivery_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.delivered as f64 / self.total as f64 * 100.0
        }
    }

    /// Spam-flagged emails as a percentage of all attempts.
    pub fn spam_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.spam_count as f64 / self.total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_are_zero_for_empty_stats() {
        let stats = EmailStats::default();
        assert_eq!(stats.delivery_rate(), 0.0);
        assert_eq!(stats.spam_rate(), 0.0);
    }

    #[test]
    fn rates_are_percentages() {
        let stats = EmailStats {
            total: 4,
            delivered: 3,
            spam_count: 1,
            avg_spam_score: 0.2,
        };
        assert_eq!(stats.delivery_rate(), 75.0);
        assert_eq!(stats.spam_rate(), 25.0);
    }
}
