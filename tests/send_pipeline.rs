//! End-to-end delivery pipeline tests: in-memory store, mock transports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mailhub::delivery::{DeliveryOutcome, DeliveryPipeline};
use mailhub::error::{StoreError, TransportError};
use mailhub::model::{EmailRecord, EmailStats, NewEmail};
use mailhub::store::{EmailStore, LibSqlStore};
use mailhub::transport::{MailTransport, OutgoingEmail, SendReceipt};

/// Transport double. On send it reads the owner's latest record back from the
/// store, so tests can assert what was durable at the moment of the send.
struct MockTransport {
    store: Arc<dyn EmailStore>,
    fail: bool,
    called: AtomicBool,
    observed: Mutex<Option<EmailRecord>>,
}

impl MockTransport {
    fn new(store: Arc<dyn EmailStore>, fail: bool) -> Self {
        Self {
            store,
            fail,
            called: AtomicBool::new(false),
            observed: Mutex::new(None),
        }
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, TransportError> {
        self.called.store(true, Ordering::SeqCst);

        let records = self
            .store
            .list_emails("owner-1", 1, 0)
            .await
            .expect("store readable from mock transport");
        *self.observed.lock().unwrap() = records.into_iter().next();

        if self.fail {
            return Err(TransportError::SendFailed(format!(
                "connection refused sending to {}",
                email.to
            )));
        }
        Ok(SendReceipt {
            message_id: "<mock@mailhub>".to_string(),
        })
    }

    async fn verify(&self) -> bool {
        !self.fail
    }
}

/// Store wrapper that fails selected operations.
struct FlakyStore {
    inner: Arc<dyn EmailStore>,
    fail_create: bool,
    fail_score_update: bool,
}

#[async_trait]
impl EmailStore for FlakyStore {
    async fn create_email(&self, new: &NewEmail) -> Result<EmailRecord, StoreError> {
        if self.fail_create {
            return Err(StoreError::Connection("store unreachable".into()));
        }
        self.inner.create_email(new).await
    }

    async fn get_email(&self, id: Uuid) -> Result<Option<EmailRecord>, StoreError> {
        self.inner.get_email(id).await
    }

    async fn list_emails(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EmailRecord>, StoreError> {
        self.inner.list_emails(owner_id, limit, offset).await
    }

    async fn update_spam_score(&self, id: Uuid, score: f64) -> Result<(), StoreError> {
        if self.fail_score_update {
            return Err(StoreError::Query("write rejected".into()));
        }
        self.inner.update_spam_score(id, score).await
    }

    async fn update_delivery_status(
        &self,
        id: Uuid,
        delivered: bool,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.inner.update_delivery_status(id, delivered, sent_at).await
    }

    async fn email_stats(&self, owner_id: &str) -> Result<EmailStats, StoreError> {
        self.inner.email_stats(owner_id).await
    }
}

async fn memory_store() -> Arc<dyn EmailStore> {
    Arc::new(LibSqlStore::new_memory().await.unwrap())
}

#[tokio::test]
async fn successful_send_marks_record_delivered() {
    let store = memory_store().await;
    let transport = Arc::new(MockTransport::new(Arc::clone(&store), false));
    let pipeline = DeliveryPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport) as Arc<dyn MailTransport>,
        "hub@example.com",
    );

    let before = Utc::now();
    let outcome = pipeline
        .send_email("owner-1", "alice@example.com", "Project update", "Hi team, status attached.")
        .await;

    let (record_id, message_id) = match outcome {
        DeliveryOutcome::Sent {
            record_id,
            message_id,
        } => (record_id, message_id),
        other => panic!("expected Sent, got {other:?}"),
    };
    assert_eq!(message_id, "<mock@mailhub>");

    let record = store.get_email(record_id).await.unwrap().unwrap();
    assert!(record.delivered);
    let sent_at = record.sent_at.expect("sent_at set on delivery");
    assert!(sent_at >= before - chrono::Duration::seconds(1));
    assert!(sent_at <= Utc::now() + chrono::Duration::seconds(1));
}

#[tokio::test]
async fn spam_score_is_persisted_before_the_transport_call() {
    let store = memory_store().await;
    let transport = Arc::new(MockTransport::new(Arc::clone(&store), false));
    let pipeline = DeliveryPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport) as Arc<dyn MailTransport>,
        "hub@example.com",
    );

    let outcome = pipeline
        .send_email(
            "owner-1",
            "alice@example.com",
            "FREE WIN CASH NOW!!!",
            "Call now 555-123-4567 http://example.com",
        )
        .await;
    assert!(outcome.is_sent());

    // The record the transport saw mid-send already carried the final score
    // and was not yet marked delivered.
    let observed = transport.observed.lock().unwrap().clone().unwrap();
    assert!((observed.spam_score - 0.80).abs() < 1e-9);
    assert!(!observed.delivered);
    assert!(observed.sent_at.is_none());
}

#[tokio::test]
async fn transport_failure_returns_failure_and_retains_record() {
    let store = memory_store().await;
    let transport = Arc::new(MockTransport::new(Arc::clone(&store), true));
    let pipeline = DeliveryPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport) as Arc<dyn MailTransport>,
        "hub@example.com",
    );

    let outcome = pipeline
        .send_email("owner-1", "alice@example.com", "Hello", "Hi Alice, quick question about Q3.")
        .await;

    let (record_id, reason) = match outcome {
        DeliveryOutcome::Failed {
            record_id: Some(id),
            reason,
        } => (id, reason),
        other => panic!("expected Failed with record id, got {other:?}"),
    };
    assert!(reason.contains("transport failure"));

    // Audit trail: the record survives with delivery fields untouched.
    let record = store.get_email(record_id).await.unwrap().unwrap();
    assert!(!record.delivered);
    assert!(record.sent_at.is_none());
}

#[tokio::test]
async fn score_update_failure_aborts_before_any_transport_attempt() {
    let inner = memory_store().await;
    let store: Arc<dyn EmailStore> = Arc::new(FlakyStore {
        inner: Arc::clone(&inner),
        fail_create: false,
        fail_score_update: true,
    });
    let transport = Arc::new(MockTransport::new(Arc::clone(&store), false));
    let pipeline = DeliveryPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport) as Arc<dyn MailTransport>,
        "hub@example.com",
    );

    let outcome = pipeline
        .send_email("owner-1", "alice@example.com", "Hello", "Hi Alice.")
        .await;

    match outcome {
        DeliveryOutcome::Failed {
            record_id: Some(_),
            reason,
        } => assert!(reason.contains("persistence failure")),
        other => panic!("expected Failed with record id, got {other:?}"),
    }
    assert!(!transport.called.load(Ordering::SeqCst), "no delivery attempt after a failed score write");
}

#[tokio::test]
async fn create_failure_reports_persistence_failure_without_record() {
    let inner = memory_store().await;
    let store: Arc<dyn EmailStore> = Arc::new(FlakyStore {
        inner,
        fail_create: true,
        fail_score_update: false,
    });
    let transport = Arc::new(MockTransport::new(Arc::clone(&store), false));
    let pipeline = DeliveryPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport) as Arc<dyn MailTransport>,
        "hub@example.com",
    );

    let outcome = pipeline
        .send_email("owner-1", "alice@example.com", "Hello", "Hi Alice.")
        .await;

    match outcome {
        DeliveryOutcome::Failed {
            record_id: None,
            reason,
        } => assert!(reason.contains("persistence failure")),
        other => panic!("expected Failed without record id, got {other:?}"),
    }
    assert!(!transport.called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failed_sends_still_count_in_owner_stats() {
    let store = memory_store().await;
    let failing = Arc::new(MockTransport::new(Arc::clone(&store), true));
    let working = Arc::new(MockTransport::new(Arc::clone(&store), false));

    let pipeline_fail = DeliveryPipeline::new(Arc::clone(&store), failing, "hub@example.com");
    let pipeline_ok = DeliveryPipeline::new(Arc::clone(&store), working, "hub@example.com");

    pipeline_fail
        .send_email("owner-1", "a@example.com", "One", "Hi there, first attempt.")
        .await;
    let ok = pipeline_ok
        .send_email("owner-1", "b@example.com", "Two", "Hi there, second attempt.")
        .await;
    assert!(ok.is_sent());

    let stats = store.email_stats("owner-1").await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.delivery_rate(), 50.0);
}
