//! End-to-end tests for the registration form against a real SQLite file
//!
//! Run with: cargo test -p orgreg-core --test conversation_test

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use orgreg_core::form::{FormState, KeyboardHint, Reply};
use orgreg_core::storage::{create_pool, Subscriber, SubscriberStore};
use orgreg_core::{AppError, AppResult, Conversation, InboundUpdate, Outcome, ReplyGateway};

/// Gateway that records every reply instead of sending it.
#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<(i64, Reply)>>,
}

impl RecordingGateway {
    fn take(&self) -> Vec<(i64, Reply)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl ReplyGateway for RecordingGateway {
    async fn send_reply(&self, subscriber_id: i64, reply: &Reply) -> AppResult<()> {
        self.sent.lock().unwrap().push((subscriber_id, reply.clone()));
        Ok(())
    }
}

struct FailingGateway;

#[async_trait]
impl ReplyGateway for FailingGateway {
    async fn send_reply(&self, _subscriber_id: i64, _reply: &Reply) -> AppResult<()> {
        Err(AppError::Gateway("chat not found".into()))
    }
}

struct Harness {
    _dir: TempDir,
    conversation: Conversation<Arc<RecordingGateway>>,
    gateway: Arc<RecordingGateway>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("users.db");
        let pool = create_pool(path.to_str().unwrap()).expect("failed to create pool");
        let store = SubscriberStore::new(Arc::new(pool));
        store.ensure_schema().expect("failed to apply schema");

        let gateway = Arc::new(RecordingGateway::default());
        Self {
            _dir: dir,
            conversation: Conversation::new(store, Arc::clone(&gateway)),
            gateway,
        }
    }

    async fn send(&self, id: i64, text: &str) -> Outcome {
        let update = InboundUpdate {
            handle: Some("ann".into()),
            display_name: Some("Ann".into()),
            language_code: Some("en".into()),
            ..InboundUpdate::new(id, text)
        };
        self.conversation.handle(update).await.expect("update failed")
    }

    fn record(&self, id: i64) -> Option<Subscriber> {
        self.conversation.store().get(id).unwrap()
    }
}

#[tokio::test]
async fn test_start_creates_single_fresh_record() {
    let h = Harness::new();

    assert_eq!(h.send(1, "/start").await, Outcome::Replied);

    let record = h.record(1).unwrap();
    assert_eq!(record.state, Some(FormState::AwaitingOrgName));
    assert_eq!(record.organization_name, None);
    assert_eq!(record.address, None);
    assert_eq!(record.contact, None);
    assert_eq!(record.handle.as_deref(), Some("ann"));
    assert_eq!(h.conversation.store().count().unwrap(), 1);

    let sent = h.gateway.take();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.text.contains("Ann"));
}

#[tokio::test]
async fn test_org_name_advances_to_address() {
    let h = Harness::new();
    h.send(1, "/start").await;

    h.send(1, "Acme").await;

    let record = h.record(1).unwrap();
    assert_eq!(record.organization_name.as_deref(), Some("Acme"));
    assert_eq!(record.state, Some(FormState::AwaitingAddress));
}

#[tokio::test]
async fn test_full_flow_then_start_reports_without_mutation() {
    let h = Harness::new();
    h.send(1, "/start").await;
    h.send(1, "Acme").await;
    h.send(1, "  1 Main St ").await;
    h.send(1, "555-0100").await;

    let completed = h.record(1).unwrap();
    assert_eq!(completed.organization_name.as_deref(), Some("Acme"));
    assert_eq!(completed.address.as_deref(), Some("1 Main St"));
    assert_eq!(completed.contact.as_deref(), Some("555-0100"));
    assert_eq!(completed.state, Some(FormState::Complete));

    let sent = h.gateway.take();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3].1.keyboard, KeyboardHint::Offer(vec!["/reset".to_string()]));

    assert_eq!(h.send(1, "/start").await, Outcome::Replied);
    let summary = h.gateway.take().pop().unwrap().1;
    assert!(summary.text.contains("Acme"));
    assert!(summary.text.contains("1 Main St"));
    assert!(summary.text.contains("555-0100"));
    assert_eq!(summary.keyboard, KeyboardHint::Offer(vec!["/reset".to_string()]));
    assert_eq!(h.record(1).unwrap(), completed);
}

#[tokio::test]
async fn test_reset_on_complete_record_restarts_form() {
    let h = Harness::new();
    for text in ["/start", "Acme", "1 Main St", "555-0100"] {
        h.send(1, text).await;
    }
    h.gateway.take();

    h.send(1, "/reset").await;

    let record = h.record(1).unwrap();
    assert_eq!(record.organization_name, None);
    assert_eq!(record.address, None);
    assert_eq!(record.contact, None);
    assert_eq!(record.state, Some(FormState::AwaitingOrgName));
    assert_eq!(h.gateway.take()[0].1.keyboard, KeyboardHint::Clear);

    // /start now behaves like first contact again, minus the insert.
    h.send(1, "/start").await;
    assert_eq!(h.record(1).unwrap(), record);
    assert!(h.gateway.take()[0].1.text.contains("organization name"));
}

#[tokio::test]
async fn test_text_when_complete_or_unknown_is_silent() {
    let h = Harness::new();

    assert_eq!(h.send(2, "hello").await, Outcome::Ignored);
    assert_eq!(h.record(2), None);

    for text in ["/start", "Acme", "1 Main St", "555-0100"] {
        h.send(1, text).await;
    }
    let before = h.record(1).unwrap();
    h.gateway.take();

    assert_eq!(h.send(1, "anything else").await, Outcome::Ignored);
    assert_eq!(h.record(1).unwrap(), before);
    assert!(h.gateway.take().is_empty());
}

#[tokio::test]
async fn test_unknown_command_is_not_stored() {
    let h = Harness::new();
    h.send(1, "/start").await;
    h.gateway.take();

    assert_eq!(h.send(1, "/help").await, Outcome::Ignored);
    assert_eq!(h.record(1).unwrap().organization_name, None);
    assert!(h.gateway.take().is_empty());
}

#[tokio::test]
async fn test_concurrent_updates_for_one_subscriber_are_serialized() {
    let h = Arc::new(Harness::new());
    h.send(1, "/start").await;

    let first = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.send(1, "Acme").await })
    };
    let second = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.send(1, "1 Main St").await })
    };
    first.await.unwrap();
    second.await.unwrap();

    // Whichever ran first became the organization name; neither write was lost.
    let record = h.record(1).unwrap();
    assert!(record.organization_name.is_some());
    assert!(record.address.is_some());
    assert_eq!(record.state, Some(FormState::AwaitingContact));
}

fn failing_conversation(dir: &TempDir) -> Conversation<FailingGateway> {
    let pool = create_pool(dir.path().join("users.db").to_str().unwrap()).unwrap();
    let store = SubscriberStore::new(Arc::new(pool));
    store.ensure_schema().unwrap();
    Conversation::new(store, FailingGateway)
}

#[tokio::test]
async fn test_reply_failure_after_write_keeps_the_write() {
    let dir = tempfile::tempdir().unwrap();
    let conversation = failing_conversation(&dir);

    let outcome = conversation.handle(InboundUpdate::new(1, "/start")).await.unwrap();
    assert_eq!(outcome, Outcome::ReplyFailed);

    let outcome = conversation.handle(InboundUpdate::new(1, "Acme")).await.unwrap();
    assert_eq!(outcome, Outcome::ReplyFailed);

    let record = conversation.store().get(1).unwrap().unwrap();
    assert_eq!(record.organization_name.as_deref(), Some("Acme"));
    assert_eq!(record.address, None);
    assert_eq!(record.state, Some(FormState::AwaitingAddress));
}

#[tokio::test]
async fn test_reply_failure_without_write_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let conversation = failing_conversation(&dir);
    conversation.handle(InboundUpdate::new(1, "/start")).await.unwrap();

    // Already awaiting the name: /start only prompts again.
    let result = conversation.handle(InboundUpdate::new(1, "/start")).await;

    assert!(matches!(result, Err(AppError::Gateway(_))));
    assert_eq!(
        conversation.store().get(1).unwrap().unwrap().state,
        Some(FormState::AwaitingOrgName)
    );
}

#[tokio::test]
async fn test_store_failure_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(dir.path().join("users.db").to_str().unwrap()).unwrap();
    // Schema deliberately not applied: every query fails.
    let store = SubscriberStore::new(Arc::new(pool));
    let gateway = Arc::new(RecordingGateway::default());
    let conversation = Conversation::new(store, Arc::clone(&gateway));

    let result = conversation.handle(InboundUpdate::new(1, "/start")).await;

    assert!(matches!(result, Err(AppError::Database(_))));
    assert!(gateway.take().is_empty());
}

#[tokio::test]
async fn test_ensure_schema_twice_keeps_data() {
    let h = Harness::new();
    h.send(1, "/start").await;
    h.send(1, "Acme").await;

    h.conversation.store().ensure_schema().unwrap();
    h.conversation.store().ensure_schema().unwrap();

    assert_eq!(h.conversation.store().count().unwrap(), 1);
    assert_eq!(h.record(1).unwrap().organization_name.as_deref(), Some("Acme"));
}
