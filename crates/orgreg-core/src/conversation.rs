//! Conversation engine: applies form decisions to the store and sends replies
//!
//! Transports decode platform updates into [`InboundUpdate`] and hand them to
//! [`Conversation::handle`]. The engine owns no platform types; replies leave
//! through a [`ReplyGateway`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::core::error::AppResult;
use crate::form::{decide, render, Inbound, Reply, Write};
use crate::i18n;
use crate::storage::SubscriberStore;

/// Outbound side of the bot platform.
#[async_trait]
pub trait ReplyGateway: Send + Sync {
    async fn send_reply(&self, subscriber_id: i64, reply: &Reply) -> AppResult<()>;
}

#[async_trait]
impl<G: ReplyGateway + ?Sized> ReplyGateway for Arc<G> {
    async fn send_reply(&self, subscriber_id: i64, reply: &Reply) -> AppResult<()> {
        (**self).send_reply(subscriber_id, reply).await
    }
}

/// A platform update reduced to what the form needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    pub subscriber_id: i64,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    /// IETF tag reported by the client, used only to pick the reply language
    pub language_code: Option<String>,
    pub input: Inbound,
}

impl InboundUpdate {
    pub fn new(subscriber_id: i64, text: &str) -> Self {
        Self {
            subscriber_id,
            handle: None,
            display_name: None,
            language_code: None,
            input: Inbound::parse(text),
        }
    }
}

/// What happened to an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    /// Nothing written, nothing sent.
    Ignored,
    /// The write was committed but the reply could not be delivered.
    /// Processing the same update again would apply it to the next field.
    ReplyFailed,
}

/// One async mutex per subscriber, so updates from the same user are
/// handled one at a time while different users proceed in parallel.
///
/// Entries live only while some task holds or waits on them.
#[derive(Default)]
pub(crate) struct SubscriberLocks {
    inner: DashMap<i64, Arc<Mutex<()>>>,
}

impl SubscriberLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock_for(&self, subscriber_id: i64) -> Arc<Mutex<()>> {
        self.inner
            .entry(subscriber_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the entry for `subscriber_id` unless another task still holds a
    /// handle to it. The caller must have dropped its own handle first.
    pub(crate) fn release(&self, subscriber_id: i64) {
        self.inner
            .remove_if(&subscriber_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Registration form driver with its collaborators injected.
pub struct Conversation<G> {
    store: SubscriberStore,
    gateway: G,
    locks: SubscriberLocks,
}

impl<G: ReplyGateway> Conversation<G> {
    pub fn new(store: SubscriberStore, gateway: G) -> Self {
        Self {
            store,
            gateway,
            locks: SubscriberLocks::new(),
        }
    }

    pub fn store(&self) -> &SubscriberStore {
        &self.store
    }

    /// Runs one update through read → decide → write → reply.
    ///
    /// A store failure aborts before anything is sent, and so does a send
    /// failure when nothing was written; both surface as `Err` and the update
    /// may be processed again. A send failure after a committed write is
    /// logged and reported as [`Outcome::ReplyFailed`].
    pub async fn handle(&self, update: InboundUpdate) -> AppResult<Outcome> {
        let id = update.subscriber_id;
        let lock = self.locks.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.process(update).await
        };
        drop(lock);
        self.locks.release(id);
        result
    }

    async fn process(&self, update: InboundUpdate) -> AppResult<Outcome> {
        let id = update.subscriber_id;
        let record = self.store.get(id)?;
        let decision = decide(record.as_ref(), &update.input);
        log::debug!(
            "Subscriber {} input {:?} in state {:?} -> {:?}",
            id,
            update.input,
            record.as_ref().map(|r| r.state),
            decision
        );

        let committed = match &decision.write {
            Write::Nothing => false,
            Write::Create => {
                self.store
                    .create(id, update.handle.as_deref(), update.display_name.as_deref())?;
                true
            }
            Write::Patch(patch) => {
                self.store.update(id, patch)?;
                log::info!("Subscriber {} form advanced to {:?}", id, patch.state);
                true
            }
        };

        let Some(prompt) = decision.prompt else {
            return Ok(Outcome::Ignored);
        };

        let display_name = record
            .as_ref()
            .and_then(|r| r.display_name.as_deref())
            .or(update.display_name.as_deref());
        let lang = i18n::lang_for_telegram(update.language_code.as_deref());
        let reply = render(&prompt, &lang, display_name);

        match self.gateway.send_reply(id, &reply).await {
            Ok(()) => Ok(Outcome::Replied),
            Err(e) if committed => {
                log::warn!("Reply to subscriber {} failed after its answer was saved: {}", id, e);
                Ok(Outcome::ReplyFailed)
            }
            Err(e) => Err(e),
        }
    }
}
