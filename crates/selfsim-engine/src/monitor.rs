//! Wildcard subscriber that logs every delivered message.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use selfsim_core::{Context, Entity, EntityError};
use selfsim_events::{HandlerError, Message, topics};
use tracing::debug;

/// Per-topic delivery counts shared between a [`Monitor`] and its owner.
#[derive(Debug, Clone, Default)]
pub struct TopicCounts(Rc<RefCell<BTreeMap<String, u64>>>);

impl TopicCounts {
    /// Snapshot of the counts, ordered by topic.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.0.borrow().clone()
    }

    /// Messages seen on `topic`.
    pub fn get(&self, topic: &str) -> u64 {
        self.0.borrow().get(topic).copied().unwrap_or(0)
    }

    /// Messages seen on every topic.
    pub fn total(&self) -> u64 {
        self.0.borrow().values().copied().fold(0, u64::saturating_add)
    }

    fn record(&self, topic: &str) {
        let mut counts = self.0.borrow_mut();
        let entry = counts.entry(topic.to_owned()).or_insert(0);
        *entry = entry.saturating_add(1);
    }
}

/// Unplaced entity subscribed to [`topics::WILDCARD`].
#[derive(Debug)]
pub struct Monitor {
    counts: TopicCounts,
}

impl Monitor {
    /// A monitor and a handle to its counts.
    pub fn new() -> (Self, TopicCounts) {
        let counts = TopicCounts::default();
        (
            Self {
                counts: counts.clone(),
            },
            counts,
        )
    }
}

impl Entity for Monitor {
    fn label(&self) -> &str {
        "monitor"
    }

    fn subscription_topics(&self) -> Vec<String> {
        vec![topics::WILDCARD.to_owned()]
    }

    fn tick(&mut self, _ctx: &mut Context<'_>) -> Result<(), EntityError> {
        Ok(())
    }

    fn handle_message(
        &mut self,
        message: &Message,
        _ctx: &mut Context<'_>,
    ) -> Result<(), HandlerError> {
        self.counts.record(&message.topic);
        let payload = serde_json::to_string(&message.payload).unwrap_or_default();
        debug!(
            serial = message.serial,
            topic = %message.topic,
            sender = %message.sender,
            time = message.time,
            payload = %payload,
            "Message"
        );
        Ok(())
    }
}
