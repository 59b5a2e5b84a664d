//! The subscription registry and the deferred delivery queue.
//!
//! # Delivery model
//!
//! [`PostOffice::post`] only appends to the pending queue. Messages reach
//! subscribers when the owner calls [`PostOffice::deliver_all`], which
//! takes the whole queue and a snapshot of the subscription lists before
//! the first handler runs. Handlers get the post office back so they can
//! post replies or change their subscriptions, but nothing they do affects
//! the batch in flight: new messages wait for the next delivery phase and
//! subscription changes apply from the next phase on.
//!
//! # Recipients
//!
//! A message on topic `t` goes to the subscribers of `t` in subscription
//! order, followed by the wildcard subscribers in subscription order that
//! have not already received it. The union is computed at dispatch time,
//! so topics that appear after a wildcard subscription are still covered.

use std::collections::BTreeMap;
use std::mem;

use selfsim_types::EntityId;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::HandlerError;
use crate::message::{Message, topics};

/// Counts from one delivery phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages taken from the queue.
    pub messages: usize,
    /// Handler invocations made.
    pub deliveries: usize,
    /// Handler invocations that returned an error.
    pub failures: usize,
}

/// Topic registry plus pending message queue.
#[derive(Debug, Clone)]
pub struct PostOffice {
    /// Topic -> subscribers in subscription order.
    subscriptions: BTreeMap<String, Vec<EntityId>>,
    /// Messages awaiting the next delivery phase, in post order.
    pending: Vec<Message>,
    /// Serial for the next posted message.
    next_serial: u64,
}

impl Default for PostOffice {
    fn default() -> Self {
        Self::new()
    }
}

impl PostOffice {
    /// Create an empty post office. The first posted message gets serial 1.
    pub const fn new() -> Self {
        Self {
            subscriptions: BTreeMap::new(),
            pending: Vec::new(),
            next_serial: 1,
        }
    }

    /// Subscribe to each listed topic. Existing subscriptions are kept as
    /// they are, so a duplicate does not change delivery order.
    pub fn subscribe<S: AsRef<str>>(&mut self, subscriber: EntityId, topics: &[S]) {
        for topic in topics {
            let topic = topic.as_ref();
            let list = self.subscriptions.entry(topic.to_owned()).or_default();
            if list.contains(&subscriber) {
                continue;
            }
            list.push(subscriber);
            debug!(entity_id = %subscriber, topic, "subscribed");
        }
    }

    /// Remove the subscriber from each listed topic, returning how many
    /// subscriptions were removed.
    ///
    /// Unknown topics are skipped. A topic other than `*` is retired once
    /// its last subscriber leaves.
    pub fn unsubscribe<S: AsRef<str>>(&mut self, subscriber: EntityId, topics: &[S]) -> usize {
        let mut removed = 0_usize;
        for topic in topics {
            let topic = topic.as_ref();
            let Some(list) = self.subscriptions.get_mut(topic) else {
                debug!(entity_id = %subscriber, topic, "unsubscribe from unknown topic ignored");
                continue;
            };
            let before = list.len();
            list.retain(|id| *id != subscriber);
            if list.len() < before {
                removed = removed.saturating_add(1);
            }
            if list.is_empty() && topic != topics::WILDCARD {
                self.subscriptions.remove(topic);
                debug!(topic, "topic retired");
            }
        }
        removed
    }

    /// Remove the subscriber from every topic, returning how many
    /// subscriptions were removed.
    pub fn unsubscribe_all(&mut self, subscriber: EntityId) -> usize {
        let subscribed: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|(_, list)| list.contains(&subscriber))
            .map(|(topic, _)| topic.clone())
            .collect();
        self.unsubscribe(subscriber, &subscribed)
    }

    /// Queue a message for the next delivery phase and return its serial.
    pub fn post(&mut self, mut message: Message) -> u64 {
        let serial = self.next_serial;
        self.next_serial = serial.saturating_add(1);
        message.serial = serial;
        self.pending.push(message);
        serial
    }

    /// Deliver every pending message to its recipients.
    ///
    /// `handler` is called once per (recipient, message) pair, in post
    /// order and then recipient order. A failing handler is logged and
    /// reported as an `ERROR` message posted for the next phase; delivery
    /// continues with the next recipient. Failures while handling an
    /// `ERROR` message are logged only.
    pub fn deliver_all<F>(&mut self, now: u64, mut handler: F) -> DeliveryReport
    where
        F: FnMut(&mut Self, EntityId, &Message) -> Result<(), HandlerError>,
    {
        let batch = mem::take(&mut self.pending);
        let snapshot = self.subscriptions.clone();
        let mut report = DeliveryReport {
            messages: batch.len(),
            ..DeliveryReport::default()
        };

        for message in &batch {
            for recipient in recipients(&snapshot, &message.topic) {
                report.deliveries = report.deliveries.saturating_add(1);
                let Err(error) = handler(self, recipient, message) else {
                    continue;
                };
                report.failures = report.failures.saturating_add(1);
                warn!(
                    tick = now,
                    entity_id = %recipient,
                    topic = %message.topic,
                    serial = message.serial,
                    error = %error,
                    "message handler failed"
                );
                if !message.is(topics::ERROR) {
                    self.post(error_report(now, recipient, message, &error));
                }
            }
        }

        if report.messages > 0 {
            debug!(
                tick = now,
                messages = report.messages,
                deliveries = report.deliveries,
                failures = report.failures,
                "delivery phase complete"
            );
        }
        report
    }

    /// Messages waiting for the next delivery phase, in post order.
    pub fn pending(&self) -> &[Message] {
        &self.pending
    }

    /// Number of messages waiting for the next delivery phase.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// All topics with at least one subscriber, plus `*` if it was ever
    /// subscribed.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.keys().map(String::as_str)
    }

    /// Subscribers of `topic` in subscription order.
    pub fn subscribers_of(&self, topic: &str) -> &[EntityId] {
        self.subscriptions
            .get(topic)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `subscriber` is subscribed to `topic` itself (not via `*`).
    pub fn is_subscribed(&self, subscriber: EntityId, topic: &str) -> bool {
        self.subscribers_of(topic).contains(&subscriber)
    }

    /// Drop every subscription and pending message. Serials keep counting.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.pending.clear();
    }
}

/// Dispatch-time union of topic and wildcard subscribers.
fn recipients(subscriptions: &BTreeMap<String, Vec<EntityId>>, topic: &str) -> Vec<EntityId> {
    let mut out: Vec<EntityId> = subscriptions.get(topic).cloned().unwrap_or_default();
    if topic != topics::WILDCARD {
        for id in subscriptions.get(topics::WILDCARD).into_iter().flatten() {
            if !out.contains(id) {
                out.push(*id);
            }
        }
    }
    out
}

fn error_report(now: u64, recipient: EntityId, failed: &Message, error: &HandlerError) -> Message {
    Message::new(topics::ERROR, recipient, now)
        .with("msg", Value::Object(failed.payload.clone()))
        .with("topic", failed.topic.clone())
        .with("serial", failed.serial)
        .with("error", error.to_string())
}
