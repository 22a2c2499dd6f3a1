// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process message bus.
//!
//! Notifications and alarms emitted by the rules engine are published on
//! dotted subjects (`smtp.<id>`, `alarms.scripts.<id>`). The bus fans every
//! publication out to all subscribers over a tokio broadcast channel;
//! subscribers select subjects by prefix.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use fluxion_core::{BusMessage, FluxionError, Publisher};

/// Default channel capacity for the bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A message together with the subject it was published on.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub subject: String,
    pub message: BusMessage,
}

/// Broadcast bus implementing [`Publisher`].
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// The capacity bounds how many envelopes are buffered for slow subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Subscribe to every subject.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            prefix: String::new(),
        }
    }

    /// Subscribe to subjects equal to `prefix` or nested under it
    /// (`alarms` matches `alarms.scripts.s1` but not `alarmsx`).
    pub fn subscribe_subject(&self, prefix: impl Into<String>) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            prefix: prefix.into(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for EventBus {
    async fn publish(&self, subject: &str, message: &BusMessage) -> Result<(), FluxionError> {
        if subject.is_empty() {
            return Err(FluxionError::Publish {
                message: "empty subject".to_string(),
                source: None,
            });
        }
        let envelope = Envelope {
            subject: subject.to_string(),
            message: message.clone(),
        };
        // A send error only means nobody is listening right now.
        if self.tx.send(envelope).is_err() {
            debug!(subject, "published with no subscribers");
        }
        Ok(())
    }
}

/// Receiving half of a bus subscription.
pub struct Subscription {
    rx: broadcast::Receiver<Envelope>,
    prefix: String,
}

impl Subscription {
    fn matches(&self, subject: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        match subject.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }

    /// Receive the next matching envelope. Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => {
                    if self.matches(&envelope.subject) {
                        return Some(envelope);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, prefix = %self.prefix, "bus subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain the next buffered matching envelope without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => {
                    if self.matches(&envelope.subject) {
                        return Some(envelope);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
