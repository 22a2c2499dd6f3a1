// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publisher that captures messages for assertion in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use fluxion_core::{BusMessage, FluxionError, Publisher};

#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<(String, BusMessage)>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish call fails.
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.set_failing(true);
        publisher
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// `(subject, message)` pairs in publish order.
    pub async fn published(&self) -> Vec<(String, BusMessage)> {
        self.published.lock().await.clone()
    }

    pub async fn subjects(&self) -> Vec<String> {
        self.published
            .lock()
            .await
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, subject: &str, message: &BusMessage) -> Result<(), FluxionError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FluxionError::Publish {
                message: format!("broker unavailable for {subject}"),
                source: None,
            });
        }
        self.published
            .lock()
            .await
            .push((subject.to_string(), message.clone()));
        Ok(())
    }
}
