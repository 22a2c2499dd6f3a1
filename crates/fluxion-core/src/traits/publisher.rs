// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pub/sub collaborator used to emit derived messages.

use async_trait::async_trait;

use crate::error::FluxionError;
use crate::types::BusMessage;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `message` under the given routing subject.
    async fn publish(&self, subject: &str, message: &BusMessage) -> Result<(), FluxionError>;
}
