// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-encoding message repository contracts.

use async_trait::async_trait;

use crate::error::FluxionError;
use crate::message::{Message, MessagesPage};
use crate::query::{JsonPageMetadata, SenmlPageMetadata};
use crate::types::HealthStatus;

/// Storage for SenML records.
///
/// Implementations translate [`SenmlPageMetadata`] into their native query
/// form. A missing underlying relation reads as an empty page.
#[async_trait]
pub trait SenmlRepository: Send + Sync {
    /// Applies filter, pagination and optional aggregation.
    async fn retrieve(
        &self,
        query: &SenmlPageMetadata,
    ) -> Result<MessagesPage<SenmlPageMetadata>, FluxionError>;

    /// Like `retrieve`, but always returns every match.
    async fn backup(
        &self,
        query: &SenmlPageMetadata,
    ) -> Result<MessagesPage<SenmlPageMetadata>, FluxionError> {
        self.retrieve(&query.unbounded()).await
    }

    /// Bulk-inserts records. Any non-SenML record fails the whole call.
    async fn restore(&self, messages: Vec<Message>) -> Result<(), FluxionError>;

    /// Deletes every record matching the filter. An empty filter is refused.
    async fn remove(&self, query: &SenmlPageMetadata) -> Result<(), FluxionError>;

    async fn health_check(&self) -> Result<HealthStatus, FluxionError>;
}

/// Storage for JSON records.
#[async_trait]
pub trait JsonRepository: Send + Sync {
    async fn retrieve(
        &self,
        query: &JsonPageMetadata,
    ) -> Result<MessagesPage<JsonPageMetadata>, FluxionError>;

    async fn backup(
        &self,
        query: &JsonPageMetadata,
    ) -> Result<MessagesPage<JsonPageMetadata>, FluxionError> {
        self.retrieve(&query.unbounded()).await
    }

    /// Bulk-inserts records. Any non-JSON record fails the whole call.
    async fn restore(&self, messages: Vec<Message>) -> Result<(), FluxionError>;

    async fn remove(&self, query: &JsonPageMetadata) -> Result<(), FluxionError>;

    async fn health_check(&self) -> Result<HealthStatus, FluxionError>;
}
