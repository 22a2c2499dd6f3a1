// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access-control collaborator consumed by the reader service.

use async_trait::async_trait;
use strum::Display;

use crate::error::FluxionError;

/// Action a caller wants to perform on a publisher's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AccessAction {
    View,
    Delete,
}

/// Capability checks answered by the auth and things services.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Succeeds when the token's owner may perform `action` on `publisher_id`.
    async fn can_access_publisher(
        &self,
        token: &str,
        publisher_id: &str,
        action: AccessAction,
    ) -> Result<(), FluxionError>;

    /// Succeeds when the token belongs to a root/admin user.
    async fn is_admin(&self, token: &str) -> Result<(), FluxionError>;

    /// Resolves a thing key to the publisher (thing) ID it belongs to.
    async fn resolve_key(&self, key: &str) -> Result<String, FluxionError>;
}
