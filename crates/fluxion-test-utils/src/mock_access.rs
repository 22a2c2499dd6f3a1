// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock access-control collaborator.
//!
//! Tokens are plain strings. A token is admin when registered with
//! [`MockAccessControl::with_admin`], and may access a publisher when
//! granted with [`MockAccessControl::grant`] (admins may access any
//! publisher). Every call is recorded for assertions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use fluxion_core::{AccessAction, AccessControl, FluxionError};

#[derive(Debug, Clone, Default)]
pub struct MockAccessControl {
    admins: HashSet<String>,
    grants: HashSet<(String, String)>,
    keys: HashMap<String, String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockAccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, token: &str) -> Self {
        self.admins.insert(token.to_string());
        self
    }

    pub fn grant(mut self, token: &str, publisher: &str) -> Self {
        self.grants
            .insert((token.to_string(), publisher.to_string()));
        self
    }

    pub fn with_key(mut self, key: &str, publisher: &str) -> Self {
        self.keys.insert(key.to_string(), publisher.to_string());
        self
    }

    /// Calls seen so far, e.g. `can_access:p1:view`, `is_admin`, `resolve_key`.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl AccessControl for MockAccessControl {
    async fn can_access_publisher(
        &self,
        token: &str,
        publisher_id: &str,
        action: AccessAction,
    ) -> Result<(), FluxionError> {
        self.record(format!("can_access:{publisher_id}:{action}"))
            .await;
        if token.is_empty() {
            return Err(FluxionError::Unauthenticated("missing token".into()));
        }
        let granted = self
            .grants
            .contains(&(token.to_string(), publisher_id.to_string()));
        if granted || self.admins.contains(token) {
            Ok(())
        } else {
            Err(FluxionError::Forbidden(format!(
                "no {action} access to publisher {publisher_id}"
            )))
        }
    }

    async fn is_admin(&self, token: &str) -> Result<(), FluxionError> {
        self.record("is_admin".to_string()).await;
        if token.is_empty() {
            return Err(FluxionError::Unauthenticated("missing token".into()));
        }
        if self.admins.contains(token) {
            Ok(())
        } else {
            Err(FluxionError::Forbidden("admin privileges required".into()))
        }
    }

    async fn resolve_key(&self, key: &str) -> Result<String, FluxionError> {
        self.record("resolve_key".to_string()).await;
        self.keys
            .get(key)
            .cloned()
            .ok_or_else(|| FluxionError::Unauthenticated("unknown thing key".into()))
    }
}
