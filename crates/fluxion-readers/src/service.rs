// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reader service: authorization in front of the two message repositories.
//!
//! Listing follows a fixed decision tree per call:
//!
//! 1. an explicit publisher in the query must be visible to the caller;
//! 2. otherwise a thing key is resolved and its publisher injected;
//! 3. otherwise the caller must be an admin.
//!
//! Scoped deletes need publisher access only. Unscoped deletes, backup and
//! restore need admin. Repository errors pass through unchanged.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use fluxion_core::{
    AccessAction, AccessControl, FluxionError, JsonPageMetadata, JsonRepository, Message,
    MessagesPage, SenmlPageMetadata, SenmlRepository,
};

use crate::backends::Repositories;

/// How the caller identified itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A user token checked by the access-control collaborator.
    Token(String),
    /// A device key resolved to the publisher that owns it.
    ThingKey(String),
}

/// Full dump of both repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupArchive {
    #[serde(default)]
    pub json: Vec<Message>,
    #[serde(default)]
    pub senml: Vec<Message>,
}

/// Aggregate status of a multi-query search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    AllOk,
    Partial,
    AllFailed,
}

/// Per-query results of a search, in input order.
#[derive(Debug)]
pub struct SearchResults<M> {
    pub status: SearchStatus,
    pub outcomes: Vec<Result<MessagesPage<M>, FluxionError>>,
}

impl<M> SearchResults<M> {
    fn from_outcomes(outcomes: Vec<Result<MessagesPage<M>, FluxionError>>) -> Self {
        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        let status = if failed == 0 {
            SearchStatus::AllOk
        } else if failed == outcomes.len() {
            SearchStatus::AllFailed
        } else {
            SearchStatus::Partial
        };
        Self { status, outcomes }
    }
}

pub struct ReaderService {
    senml: Arc<dyn SenmlRepository>,
    json: Arc<dyn JsonRepository>,
    access: Arc<dyn AccessControl>,
    search_permits: Semaphore,
}

impl ReaderService {
    pub fn new(
        repositories: Repositories,
        access: Arc<dyn AccessControl>,
        max_concurrent_searches: usize,
    ) -> Self {
        Self {
            senml: repositories.senml,
            json: repositories.json,
            access,
            search_permits: Semaphore::new(max_concurrent_searches.max(1)),
        }
    }

    /// Decide which publisher (if any) the query must be scoped to.
    ///
    /// Returns the publisher to inject, or `None` when the query can run as given.
    async fn authorize_view(
        &self,
        credentials: &Credentials,
        publisher: &str,
    ) -> Result<Option<String>, FluxionError> {
        match credentials {
            Credentials::Token(token) if !publisher.is_empty() => {
                self.access
                    .can_access_publisher(token, publisher, AccessAction::View)
                    .await
                    .inspect_err(|e| debug!(publisher, error = %e, "view rejected"))?;
                Ok(None)
            }
            Credentials::ThingKey(key) => {
                let owner = self
                    .access
                    .resolve_key(key)
                    .await
                    .inspect_err(|e| debug!(error = %e, "thing key rejected"))?;
                if !publisher.is_empty() && publisher != owner {
                    debug!(publisher, owner = %owner, "thing key does not own publisher");
                    return Err(FluxionError::Forbidden(format!(
                        "key does not grant access to publisher {publisher}"
                    )));
                }
                Ok(Some(owner))
            }
            Credentials::Token(token) => {
                self.access
                    .is_admin(token)
                    .await
                    .inspect_err(|e| debug!(error = %e, "unscoped view rejected"))?;
                Ok(None)
            }
        }
    }

    async fn authorize_delete(&self, token: &str, publisher: &str) -> Result<(), FluxionError> {
        if publisher.is_empty() {
            return Err(FluxionError::Validation(
                "publisher is required to delete messages".into(),
            ));
        }
        self.access
            .can_access_publisher(token, publisher, AccessAction::Delete)
            .await
            .inspect_err(|e| debug!(publisher, error = %e, "delete rejected"))
    }

    async fn require_admin(&self, token: &str) -> Result<(), FluxionError> {
        self.access
            .is_admin(token)
            .await
            .inspect_err(|e| debug!(error = %e, "admin operation rejected"))
    }

    pub async fn list_senml_messages(
        &self,
        credentials: &Credentials,
        mut query: SenmlPageMetadata,
    ) -> Result<MessagesPage<SenmlPageMetadata>, FluxionError> {
        if let Some(owner) = self.authorize_view(credentials, &query.publisher).await? {
            query.publisher = owner;
        }
        self.senml.retrieve(&query).await
    }

    pub async fn list_json_messages(
        &self,
        credentials: &Credentials,
        mut query: JsonPageMetadata,
    ) -> Result<MessagesPage<JsonPageMetadata>, FluxionError> {
        if let Some(owner) = self.authorize_view(credentials, &query.publisher).await? {
            query.publisher = owner;
        }
        self.json.retrieve(&query).await
    }

    pub async fn delete_senml_messages(
        &self,
        token: &str,
        query: &SenmlPageMetadata,
    ) -> Result<(), FluxionError> {
        self.authorize_delete(token, &query.publisher).await?;
        self.senml.remove(query).await
    }

    pub async fn delete_json_messages(
        &self,
        token: &str,
        query: &JsonPageMetadata,
    ) -> Result<(), FluxionError> {
        self.authorize_delete(token, &query.publisher).await?;
        self.json.remove(query).await
    }

    pub async fn delete_all_senml_messages(
        &self,
        token: &str,
        query: &SenmlPageMetadata,
    ) -> Result<(), FluxionError> {
        self.require_admin(token).await?;
        self.senml.remove(query).await
    }

    pub async fn delete_all_json_messages(
        &self,
        token: &str,
        query: &JsonPageMetadata,
    ) -> Result<(), FluxionError> {
        self.require_admin(token).await?;
        self.json.remove(query).await
    }

    /// Dump every stored message of both encodings.
    pub async fn backup(&self, token: &str) -> Result<BackupArchive, FluxionError> {
        self.require_admin(token).await?;
        let json = self.json.backup(&JsonPageMetadata::default()).await?;
        let senml = self.senml.backup(&SenmlPageMetadata::default()).await?;
        info!(
            json = json.messages.len(),
            senml = senml.messages.len(),
            "backup collected"
        );
        Ok(BackupArchive {
            json: json.messages,
            senml: senml.messages,
        })
    }

    /// Restore both encodings. The two repositories are independent, so a
    /// failure in the second leaves the first applied.
    pub async fn restore(&self, token: &str, archive: BackupArchive) -> Result<(), FluxionError> {
        self.require_admin(token).await?;
        let (json_count, senml_count) = (archive.json.len(), archive.senml.len());
        self.json.restore(archive.json).await?;
        self.senml.restore(archive.senml).await?;
        info!(json = json_count, senml = senml_count, "restore applied");
        Ok(())
    }

    /// Run several SenML listings concurrently, tolerating per-query failure.
    pub async fn search_senml(
        &self,
        credentials: &Credentials,
        queries: Vec<SenmlPageMetadata>,
    ) -> SearchResults<SenmlPageMetadata> {
        let tasks = queries.into_iter().map(|query| async move {
            let _permit = self
                .search_permits
                .acquire()
                .await
                .map_err(|e| FluxionError::Internal(format!("search limiter closed: {e}")))?;
            self.list_senml_messages(credentials, query).await
        });
        SearchResults::from_outcomes(join_all(tasks).await)
    }

    /// Run several JSON listings concurrently, tolerating per-query failure.
    pub async fn search_json(
        &self,
        credentials: &Credentials,
        queries: Vec<JsonPageMetadata>,
    ) -> SearchResults<JsonPageMetadata> {
        let tasks = queries.into_iter().map(|query| async move {
            let _permit = self
                .search_permits
                .acquire()
                .await
                .map_err(|e| FluxionError::Internal(format!("search limiter closed: {e}")))?;
            self.list_json_messages(credentials, query).await
        });
        SearchResults::from_outcomes(join_all(tasks).await)
    }
}
