// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Fluxion platform.

use strum::Display;
use thiserror::Error;

/// Storage operation that failed, used to render a stable error sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StorageOp {
    Read,
    Save,
    Delete,
}

/// What a failed storage operation was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StorageEntity {
    #[strum(serialize = "messages")]
    Messages,
    #[strum(serialize = "scripts")]
    Scripts,
    #[strum(serialize = "script runs")]
    ScriptRuns,
    #[strum(serialize = "rules")]
    Rules,
}

/// Coarse classification of an error, used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller sent something malformed.
    Client,
    /// The caller is not authenticated or not allowed to do this.
    Auth,
    /// A specific entity does not exist.
    NotFound,
    /// Something failed on our side.
    Server,
}

/// The primary error type used across all Fluxion traits and core operations.
#[derive(Debug, Error)]
pub enum FluxionError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed query parameters, rejected before any storage call.
    #[error("malformed query: {0}")]
    Validation(String),

    /// The caller could not be identified (bad token, unknown thing key).
    #[error("failed to perform authentication: {0}")]
    Unauthenticated(String),

    /// The caller is known but lacks the required privilege.
    #[error("failed to perform authorization: {0}")]
    Forbidden(String),

    /// A specific entity was requested and does not exist.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// A record handed to Restore has the wrong shape for the repository.
    #[error("invalid message representation")]
    InvalidMessage,

    /// Remove was called with a query that constrains nothing.
    #[error("no delete criteria specified")]
    NoDeleteCriteria,

    /// Storage backend errors, wrapped once with the failed operation.
    #[error("failed to {op} {entity} from database: {source}")]
    Storage {
        op: StorageOp,
        entity: StorageEntity,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Sandbox setup or execution failure.
    #[error("script error: {message}")]
    Script { message: String },

    /// The pub/sub collaborator rejected a message.
    #[error("failed to publish message: {message}")]
    Publish {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FluxionError {
    /// Wraps a message-repository error as a storage failure for the given operation.
    pub fn storage<E>(op: StorageOp, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::storage_of(StorageEntity::Messages, op, source)
    }

    /// Wraps a backend error for a store holding something other than messages.
    pub fn storage_of<E>(entity: StorageEntity, op: StorageOp, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        FluxionError::Storage {
            op,
            entity,
            source: source.into(),
        }
    }

    /// Returns the transport-facing category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FluxionError::Validation(_)
            | FluxionError::InvalidMessage
            | FluxionError::NoDeleteCriteria => ErrorCategory::Client,
            FluxionError::Unauthenticated(_) | FluxionError::Forbidden(_) => ErrorCategory::Auth,
            FluxionError::NotFound(_) => ErrorCategory::NotFound,
            FluxionError::Config(_)
            | FluxionError::Storage { .. }
            | FluxionError::Script { .. }
            | FluxionError::Publish { .. }
            | FluxionError::Internal(_) => ErrorCategory::Server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_renders_stable_sentinel() {
        let err = FluxionError::storage(StorageOp::Read, "disk on fire");
        assert_eq!(
            err.to_string(),
            "failed to read messages from database: disk on fire"
        );
        let err = FluxionError::storage(StorageOp::Delete, "locked");
        assert!(err.to_string().starts_with("failed to delete messages"));
    }

    #[test]
    fn storage_error_names_the_entity() {
        let err = FluxionError::storage_of(StorageEntity::ScriptRuns, StorageOp::Save, "full");
        assert_eq!(err.to_string(), "failed to save script runs from database: full");
        let err = FluxionError::storage_of(StorageEntity::Rules, StorageOp::Read, "gone");
        assert!(err.to_string().starts_with("failed to read rules from"));
        assert_eq!(err.category(), ErrorCategory::Server);
    }

    #[test]
    fn categories_separate_client_auth_and_server_faults() {
        assert_eq!(
            FluxionError::Validation("x".into()).category(),
            ErrorCategory::Client
        );
        assert_eq!(FluxionError::NoDeleteCriteria.category(), ErrorCategory::Client);
        assert_eq!(
            FluxionError::Forbidden("x".into()).category(),
            ErrorCategory::Auth
        );
        assert_eq!(
            FluxionError::Unauthenticated("x".into()).category(),
            ErrorCategory::Auth
        );
        assert_eq!(
            FluxionError::NotFound("x".into()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            FluxionError::storage(StorageOp::Save, "x").category(),
            ErrorCategory::Server
        );
    }
}
