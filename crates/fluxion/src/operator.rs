// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access control for the operator CLI.
//!
//! The CLI opens the message stores directly from the local configuration,
//! so whoever runs it already holds the data. The operator is treated as an
//! admin; device keys are refused.

use async_trait::async_trait;

use fluxion_core::{AccessAction, AccessControl, FluxionError};

/// Token the CLI presents to the reader service.
pub const OPERATOR_TOKEN: &str = "local-operator";

pub struct LocalOperator;

#[async_trait]
impl AccessControl for LocalOperator {
    async fn can_access_publisher(
        &self,
        token: &str,
        _publisher_id: &str,
        _action: AccessAction,
    ) -> Result<(), FluxionError> {
        self.is_admin(token).await
    }

    async fn is_admin(&self, token: &str) -> Result<(), FluxionError> {
        if token == OPERATOR_TOKEN {
            Ok(())
        } else {
            Err(FluxionError::Unauthenticated("unknown operator token".into()))
        }
    }

    async fn resolve_key(&self, _key: &str) -> Result<String, FluxionError> {
        Err(FluxionError::Unauthenticated(
            "thing keys are not accepted by the operator CLI".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn operator_token_is_admin() {
        let access = LocalOperator;
        assert!(access.is_admin(OPERATOR_TOKEN).await.is_ok());
        assert!(
            access
                .can_access_publisher(OPERATOR_TOKEN, "any", AccessAction::Delete)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn other_credentials_are_refused() {
        let access = LocalOperator;
        assert!(matches!(
            access.is_admin("guess").await,
            Err(FluxionError::Unauthenticated(_))
        ));
        assert!(access.resolve_key("key").await.is_err());
    }
}
