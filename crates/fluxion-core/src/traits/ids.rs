// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifier generation.

use crate::error::FluxionError;

pub trait IdProvider: Send + Sync {
    fn new_id(&self) -> Result<String, FluxionError>;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn new_id(&self) -> Result<String, FluxionError> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}
