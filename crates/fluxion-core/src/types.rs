// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across traits and the Fluxion services.

use serde::{Deserialize, Serialize};

/// Health status reported by storage backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// A raw message as carried on the pub/sub bus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    #[serde(default)]
    pub subtopic: String,
    pub publisher: String,
    #[serde(default)]
    pub protocol: String,
    /// Encoded payload bytes (JSON for everything the rules engine emits).
    #[serde(default)]
    pub payload: Vec<u8>,
    /// Creation time in unix nanoseconds.
    #[serde(default)]
    pub created: i64,
}
