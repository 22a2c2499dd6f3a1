// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Fluxion integration tests.
//!
//! Provides mock collaborators and record fixtures for fast, deterministic
//! tests without external services.
//!
//! # Components
//!
//! - [`MockAccessControl`] - Access control with configurable admins, grants and thing keys
//! - [`RecordingPublisher`] - Publisher capturing every message, optionally failing
//! - [`FailingRunRepository`] - Script-run repository whose writes always fail
//! - [`fixtures`] - SenML and JSON record builders

pub mod fixtures;
pub mod mock_access;
pub mod mock_publisher;
pub mod mock_runs;

pub use mock_access::MockAccessControl;
pub use mock_publisher::RecordingPublisher;
pub use mock_runs::FailingRunRepository;
