// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for repositories and external collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod access;
pub mod ids;
pub mod publisher;
pub mod repository;
pub mod scripts;

pub use access::{AccessAction, AccessControl};
pub use ids::{IdProvider, UuidProvider};
pub use publisher::Publisher;
pub use repository::{JsonRepository, SenmlRepository};
pub use scripts::{RuleRepository, ScriptRepository, ScriptRunRepository};
