// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-series message readers for the Fluxion IoT platform.
//!
//! A validated page-metadata query is flattened into backend-neutral
//! [`filter::Condition`]s, which each backend translates natively:
//!
//! - [`backends::sqlite`]: `WHERE` clauses with named parameters, SQL aggregation;
//! - [`backends::docstore`]: filter documents evaluated over redb-stored JSON;
//! - [`backends::memory`]: predicates under a single mutex.
//!
//! [`service::ReaderService`] puts authorization in front of the repositories
//! and composes backup, restore and bounded concurrent search.

pub mod aggregate;
pub mod backends;
pub mod filter;
pub mod service;

pub use backends::{
    DocStore, MemoryStore, Repositories, SqliteStore, open_repositories,
};
pub use filter::{Condition, Field, Op, Operand, json_conditions, senml_conditions};
pub use service::{BackupArchive, Credentials, ReaderService, SearchResults, SearchStatus};
