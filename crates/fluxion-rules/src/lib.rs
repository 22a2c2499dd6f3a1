// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rules engine for the Fluxion IoT platform.
//!
//! Inbound messages are split into payload objects ([`dispatch`]) and fed
//! to tenant Lua scripts running in an isolated, instruction-bounded
//! [`sandbox`], and to declarative threshold [`rule`]s. Scripts, their
//! runs and rules persist in a SQLite [`store`].

pub mod dispatch;
pub mod host;
mod migrations;
pub mod rule;
pub mod sandbox;
pub mod store;

pub use dispatch::{Dispatcher, sub_payloads};
pub use host::{HOST_TABLE, INVOCATION_LIMIT_EXCEEDED, LOG_LIMIT_EXCEEDED};
pub use rule::RuleEngine;
pub use sandbox::{Execution, INSTRUCTION_LIMIT_EXCEEDED, LuaEnv, Sandbox};
pub use store::{MemoryRunStore, RulesStore};
