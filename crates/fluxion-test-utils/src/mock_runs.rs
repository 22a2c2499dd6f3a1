// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Script-run repository that rejects every write.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use fluxion_core::{FluxionError, ScriptRun, ScriptRunRepository, StorageOp};

#[derive(Debug, Clone, Default)]
pub struct FailingRunRepository {
    attempts: Arc<AtomicUsize>,
}

impl FailingRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_run` calls received.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptRunRepository for FailingRunRepository {
    async fn save_run(&self, _run: &ScriptRun) -> Result<(), FluxionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(FluxionError::storage(StorageOp::Save, "database is read-only"))
    }

    async fn retrieve_run(&self, id: &str) -> Result<ScriptRun, FluxionError> {
        Err(FluxionError::NotFound(format!("script run {id}")))
    }

    async fn list_runs_by_script(
        &self,
        _script_id: &str,
        _offset: u64,
        _limit: u64,
    ) -> Result<Vec<ScriptRun>, FluxionError> {
        Ok(Vec::new())
    }
}
