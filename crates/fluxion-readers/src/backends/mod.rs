// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interchangeable repository backends.

pub mod docstore;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use tracing::info;

use fluxion_config::{ReaderBackend, StorageConfig};
use fluxion_core::{FluxionError, JsonRepository, SenmlRepository};

pub use docstore::{DocJsonRepository, DocSenmlRepository, DocStore};
pub use memory::{MemoryJsonRepository, MemorySenmlRepository, MemoryStore};
pub use sqlite::{SqliteJsonRepository, SqliteSenmlRepository, SqliteStore};

/// The SenML and JSON repositories of one backend.
#[derive(Clone)]
pub struct Repositories {
    pub senml: Arc<dyn SenmlRepository>,
    pub json: Arc<dyn JsonRepository>,
}

/// Open the backend selected in the storage configuration.
pub async fn open_repositories(config: &StorageConfig) -> Result<Repositories, FluxionError> {
    let repos = match config.backend {
        ReaderBackend::Sqlite => {
            let store = SqliteStore::open(&config.database_path).await?;
            Repositories {
                senml: Arc::new(store.senml()),
                json: Arc::new(store.json()),
            }
        }
        ReaderBackend::Docstore => {
            let store = DocStore::open(&config.docstore_path)?;
            Repositories {
                senml: Arc::new(store.senml()),
                json: Arc::new(store.json()),
            }
        }
        ReaderBackend::Memory => {
            let store = MemoryStore::new();
            Repositories {
                senml: Arc::new(store.senml()),
                json: Arc::new(store.json()),
            }
        }
    };
    info!(backend = %config.backend, "message repositories ready");
    Ok(repos)
}
