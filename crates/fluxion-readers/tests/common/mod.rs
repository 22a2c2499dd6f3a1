// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fresh instances of every backend for conformance tests.

use std::sync::Arc;

use tempfile::TempDir;

use fluxion_readers::{DocStore, MemoryStore, Repositories, SqliteStore};

pub struct Backend {
    pub name: &'static str,
    pub repos: Repositories,
    _dir: Option<TempDir>,
}

pub async fn all_backends() -> Vec<Backend> {
    let sqlite_dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteStore::open(sqlite_dir.path().join("messages.db").to_str().unwrap())
        .await
        .unwrap();

    let doc_dir = tempfile::tempdir().unwrap();
    let doc = DocStore::open(doc_dir.path().join("messages.redb")).unwrap();

    let memory = MemoryStore::new();

    vec![
        Backend {
            name: "sqlite",
            repos: Repositories {
                senml: Arc::new(sqlite.senml()),
                json: Arc::new(sqlite.json()),
            },
            _dir: Some(sqlite_dir),
        },
        Backend {
            name: "docstore",
            repos: Repositories {
                senml: Arc::new(doc.senml()),
                json: Arc::new(doc.json()),
            },
            _dir: Some(doc_dir),
        },
        Backend {
            name: "memory",
            repos: Repositories {
                senml: Arc::new(memory.senml()),
                json: Arc::new(memory.json()),
            },
            _dir: None,
        },
    ]
}
