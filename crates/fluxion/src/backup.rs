// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fluxion backup` and `fluxion restore` command implementation.
//!
//! A backup is one JSON document holding every stored message of both
//! encodings: `{ "json": [...], "senml": [...] }`. It is written to a
//! temporary file next to the target and renamed into place, so an
//! interrupted backup never leaves a truncated archive behind.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use fluxion_core::FluxionError;
use fluxion_readers::{BackupArchive, ReaderService};

use crate::operator::OPERATOR_TOKEN;

/// Dump both repositories to `output`. Returns the archive that was written.
pub async fn run_backup(service: &ReaderService, output: &Path) -> Result<BackupArchive, FluxionError> {
    let archive = service.backup(OPERATOR_TOKEN).await?;
    write_archive(&archive, output)?;
    info!(
        path = %output.display(),
        json = archive.json.len(),
        senml = archive.senml.len(),
        "backup written"
    );
    Ok(archive)
}

/// Load the archive at `input` and restore it into both repositories.
pub async fn run_restore(service: &ReaderService, input: &Path) -> Result<BackupArchive, FluxionError> {
    let archive = read_archive(input)?;
    service.restore(OPERATOR_TOKEN, archive.clone()).await?;
    info!(path = %input.display(), "backup restored");
    Ok(archive)
}

fn write_archive(archive: &BackupArchive, output: &Path) -> Result<(), FluxionError> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        FluxionError::Internal(format!("cannot create file in {}: {e}", dir.display()))
    })?;
    let mut writer = BufWriter::new(tmp.as_file());
    serde_json::to_writer_pretty(&mut writer, archive)
        .map_err(|e| FluxionError::Internal(format!("cannot encode backup: {e}")))?;
    writer
        .flush()
        .map_err(|e| FluxionError::Internal(format!("cannot write backup: {e}")))?;
    drop(writer);
    tmp.persist(output).map_err(|e| {
        FluxionError::Internal(format!("cannot write {}: {}", output.display(), e.error))
    })?;
    Ok(())
}

fn read_archive(input: &Path) -> Result<BackupArchive, FluxionError> {
    let file = File::open(input)
        .map_err(|e| FluxionError::NotFound(format!("backup file {}: {e}", input.display())))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        FluxionError::Validation(format!("{} is not a backup archive: {e}", input.display()))
    })
}
