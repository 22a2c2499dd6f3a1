// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fluxion query`: list stored messages as the operator.

use clap::{Args, ValueEnum};
use serde_json::Value;

use fluxion_core::{FluxionError, JsonPageMetadata, SenmlPageMetadata, SortDir};
use fluxion_readers::{Credentials, ReaderService};

use crate::operator::OPERATOR_TOKEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    Senml,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Message encoding to list.
    #[arg(value_enum)]
    pub encoding: Encoding,
    #[arg(long, default_value = "")]
    pub publisher: String,
    #[arg(long, default_value = "")]
    pub subtopic: String,
    /// Page size; 0 lists every match.
    #[arg(long, default_value_t = 10)]
    pub limit: u64,
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
    /// Oldest first instead of newest first.
    #[arg(long)]
    pub asc: bool,
}

impl QueryArgs {
    fn dir(&self) -> SortDir {
        if self.asc { SortDir::Asc } else { SortDir::Desc }
    }
}

/// Run the query and return the page encoded as JSON.
pub async fn run_query(service: &ReaderService, args: &QueryArgs) -> Result<Value, FluxionError> {
    let operator = Credentials::Token(OPERATOR_TOKEN.to_string());
    let encoded = match args.encoding {
        Encoding::Senml => {
            let query = SenmlPageMetadata {
                publisher: args.publisher.clone(),
                subtopic: args.subtopic.clone(),
                limit: args.limit,
                offset: args.offset,
                dir: args.dir(),
                ..Default::default()
            };
            serde_json::to_value(service.list_senml_messages(&operator, query).await?)
        }
        Encoding::Json => {
            let query = JsonPageMetadata {
                publisher: args.publisher.clone(),
                subtopic: args.subtopic.clone(),
                limit: args.limit,
                offset: args.offset,
                dir: args.dir(),
                ..Default::default()
            };
            serde_json::to_value(service.list_json_messages(&operator, query).await?)
        }
    };
    encoded.map_err(|e| FluxionError::Internal(format!("cannot encode page: {e}")))
}
