//! Error types for the resolver stages
//!
//! Every variant here is fatal: it aborts the run before anything is written.
//! Recoverable data-quality problems are logged and never surface as errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::table::EdgeKey;

#[derive(Debug, Error)]
pub enum Error {
    /// Two rows claim the same directed key on one side of the direction join
    #[error("duplicate directed edge {key} among {side} rows; input has malformed or duplicated edges")]
    DuplicateDirectedEdge { key: EdgeKey, side: &'static str },

    /// A join or merge introduced or dropped rows
    #[error("{table} row count drifted during {stage}: expected {expected}, found {actual}")]
    RowCountDrift {
        table: &'static str,
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A link still maps to several counties after the tie-break
    #[error("link {key} still carries {count} county rows after tie-break")]
    ResidualMultiRegion { key: EdgeKey, count: usize },

    /// Region reference file is absent
    #[error("region reference data not found at {}", .0.display())]
    MissingRegions(PathBuf),

    /// Region reference file is present but unusable
    #[error("region reference data at {} is invalid: {reason}", .path.display())]
    InvalidRegions { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
