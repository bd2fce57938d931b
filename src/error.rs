//! Error types for imu-sync

use serde::Serialize;
use thiserror::Error;

/// Why a single source was left out of a load.
///
/// Skipping is recoverable: the remaining sources are still merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("required column `{field}` is absent from every row")]
    MissingFields { field: String },

    #[error("no row has a readable timestamp (first: {value:?}, row {row})")]
    InvalidTimestamp { value: String, row: usize },

    #[error("none of the {rows} rows has every required value")]
    NoCompleteRows { rows: usize },

    #[error("unreadable source: {message}")]
    Unreadable { message: String },
}

/// A source that was rejected during ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Fatal ingestion failures. No partial series is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("no sources were supplied")]
    NoSources,

    #[error("none of the {} supplied sources was valid", skipped.len())]
    NoValidSources { skipped: Vec<SkippedSource> },
}

/// Problems with a single input row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid timestamp {value:?}: expected yyyy/MM/dd HH:mm:ss.SSS")]
    InvalidTimestamp { value: String },
}

/// Errors raised while decoding a source document
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse line {line}: {message}")]
    Line { line: usize, message: String },
}

/// Errors raised by the bounded resampler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResampleError {
    #[error(
        "recording spans {seconds} s; at {target_hz} Hz that needs more than {limit} grid points (stray timestamp?)"
    )]
    GridTooLarge {
        seconds: i64,
        target_hz: u32,
        limit: usize,
    },
}

/// Errors raised by the time synchronization model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("scale factor is zero; the mapping cannot be inverted")]
    DegenerateScale,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("target_hz must be between 1 and {max}, got {value}")]
    InvalidTargetHz { value: u32, max: u32 },

    #[error("max_grid_points must be at least 1")]
    InvalidMaxGridPoints,
}

/// Errors surfaced by a full recording load
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Resample(#[from] ResampleError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
