//! imu-sync - IMU recording resampling and video clock alignment
//!
//! imu-sync turns irregularly sampled accelerometer/gyroscope recordings into
//! a fixed-interval series through a deterministic pipeline:
//! source validation → merge/sort/deduplicate → fixed-grid resampling →
//! magnitude channels and load statistics.
//!
//! A separate [`SyncModel`] aligns the resulting sensor timeline with an
//! independent one (typically video playback) using up to two anchors.
//!
//! ## Modules
//!
//! - **Ingestion**: merges decoded sources into a [`RawSeries`]
//! - **Resampling**: builds a [`ResampledSeries`] on a uniform grid
//! - **Synchronization**: maps between two timelines

pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod resample;
pub mod schema;
pub mod sync;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::PipelineConfig;
pub use error::{IngestError, LoadError, ResampleError, SkipReason, SkippedSource, SyncError};
pub use ingest::{ingest, ingest_with_report, IngestReport, Ingestor};
pub use pipeline::{
    load_from_ingestor, load_recording, load_recording_json, Recording, RecordingSession,
};
pub use resample::{resample, Resampler};
pub use schema::{SampleRow, SampleSource};
pub use sync::{AnchorState, RecomputeOutcome, SyncModel, SyncParams, TimeAnchor};
pub use types::{GridPoint, RawSample, RawSeries, ResampleStats, ResampledSeries, Vector3};

/// Library version
pub const IMU_SYNC_VERSION: &str = env!("CARGO_PKG_VERSION");
