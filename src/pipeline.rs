//! Pipeline orchestration
//!
//! This module provides the public entry points for imu-sync.
//! It runs decoded sources through ingestion and resampling, and pairs the
//! result with a sync model for cursor mapping against a video timeline.

use serde::Serialize;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{LoadError, SkippedSource, SyncError};
use crate::ingest::Ingestor;
use crate::resample::Resampler;
use crate::schema::SampleSource;
use crate::sync::{RecomputeOutcome, SyncModel};
use crate::types::{GridPoint, ResampleStats, ResampledSeries};

/// One loaded recording
#[derive(Debug, Clone, Serialize)]
pub struct Recording {
    /// Unique id for this load, also attached to its log span
    pub id: Uuid,
    pub series: ResampledSeries,
    pub stats: ResampleStats,
    pub accepted: Vec<String>,
    pub skipped: Vec<SkippedSource>,
}

/// Load a recording from decoded sources.
///
/// Pipeline stages:
/// 1. Config validation
/// 2. Ingestion - validate, merge, sort, deduplicate
/// 3. Resampler - fixed grid, interpolation, edge fill, statistics; refused
///    when the grid would exceed `config.max_grid_points`
///
/// # Example
/// ```ignore
/// let recording = load_recording(&sources, &PipelineConfig::default())?;
/// println!("{} points", recording.series.len());
/// ```
pub fn load_recording(
    sources: &[SampleSource],
    config: &PipelineConfig,
) -> Result<Recording, LoadError> {
    let mut ingestor = Ingestor::new();
    for source in sources {
        ingestor.add_source(source);
    }
    load_from_ingestor(ingestor, config)
}

/// Finish a load from an [`Ingestor`] the caller has already fed, e.g. when
/// some files could not be read and were marked unreadable.
pub fn load_from_ingestor(ingestor: Ingestor, config: &PipelineConfig) -> Result<Recording, LoadError> {
    config.validate()?;

    let id = Uuid::new_v4();
    let span = info_span!("load_recording", %id);
    let _guard = span.enter();

    let report = ingestor.finish()?;

    let series = Resampler::from_config(config).try_resample(&report.series)?;
    let stats = series.stats();

    info!(
        raw = stats.raw_samples,
        grid = stats.total_samples,
        missing_ratio = stats.missing_ratio,
        skipped = report.skipped.len(),
        "recording loaded"
    );

    Ok(Recording {
        id,
        series,
        stats,
        accepted: report.accepted,
        skipped: report.skipped,
    })
}

/// Load a recording from a JSON array of sources
/// (`[{"name": ..., "rows": [...]}, ...]`) and return it as JSON.
pub fn load_recording_json(sources_json: &str, config: &PipelineConfig) -> Result<String, LoadError> {
    let sources: Vec<SampleSource> = serde_json::from_str(sources_json)?;
    let recording = load_recording(&sources, config)?;
    Ok(serde_json::to_string(&recording)?)
}

/// A recording paired with its sync model.
///
/// Use this when a labeling front-end moves cursors on both timelines and
/// needs them kept aligned.
pub struct RecordingSession {
    recording: Recording,
    sync: SyncModel,
}

impl RecordingSession {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            sync: SyncModel::new(),
        }
    }

    /// Resume with a previously saved sync model
    pub fn with_sync(recording: Recording, sync: SyncModel) -> Self {
        Self { recording, sync }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn sync(&self) -> &SyncModel {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut SyncModel {
        &mut self.sync
    }

    /// Anchor the sensor cursor at `local_ms` to the video position `foreign_ms`
    pub fn anchor_start(&mut self, local_ms: f64, foreign_ms: f64) -> RecomputeOutcome {
        self.sync.set_start_anchor(local_ms, foreign_ms)
    }

    pub fn anchor_end(&mut self, local_ms: f64, foreign_ms: f64) -> RecomputeOutcome {
        self.sync.set_end_anchor(local_ms, foreign_ms)
    }

    /// Video position matching a sensor offset
    pub fn foreign_position(&self, local_ms: f64) -> f64 {
        self.sync.to_foreign(local_ms)
    }

    /// Grid point under the sensor cursor for a video position
    pub fn point_at_foreign(&self, foreign_ms: f64) -> Result<Option<&GridPoint>, SyncError> {
        let local_ms = self.sync.to_local(foreign_ms)?;
        Ok(self.recording.series.nearest(local_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IngestError, ResampleError};
    use crate::schema::{parse_timestamp, SampleRow};
    use crate::types::Vector3;
    use chrono::Duration;

    fn source(name: &str, offsets_ms: &[i64]) -> SampleSource {
        let base = parse_timestamp("2025/12/05 22:20:06.510").unwrap();
        let rows = offsets_ms
            .iter()
            .map(|&ms| {
                SampleRow::new(
                    base + Duration::milliseconds(ms),
                    Vector3::new(0.0, 0.0, 1.0),
                    Vector3::new(ms as f64, 0.0, 0.0),
                )
            })
            .collect();
        SampleSource::new(name, rows)
    }

    #[test]
    fn test_load_recording() {
        let sources = vec![source("a.csv", &[0, 500]), source("b.csv", &[500, 1000])];
        let recording = load_recording(&sources, &PipelineConfig::default()).unwrap();

        assert_eq!(recording.series.len(), 51);
        assert_eq!(recording.stats.raw_samples, 3);
        assert_eq!(recording.stats.expected_samples, 51);
        assert_eq!(recording.accepted.len(), 2);
        assert!(recording.skipped.is_empty());
        assert_eq!(
            recording.series.start_timestamp_string().as_deref(),
            Some("2025/12/05 22:20:06.510")
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let sources = vec![source("a.csv", &[0, 20])];
        let result = load_recording(&sources, &PipelineConfig::with_target_hz(0));
        assert!(matches!(result, Err(LoadError::Config(_))));
    }

    #[test]
    fn test_stray_date_refused() {
        let mut stray = source("stray.csv", &[0, 20, 40]);
        stray.rows.push(SampleRow::new(
            parse_timestamp("1970/01/01 00:00:00.000").unwrap(),
            Vector3::default(),
            Vector3::default(),
        ));

        let result = load_recording(&[stray], &PipelineConfig::default());
        assert!(matches!(
            result,
            Err(LoadError::Resample(ResampleError::GridTooLarge { target_hz: 50, .. }))
        ));
    }

    #[test]
    fn test_no_sources() {
        let result = load_recording(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(LoadError::Ingest(IngestError::NoSources))));
    }

    #[test]
    fn test_load_recording_json() {
        let sources = vec![source("a.csv", &[0, 40, 80])];
        let json = serde_json::to_string(&sources).unwrap();

        let out = load_recording_json(&json, &PipelineConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["stats"]["total_samples"], 5);
        assert_eq!(value["series"]["points"][2]["offset_ms"], 40.0);
        assert_eq!(value["series"]["points"][1]["gyro"]["x"], 20.0);
    }

    #[test]
    fn test_load_recording_json_invalid() {
        let result = load_recording_json("not json", &PipelineConfig::default());
        assert!(matches!(result, Err(LoadError::Json(_))));
    }

    #[test]
    fn test_session_cursor_mapping() {
        let sources = vec![source("a.csv", &[0, 1000])];
        let recording = load_recording(&sources, &PipelineConfig::default()).unwrap();
        let mut session = RecordingSession::new(recording);

        // sensor time 0 appears at 2 s into the video
        session.anchor_start(0.0, 2000.0);
        assert_eq!(session.foreign_position(100.0), 2100.0);

        let point = session.point_at_foreign(2405.0).unwrap().unwrap();
        assert_eq!(point.offset_ms, 400.0);

        session.sync_mut().set_params(0.0, 0.0);
        assert_eq!(
            session.point_at_foreign(0.0),
            Err(SyncError::DegenerateScale)
        );
    }
}
