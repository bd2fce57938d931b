//! Sample ingestion
//!
//! Validates decoded sources, merges the usable ones, and produces a single
//! time-ordered [`RawSeries`] with duplicate timestamps collapsed.
//! A malformed source is skipped with a warning; the load only fails when
//! nothing usable remains.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{IngestError, SkipReason, SkippedSource};
use crate::schema::SampleSource;
use crate::types::{RawSample, RawSeries};

/// Merged series plus the sources that were left out
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub series: RawSeries,
    pub accepted: Vec<String>,
    pub skipped: Vec<SkippedSource>,
}

/// Incremental merger for one load attempt.
///
/// Sources are added in encounter order; that order decides which sample
/// survives when two sources share a timestamp.
#[derive(Debug, Default)]
pub struct Ingestor {
    samples: Vec<RawSample>,
    accepted: Vec<String>,
    skipped: Vec<SkippedSource>,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and merge one source. Returns `false` if it was skipped.
    pub fn add_source(&mut self, source: &SampleSource) -> bool {
        match source.to_samples() {
            Ok(samples) => {
                debug!(source = %source.name, rows = samples.len(), "source accepted");
                self.samples.extend(samples);
                self.accepted.push(source.name.clone());
                true
            }
            Err(reason) => {
                self.skip(&source.name, reason);
                false
            }
        }
    }

    /// Record a source the caller could not read or decode
    pub fn mark_unreadable(&mut self, name: impl Into<String>, message: impl Into<String>) {
        let name = name.into();
        self.skip(
            &name,
            SkipReason::Unreadable {
                message: message.into(),
            },
        );
    }

    fn skip(&mut self, name: &str, reason: SkipReason) {
        warn!(source = %name, %reason, "skipping source");
        self.skipped.push(SkippedSource {
            name: name.to_string(),
            reason,
        });
    }

    pub fn skipped(&self) -> &[SkippedSource] {
        &self.skipped
    }

    /// Sort, deduplicate, and seal the merged samples
    pub fn finish(self) -> Result<IngestReport, IngestError> {
        if self.accepted.is_empty() {
            if self.skipped.is_empty() {
                return Err(IngestError::NoSources);
            }
            return Err(IngestError::NoValidSources {
                skipped: self.skipped,
            });
        }

        let merged = self.samples.len();
        let series = RawSeries::from_samples(self.samples);
        if series.len() < merged {
            debug!(
                merged,
                distinct = series.len(),
                "collapsed duplicate timestamps"
            );
        }

        Ok(IngestReport {
            series,
            accepted: self.accepted,
            skipped: self.skipped,
        })
    }
}

/// Merge `sources` into a single raw series.
///
/// Fails with [`IngestError::NoSources`] for an empty list and
/// [`IngestError::NoValidSources`] when every source was skipped.
pub fn ingest(sources: &[SampleSource]) -> Result<RawSeries, IngestError> {
    ingest_with_report(sources).map(|report| report.series)
}

/// Like [`ingest`], but keeps the per-source outcome for display
pub fn ingest_with_report(sources: &[SampleSource]) -> Result<IngestReport, IngestError> {
    let mut ingestor = Ingestor::new();
    for source in sources {
        ingestor.add_source(source);
    }
    ingestor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{parse_timestamp, SampleRow};
    use crate::types::Vector3;

    fn row(ts: &str, z: f64) -> SampleRow {
        SampleRow::new(
            parse_timestamp(ts).unwrap(),
            Vector3::new(0.0, 0.0, z),
            Vector3::default(),
        )
    }

    #[test]
    fn test_empty_input_fails() {
        assert_eq!(ingest(&[]), Err(IngestError::NoSources));
    }

    #[test]
    fn test_all_sources_invalid() {
        let mut bad = row("2025/12/05 22:20:06.500", 1.0);
        bad.gyro_z = None;
        let sources = vec![
            SampleSource::new("a.csv", vec![bad.clone()]),
            SampleSource::new("b.csv", vec![bad]),
        ];

        match ingest(&sources) {
            Err(IngestError::NoValidSources { skipped }) => {
                assert_eq!(skipped.len(), 2);
                assert_eq!(skipped[0].name, "a.csv");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_source_skipped_not_fatal() {
        let mut bad = row("2025/12/05 22:20:06.500", 1.0);
        bad.accel_x = None;
        let sources = vec![
            SampleSource::new("good.csv", vec![row("2025/12/05 22:20:06.500", 1.0)]),
            SampleSource::new("bad.csv", vec![bad]),
        ];

        let report = ingest_with_report(&sources).unwrap();
        assert_eq!(report.series.len(), 1);
        assert_eq!(report.accepted, vec!["good.csv".to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::MissingFields { .. }
        ));
    }

    #[test]
    fn test_blank_cell_does_not_reject_source() {
        let base = parse_timestamp("2025/12/05 22:20:06.500").unwrap();
        let mut rows: Vec<SampleRow> = (0..51)
            .map(|i| {
                SampleRow::new(
                    base + chrono::Duration::milliseconds(i * 20),
                    Vector3::new(0.0, 0.0, 1.0),
                    Vector3::default(),
                )
            })
            .collect();
        rows[25].gyro_x = None;

        let report = ingest_with_report(&[SampleSource::new("ble.csv", rows)]).unwrap();
        assert_eq!(report.series.len(), 50);
        assert_eq!(report.accepted, vec!["ble.csv".to_string()]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_duplicate_timestamps_collapse_across_sources() {
        let sources = vec![
            SampleSource::new(
                "first.csv",
                vec![
                    row("2025/12/05 22:20:06.540", 3.0),
                    row("2025/12/05 22:20:06.500", 1.0),
                ],
            ),
            SampleSource::new(
                "second.csv",
                vec![
                    row("2025/12/05 22:20:06.500", 9.0),
                    row("2025/12/05 22:20:06.520", 2.0),
                ],
            ),
        ];

        let series = ingest(&sources).unwrap();
        let zs: Vec<f64> = series.iter().map(|s| s.accel.z).collect();
        // first-encountered row wins for the shared .500 instant
        assert_eq!(zs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_unreadable_source_counts_as_skipped() {
        let mut ingestor = Ingestor::new();
        ingestor.mark_unreadable("broken.csv", "permission denied");

        assert_eq!(ingestor.skipped().len(), 1);
        assert!(matches!(
            ingestor.finish(),
            Err(IngestError::NoValidSources { .. })
        ));
    }

    #[test]
    fn test_empty_valid_source_yields_empty_series() {
        let series = ingest(&[SampleSource::new("empty.csv", Vec::new())]).unwrap();
        assert!(series.is_empty());
    }
}
