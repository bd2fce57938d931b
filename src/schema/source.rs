//! Sample sources
//!
//! A source is one recording file after it has been decoded into rows.
//! Documents may be a JSON array of rows or NDJSON (one row per line).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SchemaError, SkipReason, ValidationError};
use crate::schema::sample_row::{SampleRow, REQUIRED_FIELDS};
use crate::types::RawSample;

/// A named collection of rows, typically one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSource {
    /// Label used in diagnostics (usually the file path)
    pub name: String,
    pub rows: Vec<SampleRow>,
}

impl SampleSource {
    pub fn new(name: impl Into<String>, rows: Vec<SampleRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Parse a JSON array of rows
    pub fn from_json_array(name: impl Into<String>, json: &str) -> Result<Self, SchemaError> {
        let rows: Vec<SampleRow> = serde_json::from_str(json)?;
        Ok(Self::new(name, rows))
    }

    /// Parse NDJSON (newline-delimited JSON) rows
    pub fn from_ndjson(name: impl Into<String>, ndjson: &str) -> Result<Self, SchemaError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SampleRow>(trimmed) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    return Err(SchemaError::Line {
                        line: line_num + 1,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(Self::new(name, rows))
    }

    /// First required column that no row carries, if any
    pub fn missing_column(&self) -> Option<&'static str> {
        if self.rows.is_empty() {
            return None;
        }
        REQUIRED_FIELDS.iter().copied().find(|field| {
            self.rows.iter().all(|row| !row.has_field(field))
        })
    }

    /// Convert the usable rows.
    ///
    /// The source is rejected when a required column is absent altogether or
    /// when no row survives. Rows with a blank value or an unreadable
    /// timestamp are dropped; the resampler interpolates across them.
    pub fn to_samples(&self) -> Result<Vec<RawSample>, SkipReason> {
        if let Some(field) = self.missing_column() {
            return Err(SkipReason::MissingFields {
                field: field.to_string(),
            });
        }

        let mut samples = Vec::with_capacity(self.rows.len());
        let mut incomplete = 0;
        let mut first_bad_time: Option<(String, usize)> = None;
        let mut bad_times = 0;

        for (idx, row) in self.rows.iter().enumerate() {
            match row.to_sample() {
                Ok(sample) => samples.push(sample),
                Err(ValidationError::MissingField(_)) => incomplete += 1,
                Err(ValidationError::InvalidTimestamp { value }) => {
                    bad_times += 1;
                    first_bad_time.get_or_insert((value, idx));
                }
            }
        }

        if samples.is_empty() && !self.rows.is_empty() {
            return Err(match first_bad_time {
                Some((value, row)) if incomplete == 0 => {
                    SkipReason::InvalidTimestamp { value, row }
                }
                _ => SkipReason::NoCompleteRows {
                    rows: self.rows.len(),
                },
            });
        }

        if incomplete + bad_times > 0 {
            debug!(
                source = %self.name,
                incomplete,
                bad_timestamps = bad_times,
                kept = samples.len(),
                "dropped unusable rows"
            );
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_timestamp;
    use crate::types::Vector3;
    use chrono::Duration;

    const ROW_A: &str = r#"{"timestamp":"2025/12/05 22:20:06.500","accelX":0.0,"accelY":0.0,"accelZ":1.0,"gyroX":0.0,"gyroY":0.0,"gyroZ":0.0}"#;
    const ROW_B: &str = r#"{"timestamp":"2025/12/05 22:20:06.520","accelX":0.0,"accelY":0.0,"accelZ":1.0,"gyroX":0.0,"gyroY":0.0,"gyroZ":0.0}"#;

    #[test]
    fn test_parse_ndjson() {
        let ndjson = format!("{ROW_A}\n\n{ROW_B}\n");
        let source = SampleSource::from_ndjson("a.ndjson", &ndjson).unwrap();
        assert_eq!(source.rows.len(), 2);
        assert_eq!(source.to_samples().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = format!("{ROW_A}\nnot json\n");
        let err = SampleSource::from_ndjson("a.ndjson", &ndjson).unwrap_err();
        assert!(matches!(err, SchemaError::Line { line: 2, .. }));
    }

    #[test]
    fn test_parse_array() {
        let json = format!("[{ROW_A},{ROW_B}]");
        let source = SampleSource::from_json_array("a.json", &json).unwrap();
        assert_eq!(source.name, "a.json");
        assert_eq!(source.rows.len(), 2);
    }

    fn rows(count: usize) -> Vec<SampleRow> {
        let base = parse_timestamp("2025/12/05 22:20:06.500").unwrap();
        (0..count)
            .map(|i| {
                SampleRow::new(
                    base + Duration::milliseconds(i as i64 * 20),
                    Vector3::new(0.0, 0.0, 1.0),
                    Vector3::new(i as f64, 0.0, 0.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_source_rejected_on_missing_column() {
        let mut rows = rows(3);
        for row in &mut rows {
            row.accel_y = None;
        }
        let source = SampleSource::new("b.json", rows);

        assert_eq!(source.missing_column(), Some("accelY"));
        assert_eq!(
            source.to_samples(),
            Err(SkipReason::MissingFields {
                field: "accelY".to_string(),
            })
        );
    }

    #[test]
    fn test_blank_cell_drops_only_its_row() {
        let mut rows = rows(51);
        rows[25].gyro_x = None;
        let source = SampleSource::new("ble.csv", rows);

        assert_eq!(source.missing_column(), None);
        let samples = source.to_samples().unwrap();
        assert_eq!(samples.len(), 50);
        assert!(samples.iter().all(|s| s.gyro.x != 25.0));
    }

    #[test]
    fn test_unreadable_timestamp_drops_row() {
        let mut rows = rows(4);
        rows[1].timestamp = Some("garbage".to_string());
        rows[2].timestamp = None;
        let source = SampleSource::new("a.csv", rows);

        let samples = source.to_samples().unwrap();
        let gyro: Vec<f64> = samples.iter().map(|s| s.gyro.x).collect();
        assert_eq!(gyro, vec![0.0, 3.0]);
    }

    #[test]
    fn test_no_usable_rows() {
        let mut bad_times = rows(2);
        for row in &mut bad_times {
            row.timestamp = Some("2025-12-05T22:20:06".to_string());
        }
        assert_eq!(
            SampleSource::new("a.csv", bad_times).to_samples(),
            Err(SkipReason::InvalidTimestamp {
                value: "2025-12-05T22:20:06".to_string(),
                row: 0,
            })
        );

        let mut patchy = rows(2);
        patchy[0].accel_x = None;
        patchy[1].gyro_z = None;
        assert_eq!(
            SampleSource::new("b.csv", patchy).to_samples(),
            Err(SkipReason::NoCompleteRows { rows: 2 })
        );
    }
}
