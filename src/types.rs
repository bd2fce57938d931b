//! Core types for the imu-sync pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: parsed raw samples, the merged raw series, and the fixed-grid
//! resampled output consumed by plotting and labeling front-ends.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the recording app (`yyyy/MM/dd HH:mm:ss.SSS`)
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.f";

/// Display layout with exactly three fractional digits
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

/// Three-axis reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Linear blend towards `other`; `t = 0` returns `self` unchanged
    pub fn lerp(&self, other: &Vector3, t: f64) -> Vector3 {
        Vector3 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Absolute wall-clock instant of the reading (naive, device local time)
    pub time: NaiveDateTime,
    /// Acceleration in g
    pub accel: Vector3,
    /// Angular rate in deg/s
    pub gyro: Vector3,
}

/// Time-ordered raw samples with strictly increasing timestamps.
///
/// Construction sorts and collapses equal timestamps; the series is never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSeries {
    samples: Vec<RawSample>,
}

impl RawSeries {
    /// Build a series from samples in any order.
    ///
    /// The sort is stable, so for a repeated timestamp the sample encountered
    /// first in `samples` is the one kept.
    pub fn from_samples(mut samples: Vec<RawSample>) -> Self {
        samples.sort_by_key(|s| s.time);
        samples.dedup_by_key(|s| s.time);
        Self { samples }
    }

    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&RawSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&RawSample> {
        self.samples.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawSample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a RawSeries {
    type Item = &'a RawSample;
    type IntoIter = std::slice::Iter<'a, RawSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// One resampled output point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Milliseconds since the series start
    pub offset_ms: f64,
    pub accel: Vector3,
    pub gyro: Vector3,
    pub accel_mag: f64,
    pub gyro_mag: f64,
}

impl GridPoint {
    pub fn new(offset_ms: f64, accel: Vector3, gyro: Vector3) -> Self {
        Self {
            offset_ms,
            accel,
            gyro,
            accel_mag: accel.magnitude(),
            gyro_mag: gyro.magnitude(),
        }
    }
}

/// Fixed-interval series produced by the resampler.
///
/// Only the resampler builds one; callers get read access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResampledSeries {
    /// Absolute instant of offset 0 (`None` for an empty recording)
    start_time: Option<NaiveDateTime>,
    /// Grid rate the series was built at
    target_hz: u32,
    points: Vec<GridPoint>,
    /// Number of distinct raw samples
    raw_count: usize,
    /// Samples a gap-free recording of the same span would contain
    expected_count: usize,
}

impl ResampledSeries {
    pub(crate) fn new(
        start_time: NaiveDateTime,
        target_hz: u32,
        points: Vec<GridPoint>,
        raw_count: usize,
        expected_count: usize,
    ) -> Self {
        Self {
            start_time: Some(start_time),
            target_hz,
            points,
            raw_count,
            expected_count,
        }
    }

    /// Series for a recording without samples
    pub fn empty(target_hz: u32) -> Self {
        Self {
            start_time: None,
            target_hz,
            points: Vec::new(),
            raw_count: 0,
            expected_count: 0,
        }
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    pub fn target_hz(&self) -> u32 {
        self.target_hz
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fraction of expected samples absent from the raw input.
    ///
    /// Negative when the sensor delivered more samples than the nominal rate.
    pub fn missing_ratio(&self) -> f64 {
        if self.expected_count == 0 {
            return 0.0;
        }
        1.0 - (self.raw_count as f64 / self.expected_count as f64)
    }

    /// Offset of the last grid point
    pub fn duration_ms(&self) -> f64 {
        self.points.last().map(|p| p.offset_ms).unwrap_or(0.0)
    }

    /// Start instant rendered as `yyyy/MM/dd HH:mm:ss.SSS`
    pub fn start_timestamp_string(&self) -> Option<String> {
        self.start_time
            .map(|t| t.format(TIMESTAMP_DISPLAY_FORMAT).to_string())
    }

    /// Start instant as Unix milliseconds, treating the naive time as UTC
    pub fn start_unix_ms(&self) -> Option<f64> {
        self.start_time
            .map(|t| t.and_utc().timestamp_micros() as f64 / 1000.0)
    }

    /// Grid point closest to `offset_ms`; ties resolve to the earlier point
    pub fn nearest(&self, offset_ms: f64) -> Option<&GridPoint> {
        if offset_ms.is_nan() {
            return None;
        }
        let idx = self.points.partition_point(|p| p.offset_ms < offset_ms);
        match (idx.checked_sub(1).map(|i| &self.points[i]), self.points.get(idx)) {
            (Some(before), Some(after)) => {
                if offset_ms - before.offset_ms <= after.offset_ms - offset_ms {
                    Some(before)
                } else {
                    Some(after)
                }
            }
            (Some(before), None) => Some(before),
            (None, after) => after,
        }
    }

    /// Load statistics for display
    pub fn stats(&self) -> ResampleStats {
        ResampleStats {
            duration_ms: self.duration_ms(),
            total_samples: self.points.len(),
            expected_samples: self.expected_count,
            raw_samples: self.raw_count,
            missing_ratio: self.missing_ratio(),
        }
    }
}

/// Summary of a load, suitable for a status line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleStats {
    pub duration_ms: f64,
    pub total_samples: usize,
    pub expected_samples: usize,
    pub raw_samples: usize,
    pub missing_ratio: f64,
}

impl ResampleStats {
    /// Duration as `HH:MM:SS`, fractional seconds truncated
    pub fn duration_hms(&self) -> String {
        let total_secs = (self.duration_ms.max(0.0) / 1000.0).floor() as u64;
        format!(
            "{:02}:{:02}:{:02}",
            total_secs / 3600,
            (total_secs % 3600) / 60,
            total_secs % 60
        )
    }
}
