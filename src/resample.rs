//! Fixed-grid resampling
//!
//! Turns an irregularly sampled [`RawSeries`] into a uniform grid:
//! 1. Grid instants every `1000 / target_hz` ms from the first raw sample,
//!    never past the last one
//! 2. Interpolation domain = raw instants ∪ grid instants
//! 3. Time-weighted linear interpolation inside raw coverage (no extrapolation)
//! 4. Projection back onto the grid instants
//! 5. Forward-fill then backward-fill of any point still missing
//! 6. Magnitude channels and load statistics
//!
//! The input is never modified; every call returns a fresh series.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::config::{grid_interval, PipelineConfig};
use crate::error::ResampleError;
use crate::types::{GridPoint, RawSeries, ResampledSeries, Vector3};

const NANOS_PER_MS: f64 = 1_000_000.0;
const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Resampler bound to a grid rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    target_hz: u32,
    max_points: usize,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl Resampler {
    /// A rate of zero is treated as 1 Hz. No grid size limit.
    pub fn new(target_hz: u32) -> Self {
        if target_hz == 0 {
            warn!("target rate of 0 Hz, using 1 Hz");
        }
        Self {
            target_hz: target_hz.max(1),
            max_points: usize::MAX,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.target_hz).with_max_points(config.max_grid_points)
    }

    /// Cap the grid size enforced by [`Resampler::try_resample`]
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn target_hz(&self) -> u32 {
        self.target_hz
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    fn step_nanos(&self) -> i64 {
        grid_interval(self.target_hz)
            .num_nanoseconds()
            .unwrap_or(i64::MAX)
            .max(1)
    }

    /// Like [`Resampler::resample`], but refuses a series whose grid would
    /// exceed the size limit. A single row with a wrong date is enough to
    /// stretch a recording over decades.
    pub fn try_resample(&self, series: &RawSeries) -> Result<ResampledSeries, ResampleError> {
        if let (Some(first), Some(last)) = (series.first(), series.last()) {
            let span = last.time - first.time;
            let points = span
                .num_nanoseconds()
                .map(|nanos| i128::from(nanos / self.step_nanos()) + 1);
            let fits = points.is_some_and(|p| p <= self.max_points as i128);

            if !fits {
                warn!(
                    span_s = span.num_seconds(),
                    target_hz = self.target_hz,
                    limit = self.max_points,
                    "grid too large"
                );
                return Err(ResampleError::GridTooLarge {
                    seconds: span.num_seconds(),
                    target_hz: self.target_hz,
                    limit: self.max_points,
                });
            }
        }

        Ok(self.resample(series))
    }

    /// Resample `series` onto this resampler's grid. The grid size is not
    /// checked; use [`Resampler::try_resample`] for untrusted input.
    pub fn resample(&self, series: &RawSeries) -> ResampledSeries {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return ResampledSeries::empty(self.target_hz);
        };

        let start = first.time;
        let span = nanos_between(start, last.time);

        if span == 0 {
            return ResampledSeries::new(
                start,
                self.target_hz,
                vec![GridPoint::new(0.0, first.accel, first.gyro)],
                series.len(),
                1,
            );
        }

        let step = self.step_nanos();
        let grid: Vec<i64> = (0..=span / step).map(|k| k * step).collect();

        let raw: Vec<(i64, Channels)> = series
            .iter()
            .map(|s| {
                (
                    nanos_between(start, s.time),
                    Channels {
                        accel: s.accel,
                        gyro: s.gyro,
                    },
                )
            })
            .collect();

        let mut domain = build_domain(&raw, &grid);
        interpolate_domain(&mut domain);

        let (offsets, mut values): (Vec<i64>, Vec<Option<Channels>>) = domain
            .into_iter()
            .filter(|p| p.on_grid)
            .map(|p| (p.at, p.value))
            .unzip();

        let gaps = edge_fill(&mut values);
        if gaps > 0 {
            debug!(gaps, "edge-filled grid points outside raw coverage");
        }

        let points: Vec<GridPoint> = offsets
            .into_iter()
            .zip(values)
            .filter_map(|(at, value)| {
                value.map(|c| GridPoint::new(at as f64 / NANOS_PER_MS, c.accel, c.gyro))
            })
            .collect();

        let expected_count = expected_count(span, self.target_hz);

        debug!(
            raw = series.len(),
            grid = points.len(),
            expected = expected_count,
            "resampled series"
        );

        ResampledSeries::new(start, self.target_hz, points, series.len(), expected_count)
    }
}

/// Resample `series` at `target_hz` (see [`Resampler`])
pub fn resample(series: &RawSeries, target_hz: u32) -> ResampledSeries {
    Resampler::new(target_hz).resample(series)
}

/// `floor(span_seconds * target_hz) + 1`, in integer nanoseconds
fn expected_count(span_nanos: i64, target_hz: u32) -> usize {
    (i128::from(span_nanos) * i128::from(target_hz) / NANOS_PER_SEC) as usize + 1
}

/// The six numeric channels of one instant
#[derive(Debug, Clone, Copy, PartialEq)]
struct Channels {
    accel: Vector3,
    gyro: Vector3,
}

impl Channels {
    fn lerp(&self, other: &Channels, t: f64) -> Channels {
        Channels {
            accel: self.accel.lerp(&other.accel, t),
            gyro: self.gyro.lerp(&other.gyro, t),
        }
    }
}

/// One instant of the interpolation domain
#[derive(Debug, Clone, Copy)]
struct DomainPoint {
    /// Nanoseconds since the series start
    at: i64,
    value: Option<Channels>,
    on_grid: bool,
}

fn nanos_between(start: NaiveDateTime, t: NaiveDateTime) -> i64 {
    (t - start).num_nanoseconds().unwrap_or(i64::MAX)
}

/// Sorted union of raw and grid instants. A grid instant that coincides with
/// a raw sample takes the raw value directly.
fn build_domain(raw: &[(i64, Channels)], grid: &[i64]) -> Vec<DomainPoint> {
    let mut domain = Vec::with_capacity(raw.len() + grid.len());
    let (mut i, mut j) = (0, 0);

    while i < raw.len() || j < grid.len() {
        match (raw.get(i), grid.get(j)) {
            (Some(&(at, value)), Some(&g)) if at == g => {
                domain.push(DomainPoint {
                    at,
                    value: Some(value),
                    on_grid: true,
                });
                i += 1;
                j += 1;
            }
            (Some(&(at, value)), Some(&g)) if at < g => {
                domain.push(DomainPoint {
                    at,
                    value: Some(value),
                    on_grid: false,
                });
                i += 1;
            }
            (Some(&(at, value)), None) => {
                domain.push(DomainPoint {
                    at,
                    value: Some(value),
                    on_grid: false,
                });
                i += 1;
            }
            (_, Some(&g)) => {
                domain.push(DomainPoint {
                    at: g,
                    value: None,
                    on_grid: true,
                });
                j += 1;
            }
            (None, None) => break,
        }
    }

    domain
}

/// Fill every empty point lying strictly between two valued points,
/// weighting by elapsed time. Points before the first or after the last
/// valued point stay empty.
fn interpolate_domain(domain: &mut [DomainPoint]) {
    let known: Vec<usize> = domain
        .iter()
        .enumerate()
        .filter(|(_, p)| p.value.is_some())
        .map(|(idx, _)| idx)
        .collect();

    for pair in known.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo < 2 {
            continue;
        }
        let (t0, t1) = (domain[lo].at, domain[hi].at);
        let (Some(v0), Some(v1)) = (domain[lo].value, domain[hi].value) else {
            continue;
        };
        let width = (t1 - t0) as f64;

        for point in &mut domain[lo + 1..hi] {
            let weight = (point.at - t0) as f64 / width;
            point.value = Some(v0.lerp(&v1, weight));
        }
    }
}

/// Forward-fill then backward-fill. Returns how many slots were filled.
fn edge_fill<T: Copy>(values: &mut [Option<T>]) -> usize {
    let mut filled = 0;

    let mut carry = None;
    for slot in values.iter_mut() {
        if slot.is_some() {
            carry = *slot;
        } else if carry.is_some() {
            *slot = carry;
            filled += 1;
        }
    }

    let mut carry = None;
    for slot in values.iter_mut().rev() {
        if slot.is_some() {
            carry = *slot;
        } else if carry.is_some() {
            *slot = carry;
            filled += 1;
        }
    }

    filled
}
