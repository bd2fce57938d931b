//! Anchor-based clock synchronization
//!
//! Maps a local timeline (sensor-relative milliseconds) onto a foreign one
//! (e.g. video playback milliseconds) with a single affine correction:
//!
//! ```text
//! foreign = local * scale + offset
//! ```
//!
//! Two anchors fix both parameters; a single anchor fixes only the offset.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SyncError;

/// A correspondence between one instant on each timeline (both in ms)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeAnchor {
    pub local_ms: f64,
    pub foreign_ms: f64,
}

impl TimeAnchor {
    pub const fn new(local_ms: f64, foreign_ms: f64) -> Self {
        Self {
            local_ms,
            foreign_ms,
        }
    }
}

/// Which anchors are currently set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorState {
    NoAnchor,
    StartOnly,
    EndOnly,
    DualAnchor,
}

/// Result of recomputing the mapping after an anchor change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeOutcome {
    /// Parameters were derived from the current anchors
    Updated,
    /// Both anchors share a local time; parameters were left as they were
    CoincidentAnchors,
}

impl RecomputeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RecomputeOutcome::Updated)
    }
}

/// Current affine parameters, for display or persistence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncParams {
    pub offset_ms: f64,
    pub scale_factor: f64,
}

impl Default for SyncParams {
    fn default() -> Self {
        Self {
            offset_ms: 0.0,
            scale_factor: 1.0,
        }
    }
}

/// Affine mapping between two timelines, calibrated by up to two anchors.
///
/// The model has a single owner; wrap it in a lock if several threads need it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncModel {
    params: SyncParams,
    anchor_start: Option<TimeAnchor>,
    anchor_end: Option<TimeAnchor>,
}

impl SyncModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_ms(&self) -> f64 {
        self.params.offset_ms
    }

    pub fn scale(&self) -> f64 {
        self.params.scale_factor
    }

    pub fn params(&self) -> SyncParams {
        self.params
    }

    pub fn anchor_start(&self) -> Option<TimeAnchor> {
        self.anchor_start
    }

    pub fn anchor_end(&self) -> Option<TimeAnchor> {
        self.anchor_end
    }

    pub fn state(&self) -> AnchorState {
        match (self.anchor_start, self.anchor_end) {
            (None, None) => AnchorState::NoAnchor,
            (Some(_), None) => AnchorState::StartOnly,
            (None, Some(_)) => AnchorState::EndOnly,
            (Some(_), Some(_)) => AnchorState::DualAnchor,
        }
    }

    /// Store the start anchor and recompute
    pub fn set_start_anchor(&mut self, local_ms: f64, foreign_ms: f64) -> RecomputeOutcome {
        self.anchor_start = Some(TimeAnchor::new(local_ms, foreign_ms));
        self.recompute()
    }

    /// Store the end anchor and recompute
    pub fn set_end_anchor(&mut self, local_ms: f64, foreign_ms: f64) -> RecomputeOutcome {
        self.anchor_end = Some(TimeAnchor::new(local_ms, foreign_ms));
        self.recompute()
    }

    /// Clear both anchors and restore the identity mapping
    pub fn reset(&mut self) {
        self.params = SyncParams::default();
        self.anchor_start = None;
        self.anchor_end = None;
        debug!("sync model reset");
    }

    /// Override the parameters directly. Anchors are kept but no longer
    /// describe the mapping until one of them is set again.
    pub fn set_params(&mut self, offset_ms: f64, scale_factor: f64) {
        self.params = SyncParams {
            offset_ms,
            scale_factor,
        };
    }

    /// Local time to foreign time. Always defined.
    pub fn to_foreign(&self, local_ms: f64) -> f64 {
        local_ms * self.params.scale_factor + self.params.offset_ms
    }

    /// Foreign time to local time; fails when the scale is zero
    pub fn to_local(&self, foreign_ms: f64) -> Result<f64, SyncError> {
        if self.params.scale_factor == 0.0 {
            return Err(SyncError::DegenerateScale);
        }
        Ok((foreign_ms - self.params.offset_ms) / self.params.scale_factor)
    }

    fn recompute(&mut self) -> RecomputeOutcome {
        match (self.anchor_start, self.anchor_end) {
            (Some(start), Some(end)) => {
                let local_span = end.local_ms - start.local_ms;
                if local_span == 0.0 {
                    warn!(
                        local_ms = start.local_ms,
                        "start and end anchors share a local time; mapping unchanged"
                    );
                    return RecomputeOutcome::CoincidentAnchors;
                }
                let scale_factor = (end.foreign_ms - start.foreign_ms) / local_span;
                self.params = SyncParams {
                    offset_ms: start.foreign_ms - start.local_ms * scale_factor,
                    scale_factor,
                };
            }
            (Some(anchor), None) | (None, Some(anchor)) => {
                self.params = SyncParams {
                    offset_ms: anchor.foreign_ms - anchor.local_ms,
                    scale_factor: 1.0,
                };
            }
            (None, None) => self.params = SyncParams::default(),
        }

        debug!(
            offset_ms = self.params.offset_ms,
            scale = self.params.scale_factor,
            state = ?self.state(),
            "sync parameters recomputed"
        );
        RecomputeOutcome::Updated
    }
}
