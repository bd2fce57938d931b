//! Input schema for raw IMU recordings
//!
//! File reading happens outside the crate; callers hand over rows that have
//! already been decoded from the recording app's CSV or JSON exports.

mod sample_row;
mod source;

pub use sample_row::*;
pub use source::*;
