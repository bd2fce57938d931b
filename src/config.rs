//! Pipeline configuration

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default grid rate (20 ms interval)
pub const DEFAULT_TARGET_HZ: u32 = 50;

/// Highest grid rate a pipeline config accepts. The resampler itself takes
/// any rate.
pub const MAX_TARGET_HZ: u32 = 1000;

/// Grid size cap for a pipeline load: 55 hours at the default rate
pub const DEFAULT_MAX_GRID_POINTS: usize = 10_000_000;

/// Settings for a recording load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Output grid rate in Hz
    pub target_hz: u32,
    /// Refuse loads whose grid would be larger than this
    pub max_grid_points: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_hz: DEFAULT_TARGET_HZ,
            max_grid_points: DEFAULT_MAX_GRID_POINTS,
        }
    }
}

impl PipelineConfig {
    pub fn with_target_hz(target_hz: u32) -> Self {
        Self {
            target_hz,
            ..Self::default()
        }
    }

    /// Load and validate a JSON config document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_hz == 0 || self.target_hz > MAX_TARGET_HZ {
            return Err(ConfigError::InvalidTargetHz {
                value: self.target_hz,
                max: MAX_TARGET_HZ,
            });
        }
        if self.max_grid_points == 0 {
            return Err(ConfigError::InvalidMaxGridPoints);
        }
        Ok(())
    }

    /// Spacing between grid points
    pub fn grid_interval(&self) -> Duration {
        grid_interval(self.target_hz)
    }
}

/// `1000 / target_hz` milliseconds, at nanosecond precision.
/// A rate of zero is treated as 1 Hz.
pub fn grid_interval(target_hz: u32) -> Duration {
    Duration::nanoseconds(1_000_000_000 / i64::from(target_hz.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_hz, 50);
        assert_eq!(config.grid_interval(), Duration::milliseconds(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());

        let config = PipelineConfig::from_json(r#"{"target_hz": 100}"#).unwrap();
        assert_eq!(config.grid_interval(), Duration::milliseconds(10));
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        assert!(matches!(
            PipelineConfig::from_json(r#"{"target_hz": 0}"#),
            Err(ConfigError::InvalidTargetHz { value: 0, .. })
        ));
        assert!(PipelineConfig::with_target_hz(5000).validate().is_err());
    }

    #[test]
    fn test_grid_limit() {
        let config = PipelineConfig::from_json(r#"{"target_hz": 100}"#).unwrap();
        assert_eq!(config.max_grid_points, DEFAULT_MAX_GRID_POINTS);

        assert!(matches!(
            PipelineConfig::from_json(r#"{"max_grid_points": 0}"#),
            Err(ConfigError::InvalidMaxGridPoints)
        ));
    }

    #[test]
    fn test_interval_above_millisecond_rates() {
        assert_eq!(grid_interval(2000), Duration::microseconds(500));
        assert_eq!(grid_interval(0), Duration::seconds(1));
    }

    #[test]
    fn test_serialization() {
        let config = PipelineConfig::with_target_hz(200);
        let json = config.to_json().unwrap();
        assert_eq!(PipelineConfig::from_json(&json).unwrap(), config);
    }
}
