//! Input row schema for IMU recordings
//!
//! Rows mirror the columns written by the recording app:
//! `timestamp,receivedAt,accelX,accelY,accelZ,gyroX,gyroY,gyroZ`.
//! Every field is optional at decode time: a blank cell only costs its row,
//! while a column missing from the whole source gets the source skipped.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{RawSample, Vector3, TIMESTAMP_DISPLAY_FORMAT, TIMESTAMP_FORMAT};

/// Names of the fields every row must carry
pub const REQUIRED_FIELDS: [&str; 7] = [
    "timestamp", "accelX", "accelY", "accelZ", "gyroX", "gyroY", "gyroZ",
];

/// One undecoded reading as supplied by a file reader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    /// Wall-clock time, `yyyy/MM/dd HH:mm:ss.SSS`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "accelX", skip_serializing_if = "Option::is_none")]
    pub accel_x: Option<f64>,
    #[serde(rename = "accelY", skip_serializing_if = "Option::is_none")]
    pub accel_y: Option<f64>,
    #[serde(rename = "accelZ", skip_serializing_if = "Option::is_none")]
    pub accel_z: Option<f64>,
    #[serde(rename = "gyroX", skip_serializing_if = "Option::is_none")]
    pub gyro_x: Option<f64>,
    #[serde(rename = "gyroY", skip_serializing_if = "Option::is_none")]
    pub gyro_y: Option<f64>,
    #[serde(rename = "gyroZ", skip_serializing_if = "Option::is_none")]
    pub gyro_z: Option<f64>,
}

impl SampleRow {
    /// Build a complete row from a parsed instant and both vectors
    pub fn new(time: NaiveDateTime, accel: Vector3, gyro: Vector3) -> Self {
        Self {
            timestamp: Some(time.format(TIMESTAMP_DISPLAY_FORMAT).to_string()),
            accel_x: Some(accel.x),
            accel_y: Some(accel.y),
            accel_z: Some(accel.z),
            gyro_x: Some(gyro.x),
            gyro_y: Some(gyro.y),
            gyro_z: Some(gyro.z),
        }
    }

    /// Whether the named column carries a value in this row
    pub fn has_field(&self, field: &str) -> bool {
        match field {
            "timestamp" => self.timestamp.is_some(),
            "accelX" => self.accel_x.is_some(),
            "accelY" => self.accel_y.is_some(),
            "accelZ" => self.accel_z.is_some(),
            "gyroX" => self.gyro_x.is_some(),
            "gyroY" => self.gyro_y.is_some(),
            "gyroZ" => self.gyro_z.is_some(),
            _ => false,
        }
    }

    /// First required field that is absent, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .find(|field| !self.has_field(field))
    }

    /// Validate and convert into a [`RawSample`]
    pub fn to_sample(&self) -> Result<RawSample, ValidationError> {
        if let Some(field) = self.missing_field() {
            return Err(ValidationError::MissingField(field));
        }

        let raw_time = self.timestamp.as_deref().unwrap_or_default();
        let time = parse_timestamp(raw_time)?;

        Ok(RawSample {
            time,
            accel: Vector3::new(
                self.accel_x.unwrap_or_default(),
                self.accel_y.unwrap_or_default(),
                self.accel_z.unwrap_or_default(),
            ),
            gyro: Vector3::new(
                self.gyro_x.unwrap_or_default(),
                self.gyro_y.unwrap_or_default(),
                self.gyro_z.unwrap_or_default(),
            ),
        })
    }
}

/// Parse a recording timestamp (`2025/12/05 22:20:06.510`)
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|_| {
        ValidationError::InvalidTimestamp {
            value: value.to_string(),
        }
    })
}
