//! Per-channel calibration for analog tracker devices.
//!
//! Tracker heads report pan/tilt/zoom/focus as raw analog values whose span
//! is recorded by hand and drifts over time (unplugging or jostling the
//! cables is enough to shift it). This module keeps those hand-tuned spans
//! in a [`CalibrationTable`] and applies linear normalization:
//!
//! ```text
//! out = (out_max - out_min) * (clamp(raw, min, max) - min) / (max - min) + out_min
//! ```
//!
//! The raw sample is clamped into `[min, max]` on both sides before scaling,
//! so the output always lies within `[out_min, out_max]`.
//!
//! Tables are JSON files on disk so a re-recorded span can be loaded without
//! rebuilding. Every range is validated on construction and on load: a range
//! whose `max` is not strictly greater than its `min` is rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppResult, LinkError};

/// Largest channel count a tracker device exposes.
pub const MAX_ANALOG_CHANNELS: usize = 8;

// =============================================================================
// Channel Range
// =============================================================================

/// Hand-recorded raw span of a single analog channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    /// Raw value the device reports at the low end of travel.
    pub min: f64,
    /// Raw value the device reports at the high end of travel.
    pub max: f64,
}

impl ChannelRange {
    /// Create a range, rejecting spans where `max` is not strictly greater
    /// than `min`.
    pub fn new(min: f64, max: f64) -> AppResult<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    fn validate(&self) -> AppResult<()> {
        if !(self.max > self.min) {
            return Err(LinkError::Configuration(format!(
                "channel range max ({}) must be greater than min ({})",
                self.max, self.min
            )));
        }
        Ok(())
    }

    /// Width of the raw span.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Clamp a raw sample into the recorded span.
    pub fn clamp(&self, raw: f64) -> f64 {
        raw.clamp(self.min, self.max)
    }

    /// Map a raw sample into `[out_min, out_max]`.
    pub fn normalize(&self, raw: f64, out_min: f64, out_max: f64) -> f64 {
        (out_max - out_min) * (self.clamp(raw) - self.min) / self.span() + out_min
    }
}

// =============================================================================
// Calibration Table
// =============================================================================

/// Ordered per-channel ranges for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    /// Device the spans were recorded against.
    pub device: String,
    /// One range per calibrated channel, in channel order.
    pub ranges: Vec<ChannelRange>,
}

impl CalibrationTable {
    /// Build a table from validated ranges.
    pub fn new(device: &str, ranges: Vec<ChannelRange>) -> AppResult<Self> {
        let table = Self {
            device: device.to_string(),
            ranges,
        };
        table.validate()?;
        Ok(table)
    }

    /// Spans for a stock tracker head: pan and tilt in degrees, zoom and
    /// focus as raw encoder counts. Re-record these often for best results.
    pub fn tracker_head_defaults() -> Self {
        Self {
            device: "Analog0".to_string(),
            ranges: vec![
                ChannelRange { min: -180.0, max: 180.0 },
                ChannelRange { min: -90.0, max: 90.0 },
                ChannelRange { min: 522_517.0, max: 547_074.0 },
                ChannelRange { min: 494_762.0, max: 533_984.0 },
            ],
        }
    }

    /// Number of calibrated channels.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True when no channel is calibrated.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Range for a channel, or `InvalidChannel` when the index is outside
    /// the calibrated set.
    pub fn range(&self, channel: usize) -> AppResult<&ChannelRange> {
        self.ranges
            .get(channel)
            .ok_or(LinkError::InvalidChannel {
                channel,
                calibrated: self.ranges.len(),
            })
    }

    /// Normalize a raw sample from `channel` into `[out_min, out_max]`.
    pub fn normalize(
        &self,
        channel: usize,
        raw: f64,
        out_min: f64,
        out_max: f64,
    ) -> AppResult<f64> {
        Ok(self.range(channel)?.normalize(raw, out_min, out_max))
    }

    /// Check every range in the table.
    pub fn validate(&self) -> AppResult<()> {
        if self.ranges.len() > MAX_ANALOG_CHANNELS {
            return Err(LinkError::Configuration(format!(
                "calibration table covers {} channels, device limit is {}",
                self.ranges.len(),
                MAX_ANALOG_CHANNELS
            )));
        }
        for range in &self.ranges {
            range.validate()?;
        }
        Ok(())
    }

    /// Load a table from a JSON file, validating every range.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let table: CalibrationTable = serde_json::from_str(&contents)
            .map_err(|e| LinkError::Configuration(format!(
                "failed to parse calibration file {}: {}",
                path.display(),
                e
            )))?;
        table.validate()?;
        info!(
            path = %path.display(),
            device = %table.device,
            channels = table.ranges.len(),
            "loaded calibration table"
        );
        Ok(table)
    }

    /// Save the table to a JSON file, creating parent directories as needed.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| LinkError::Configuration(format!(
                "failed to serialize calibration table: {}",
                e
            )))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        info!(path = %path.display(), "saved calibration table");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_rejects_inverted_span() {
        assert!(ChannelRange::new(10.0, 10.0).is_err());
        assert!(ChannelRange::new(10.0, 5.0).is_err());
        assert!(ChannelRange::new(-1.0, 1.0).is_ok());
    }

    #[test]
    fn test_normalize_endpoints() {
        let range = ChannelRange::new(-180.0, 180.0).unwrap();
        assert!((range.normalize(-180.0, -1.0, 1.0) - (-1.0)).abs() < 1e-12);
        assert!((range.normalize(0.0, -1.0, 1.0) - 0.0).abs() < 1e-12);
        assert!((range.normalize(180.0, -1.0, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_clamps_both_sides() {
        let range = ChannelRange::new(0.0, 100.0).unwrap();
        // Below the span clamps to out_min, above it to out_max.
        assert!((range.normalize(-50.0, 0.0, 1.0) - 0.0).abs() < 1e-12);
        assert!((range.normalize(250.0, 0.0, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_stays_within_output_interval() {
        let range = ChannelRange::new(494_762.0, 533_984.0).unwrap();
        for raw in [0.0, 494_762.0, 510_000.0, 533_984.0, 1e9] {
            let v = range.normalize(raw, -1.0, 1.0);
            assert!((-1.0..=1.0).contains(&v), "raw={} v={}", raw, v);
        }
    }

    #[test]
    fn test_table_invalid_channel() {
        let table = CalibrationTable::tracker_head_defaults();
        let err = table.normalize(4, 0.0, -1.0, 1.0).unwrap_err();
        match err {
            LinkError::InvalidChannel { channel, calibrated } => {
                assert_eq!(channel, 4);
                assert_eq!(calibrated, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_table_rejects_too_many_channels() {
        let ranges = vec![ChannelRange { min: 0.0, max: 1.0 }; MAX_ANALOG_CHANNELS + 1];
        assert!(CalibrationTable::new("Analog0", ranges).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal").join("tracker.json");

        let table = CalibrationTable::tracker_head_defaults();
        table.save_to_file(&path).unwrap();

        let loaded = CalibrationTable::load_from_file(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_load_rejects_invalid_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"device": "Analog0", "ranges": [{"min": 5.0, "max": 5.0}]}"#,
        )
        .unwrap();
        assert!(CalibrationTable::load_from_file(&path).is_err());
    }
}
