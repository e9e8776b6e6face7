//! A mock device manager that generates synthetic channel data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::error::{AppResult, LinkError};

use super::{AnalogChannels, DeviceManager};

/// Synthetic analog channel set.
///
/// Each channel sweeps a slow sine wave across its configured span, with a
/// deterministic wobble standing in for sensor noise so runs are
/// reproducible. Individual channels can be pinned to fixed values for
/// tests.
pub struct MockChannels {
    spans: Vec<(f64, f64)>,
    pinned: Mutex<Vec<Option<f64>>>,
    ticks: AtomicU64,
}

impl MockChannels {
    /// Create a channel set sweeping each `(min, max)` span.
    pub fn new(spans: Vec<(f64, f64)>) -> Self {
        let pinned = Mutex::new(vec![None; spans.len()]);
        Self {
            spans,
            pinned,
            ticks: AtomicU64::new(0),
        }
    }

    /// Spans matching a stock tracker head: pan, tilt, zoom, focus.
    pub fn tracker_head() -> Self {
        Self::new(vec![
            (-180.0, 180.0),
            (-90.0, 90.0),
            (522_517.0, 547_074.0),
            (494_762.0, 533_984.0),
        ])
    }

    /// Pin a channel to a fixed value; subsequent reads return it verbatim.
    pub fn pin(&self, channel: usize, value: f64) {
        if let Ok(mut pinned) = self.pinned.lock() {
            if let Some(slot) = pinned.get_mut(channel) {
                *slot = Some(value);
            }
        }
    }

    /// Release a pinned channel back to the synthetic sweep.
    pub fn unpin(&self, channel: usize) {
        if let Ok(mut pinned) = self.pinned.lock() {
            if let Some(slot) = pinned.get_mut(channel) {
                *slot = None;
            }
        }
    }
}

impl AnalogChannels for MockChannels {
    fn len(&self) -> usize {
        self.spans.len()
    }

    fn read(&self, channel: usize) -> AppResult<f64> {
        let (min, max) = *self
            .spans
            .get(channel)
            .ok_or_else(|| LinkError::Device(format!("no such channel: {channel}")))?;

        if let Ok(pinned) = self.pinned.lock() {
            if let Some(Some(value)) = pinned.get(channel) {
                return Ok(*value);
            }
        }

        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) as f64;
        let mid = (min + max) / 2.0;
        let amplitude = (max - min) / 2.0;
        // Deterministic wobble instead of thread_rng, so runs replay exactly.
        let noise = (tick * 37.0).sin() * 0.01;
        Ok(mid + amplitude * ((tick * 0.01).sin() * 0.9 + noise))
    }
}

/// Device manager returning [`MockChannels`] for any device name.
pub struct MockDeviceManager {
    channels: Arc<MockChannels>,
}

impl Default for MockDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDeviceManager {
    /// Manager whose channel set matches a stock tracker head.
    pub fn new() -> Self {
        Self {
            channels: Arc::new(MockChannels::tracker_head()),
        }
    }

    /// Manager wrapping a caller-supplied channel set.
    pub fn with_channels(channels: Arc<MockChannels>) -> Self {
        Self { channels }
    }

    /// The underlying mock channel set, for pinning values in tests.
    pub fn channels(&self) -> Arc<MockChannels> {
        self.channels.clone()
    }
}

#[async_trait]
impl DeviceManager for MockDeviceManager {
    async fn create_analogs(&self, device: &str) -> AppResult<Arc<dyn AnalogChannels>> {
        info!(device, "opening mock analog channel set");
        Ok(self.channels.clone())
    }
}
