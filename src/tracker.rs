//! Polling adapter for camera-tracking hardware.
//!
//! A [`CameraTracker`] opens the analog channel set of a named device and
//! registers a repeating task that snapshots every channel once per tick.
//! The latest snapshot is published through a watch channel, so readers can
//! borrow it without ever blocking the poll loop, and per-channel values can
//! be normalized into a caller-chosen interval via the calibration table.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::calibration::{CalibrationTable, MAX_ANALOG_CHANNELS};
use crate::device::{AnalogChannels, DeviceManager};
use crate::error::AppResult;
use crate::scheduler::{TaskScheduler, TaskStep};

/// Pan channel of a tracker head.
pub const CHAN_PAN: usize = 0;
/// Tilt channel of a tracker head.
pub const CHAN_TILT: usize = 1;
/// Zoom channel of a tracker head.
pub const CHAN_ZOOM: usize = 2;
/// Focus channel of a tracker head.
pub const CHAN_FOCUS: usize = 3;

static TRACKER_COUNT: AtomicUsize = AtomicUsize::new(0);

/// One poll cycle's worth of raw channel values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    /// Raw samples, one slot per channel; unread slots stay zero.
    pub values: [f64; MAX_ANALOG_CHANNELS],
    /// When the samples were taken.
    pub taken_at: DateTime<Utc>,
}

impl Default for ChannelSnapshot {
    fn default() -> Self {
        Self {
            values: [0.0; MAX_ANALOG_CHANNELS],
            taken_at: Utc::now(),
        }
    }
}

/// Polling adapter over one tracker device.
pub struct CameraTracker {
    name: String,
    channels: Arc<dyn AnalogChannels>,
    calibration: CalibrationTable,
    snapshot_tx: watch::Sender<ChannelSnapshot>,
}

impl CameraTracker {
    /// Open the named device through the manager and build a tracker around
    /// its channel set. Instances are named `Tracker-N` in creation order.
    pub async fn open(
        manager: &dyn DeviceManager,
        device: &str,
        calibration: CalibrationTable,
    ) -> AppResult<Self> {
        calibration.validate()?;
        let channels = manager.create_analogs(device).await?;
        let count = TRACKER_COUNT.fetch_add(1, Ordering::Relaxed);
        let (snapshot_tx, _) = watch::channel(ChannelSnapshot::default());
        Ok(Self {
            name: format!("Tracker-{count}"),
            channels,
            calibration,
            snapshot_tx,
        })
    }

    /// Instance name, `Tracker-N`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of channels the device exposes.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Name of the repeating poll task this tracker registers.
    pub fn task_name(&self) -> String {
        format!("{}-update", self.name)
    }

    /// Register the poll task. Any previous registration under this
    /// tracker's name is cancelled first.
    pub fn enable(&self, scheduler: &TaskScheduler, period: Duration) {
        self.disable(scheduler);
        let channels = self.channels.clone();
        let snapshot_tx = self.snapshot_tx.clone();
        scheduler.add(&self.task_name(), period, move || {
            let channels = channels.clone();
            let snapshot_tx = snapshot_tx.clone();
            async move {
                poll_once(channels.as_ref(), &snapshot_tx);
                TaskStep::Continue
            }
        });
    }

    /// Cancel the poll task.
    pub fn disable(&self, scheduler: &TaskScheduler) {
        scheduler.remove(&self.task_name());
    }

    /// Tear the tracker down, cancelling its poll task.
    pub fn destroy(self, scheduler: &TaskScheduler) {
        self.disable(scheduler);
    }

    /// Latest snapshot of all channels.
    pub fn snapshot(&self) -> ChannelSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<ChannelSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Normalize the latest sample of `channel` into `[-1, 1]`.
    pub fn normalized(&self, channel: usize) -> AppResult<f64> {
        self.normalized_to(channel, -1.0, 1.0)
    }

    /// Normalize the latest sample of `channel` into `[out_min, out_max]`.
    ///
    /// Pure over the snapshot: no locks, no device access. Fails with
    /// `InvalidChannel` when `channel` is outside the calibrated range.
    pub fn normalized_to(&self, channel: usize, out_min: f64, out_max: f64) -> AppResult<f64> {
        let raw = self.snapshot_tx.borrow().values[channel.min(MAX_ANALOG_CHANNELS - 1)];
        self.calibration.normalize(channel, raw, out_min, out_max)
    }

    /// Debug-dump the tracker head channels, raw and normalized.
    pub fn log_channels(&self) {
        let snapshot = self.snapshot();
        let pan = self.normalized_to(CHAN_PAN, -180.0, 180.0).ok();
        let tilt = self.normalized_to(CHAN_TILT, -90.0, 90.0).ok();
        debug!(
            tracker = %self.name,
            pan = snapshot.values[CHAN_PAN],
            tilt = snapshot.values[CHAN_TILT],
            zoom = snapshot.values[CHAN_ZOOM],
            focus = snapshot.values[CHAN_FOCUS],
            normalized_pan = ?pan,
            normalized_tilt = ?tilt,
            "tracker channels"
        );
    }
}

/// Read every channel into a fresh snapshot and publish it.
fn poll_once(channels: &dyn AnalogChannels, snapshot_tx: &watch::Sender<ChannelSnapshot>) {
    let mut snapshot = ChannelSnapshot {
        values: snapshot_tx.borrow().values,
        taken_at: Utc::now(),
    };
    for (channel, slot) in snapshot
        .values
        .iter_mut()
        .enumerate()
        .take(channels.len().min(MAX_ANALOG_CHANNELS))
    {
        match channels.read(channel) {
            Ok(value) => *slot = value,
            // Keep the previous sample; a transient read fault should not
            // zero the channel mid-stream.
            Err(e) => warn!(channel, error = %e, "analog read failed"),
        }
    }
    snapshot_tx.send_replace(snapshot);
}
