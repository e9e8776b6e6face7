//! Integration test: tracker polling through the scheduler with a mock
//! device manager.

use std::time::Duration;

use camlink::calibration::CalibrationTable;
use camlink::device::MockDeviceManager;
use camlink::error::LinkError;
use camlink::scheduler::TaskScheduler;
use camlink::tracker::{CameraTracker, CHAN_FOCUS, CHAN_PAN, CHAN_TILT, CHAN_ZOOM};

#[tokio::test]
async fn polled_values_normalize_into_requested_interval() {
    let manager = MockDeviceManager::new();
    let channels = manager.channels();
    channels.pin(CHAN_PAN, -180.0);
    channels.pin(CHAN_TILT, 90.0);
    channels.pin(CHAN_ZOOM, 547_074.0);
    channels.pin(CHAN_FOCUS, 494_762.0);

    let tracker = CameraTracker::open(
        &manager,
        "Analog0",
        CalibrationTable::tracker_head_defaults(),
    )
    .await
    .unwrap();

    let scheduler = TaskScheduler::new();
    tracker.enable(&scheduler, Duration::from_millis(1));

    let mut rx = tracker.subscribe();
    rx.changed().await.unwrap();

    assert_eq!(tracker.normalized(CHAN_PAN).unwrap(), -1.0);
    assert_eq!(tracker.normalized(CHAN_TILT).unwrap(), 1.0);
    assert_eq!(tracker.normalized(CHAN_ZOOM).unwrap(), 1.0);
    assert_eq!(tracker.normalized(CHAN_FOCUS).unwrap(), -1.0);

    // A wider output interval scales the same sample accordingly.
    let pan_deg = tracker.normalized_to(CHAN_PAN, -180.0, 180.0).unwrap();
    assert_eq!(pan_deg, -180.0);

    tracker.destroy(&scheduler);
}

#[tokio::test]
async fn out_of_span_samples_clamp_to_interval_bounds() {
    let manager = MockDeviceManager::new();
    let channels = manager.channels();
    // Cable drift can push raw values past the recorded span.
    channels.pin(CHAN_PAN, 10_000.0);
    channels.pin(CHAN_TILT, -10_000.0);

    let tracker = CameraTracker::open(
        &manager,
        "Analog0",
        CalibrationTable::tracker_head_defaults(),
    )
    .await
    .unwrap();
    let scheduler = TaskScheduler::new();
    tracker.enable(&scheduler, Duration::from_millis(1));

    let mut rx = tracker.subscribe();
    rx.changed().await.unwrap();

    assert_eq!(tracker.normalized(CHAN_PAN).unwrap(), 1.0);
    assert_eq!(tracker.normalized(CHAN_TILT).unwrap(), -1.0);

    tracker.destroy(&scheduler);
}

#[tokio::test]
async fn uncalibrated_channel_is_a_hard_failure() {
    let manager = MockDeviceManager::new();
    let tracker = CameraTracker::open(
        &manager,
        "Analog0",
        CalibrationTable::tracker_head_defaults(),
    )
    .await
    .unwrap();

    for channel in 4..16 {
        assert!(matches!(
            tracker.normalized(channel),
            Err(LinkError::InvalidChannel { .. })
        ));
    }
}

#[tokio::test]
async fn disable_stops_snapshot_updates() {
    let manager = MockDeviceManager::new();
    let tracker = CameraTracker::open(
        &manager,
        "Analog0",
        CalibrationTable::tracker_head_defaults(),
    )
    .await
    .unwrap();
    let scheduler = TaskScheduler::new();

    tracker.enable(&scheduler, Duration::from_millis(1));
    let mut rx = tracker.subscribe();
    rx.changed().await.unwrap();
    tracker.disable(&scheduler);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let frozen = tracker.snapshot();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(tracker.snapshot(), frozen);
}
