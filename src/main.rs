//! Demo binary: polls a mock tracker head and runs one loopback blob
//! transfer end to end.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use camlink::calibration::CalibrationTable;
use camlink::config::Settings;
use camlink::device::MockDeviceManager;
use camlink::scheduler::TaskScheduler;
use camlink::tracker::{CameraTracker, CHAN_PAN, CHAN_TILT};
use camlink::transfer::{
    send_blob, Ack, BlobMessage, LoopbackTransport, PeerId, SendOptions,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "camlink", about = "Camera-rig peripheral I/O demo")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// How long to run the tracker poll loop, in seconds.
    #[arg(long, default_value_t = 2)]
    run_secs: u64,

    /// Spool the demo blob through disk instead of sending inline chunks.
    #[arg(long)]
    use_disk: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log.level)),
        )
        .init();

    let calibration = match &settings.device.calibration_file {
        Some(path) => CalibrationTable::load_from_file(path)?,
        None => CalibrationTable::tracker_head_defaults(),
    };

    let scheduler = TaskScheduler::new();
    let manager = MockDeviceManager::new();
    let tracker = CameraTracker::open(&manager, &settings.device.name, calibration).await?;
    info!(tracker = tracker.name(), device = %settings.device.name, "tracker opened");

    tracker.enable(&scheduler, settings.device.poll_interval);
    tokio::time::sleep(Duration::from_secs(cli.run_secs)).await;
    tracker.log_channels();
    info!(
        pan = tracker.normalized(CHAN_PAN)?,
        tilt = tracker.normalized(CHAN_TILT)?,
        "normalized tracker state"
    );
    tracker.disable(&scheduler);

    run_transfer_demo(&settings, cli.use_disk).await?;

    scheduler.shutdown();
    Ok(())
}

/// Send a demo payload through the loopback transport and have a stand-in
/// peer reassemble and acknowledge it.
async fn run_transfer_demo(settings: &Settings, use_disk: bool) -> Result<()> {
    let target = PeerId(1000);
    let (transport, mut delivery_rx) = LoopbackTransport::new();
    let (ack_tx, ack_rx) = mpsc::channel(4);

    let blob_dir = settings.transfer.blob_dir.clone();
    if use_disk {
        std::fs::create_dir_all(&blob_dir)
            .with_context(|| format!("failed to create blob directory {}", blob_dir.display()))?;
    }

    // Stand-in recipient: reassemble the payload, then acknowledge.
    let peer = tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some((_, msg)) = delivery_rx.recv().await {
            match msg {
                BlobMessage::SetFilename { filename } => {
                    received = std::fs::read(blob_dir.join(&filename)).unwrap_or_default();
                    break;
                }
                BlobMessage::SetChunk { data } if data.is_empty() => break,
                BlobMessage::SetChunk { data } => received.extend_from_slice(&data),
            }
        }
        let _ = ack_tx.send(Ack { from: target }).await;
        received
    });

    let payload = Bytes::from(vec![0xA5u8; 1024]);
    let options = SendOptions::from_settings(&settings.transfer, use_disk);
    let handle = send_blob(&transport, target, payload.clone(), options, ack_rx).await?;
    info!(transfer = %handle.id(), mode = handle.mode(), target = %handle.target(), "blob sent");

    let outcome = handle.wait().await?;
    let received = peer.await?;
    info!(?outcome, received_bytes = received.len(), "transfer complete");
    anyhow::ensure!(received == payload, "reassembled payload mismatch");
    Ok(())
}
