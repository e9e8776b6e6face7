//! The blob sender: outbound burst, then acknowledgment-driven teardown.
//!
//! [`send_blob`] performs the entire outbound side synchronously before it
//! returns: in disk mode one spool write plus one `setFilename` update, in
//! inline mode a burst of `setChunk` updates ending with an empty
//! terminator. What remains is waiting for the recipient's acknowledgment,
//! which runs as a spawned task behind the returned [`TransferHandle`].
//!
//! An acknowledgment from the designated recipient resolves the handle
//! exactly once. One from any other peer is a protocol violation: it is
//! rejected, logged, and counted, and the session keeps waiting. A session
//! nobody acknowledges expires at the configured deadline instead of
//! leaking; an expired disk-mode session removes its spool file.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::TransferSettings;
use crate::error::{AppResult, LinkError};

use super::{spool, Ack, BlobMessage, BlobTransport, PeerId, DEFAULT_CHUNK_SIZE, USE_DISK};

/// Per-transfer options.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Spool to disk instead of streaming inline chunks.
    pub use_disk: bool,
    /// Size of each inline chunk in bytes.
    pub chunk_size: usize,
    /// Directory for disk-mode spool files.
    pub blob_dir: PathBuf,
    /// Deadline for the recipient's acknowledgment.
    pub ack_timeout: Duration,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            use_disk: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            blob_dir: PathBuf::from("blobs"),
            ack_timeout: Duration::from_secs(30),
        }
    }
}

impl SendOptions {
    /// Options derived from the transfer section of the settings.
    pub fn from_settings(settings: &TransferSettings, use_disk: bool) -> Self {
        Self {
            use_disk,
            chunk_size: settings.chunk_size,
            blob_dir: settings.blob_dir.clone(),
            ack_timeout: settings.ack_timeout,
        }
    }
}

/// How a transfer session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The designated recipient acknowledged receipt.
    Acknowledged,
    /// The acknowledgment deadline passed; the session was torn down.
    Expired,
}

/// Handle on a transfer session awaiting acknowledgment.
#[derive(Debug)]
pub struct TransferHandle {
    id: Uuid,
    target: PeerId,
    mode: u32,
    task: JoinHandle<AppResult<TransferOutcome>>,
}

impl TransferHandle {
    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The designated recipient.
    pub fn target(&self) -> PeerId {
        self.target
    }

    /// Mode bits of the session; [`USE_DISK`] is set for disk mode.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Wait for the session to end.
    pub async fn wait(self) -> AppResult<TransferOutcome> {
        self.task
            .await
            .map_err(|e| LinkError::Transfer(format!("ack task failed: {e}")))?
    }

    /// Abandon the session without waiting.
    pub fn abort(self) {
        self.task.abort();
    }
}

/// Slice a payload into non-terminal chunks of at most `chunk_size` bytes.
///
/// The slices borrow the payload's buffer; no bytes are copied. An empty
/// payload yields no chunks.
pub fn chunk_payload(payload: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let mut chunks = Vec::with_capacity(payload.len().div_ceil(chunk_size.max(1)));
    let mut offset = 0;
    while offset < payload.len() {
        let end = (offset + chunk_size).min(payload.len());
        chunks.push(payload.slice(offset..end));
        offset = end;
    }
    chunks
}

/// Send `payload` to `target`, returning a handle on the pending session.
///
/// The outbound burst happens before this function returns; only the
/// acknowledgment wait is deferred to the handle. `ack_rx` is the inbound
/// delivery channel the messaging substrate routes this session's
/// acknowledgments to.
pub async fn send_blob(
    transport: &dyn BlobTransport,
    target: PeerId,
    payload: Bytes,
    options: SendOptions,
    ack_rx: mpsc::Receiver<Ack>,
) -> AppResult<TransferHandle> {
    if options.chunk_size == 0 {
        return Err(LinkError::Configuration(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let id = Uuid::new_v4();
    let mut mode = 0;
    let mut spooled: Option<PathBuf> = None;

    if options.use_disk {
        mode |= USE_DISK;
        let filename = spool::spool_payload(&options.blob_dir, &payload)?;
        spooled = Some(spool::spool_path(&options.blob_dir, &filename));
        transport
            .send_update(target, BlobMessage::SetFilename { filename })
            .await?;
        info!(transfer = %id, %target, bytes = payload.len(), "sent disk-mode blob");
    } else {
        let chunks = chunk_payload(&payload, options.chunk_size);
        let count = chunks.len();
        for data in chunks {
            transport
                .send_update(target, BlobMessage::SetChunk { data })
                .await?;
        }
        // Final empty chunk marks the end of the stream.
        transport
            .send_update(target, BlobMessage::SetChunk { data: Bytes::new() })
            .await?;
        info!(
            transfer = %id,
            %target,
            bytes = payload.len(),
            chunks = count,
            "sent inline blob"
        );
    }

    let task = tokio::spawn(await_ack(id, target, options.ack_timeout, spooled, ack_rx));

    Ok(TransferHandle {
        id,
        target,
        mode,
        task,
    })
}

/// Wait for the designated recipient's acknowledgment, or expire.
async fn await_ack(
    id: Uuid,
    target: PeerId,
    ack_timeout: Duration,
    spooled: Option<PathBuf>,
    mut ack_rx: mpsc::Receiver<Ack>,
) -> AppResult<TransferOutcome> {
    let deadline = Instant::now() + ack_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, ack_rx.recv()).await {
            Ok(Some(ack)) if ack.from == target => {
                debug!(transfer = %id, "acknowledged");
                return Ok(TransferOutcome::Acknowledged);
            }
            Ok(Some(ack)) => {
                // Protocol violation; the session is not torn down for it.
                error!(
                    transfer = %id,
                    expected = %target,
                    got = %ack.from,
                    "rejecting acknowledgment from unexpected peer"
                );
            }
            Ok(None) => {
                return Err(LinkError::Transfer(format!(
                    "ack channel closed for transfer {id}"
                )));
            }
            Err(_) => {
                warn!(transfer = %id, %target, "transfer expired before acknowledgment");
                if let Some(path) = &spooled {
                    if let Err(e) = std::fs::remove_file(path) {
                        warn!(path = %path.display(), error = %e, "failed to remove spool file");
                    }
                }
                return Ok(TransferOutcome::Expired);
            }
        }
    }
}
