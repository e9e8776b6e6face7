//! Custom error types for the application.
//!
//! This module defines the primary error type, `LinkError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failure classes that appear in the system:
//!
//! - **`Config` / `Configuration`**: file/format problems reported by the
//!   `figment` layer, and semantic problems (values that parse but are
//!   logically invalid, e.g. a zero chunk size or an inverted channel range).
//! - **`Io`**: wraps `std::io::Error` for all file operations.
//! - **`Device`**: faults reported by an analog device or its channel set.
//! - **`InvalidChannel`**: a normalization request for a channel index outside
//!   the calibrated range. Hard failure, signaled immediately.
//! - **`SpoolDirUnavailable`**: the blob spool directory could not be used.
//!   The transfer attempt is aborted without retry.
//! - **`AckFromUnexpectedPeer`**: an inbound acknowledgment whose sender is
//!   not the transfer's designated recipient. Protocol violation.
//! - **`TransferExpired` / `Transfer`**: an abandoned or otherwise failed
//!   transfer session.
//!
//! By using `#[from]`, `LinkError` can be seamlessly created from underlying
//! error types, simplifying error handling throughout the application with
//! the `?` operator.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::transfer::PeerId;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, LinkError>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File or device I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fault reported by an analog device or channel set.
    #[error("Device error: {0}")]
    Device(String),

    /// Normalization requested for a channel outside the calibrated range.
    #[error("invalid channel {channel}: only {calibrated} channels are calibrated")]
    InvalidChannel {
        /// The channel index that was requested.
        channel: usize,
        /// Number of channels the calibration table covers.
        calibrated: usize,
    },

    /// The blob spool directory could not be accessed or written.
    #[error("could not access blob directory {0}")]
    SpoolDirUnavailable(PathBuf),

    /// A transfer session failed outright.
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// An acknowledgment arrived from a peer other than the designated
    /// recipient of the transfer.
    #[error("acknowledgment from peer {got}, expected {expected}")]
    AckFromUnexpectedPeer {
        /// The designated recipient of the transfer.
        expected: PeerId,
        /// The peer the acknowledgment actually came from.
        got: PeerId,
    },

    /// A transfer session reached its acknowledgment deadline.
    #[error("transfer {0} expired before acknowledgment")]
    TransferExpired(Uuid),
}
