//! Device-manager abstraction over analog input hardware.
//!
//! The host environment owns the actual OS-level device handling; this crate
//! only needs two capabilities from it, expressed as traits so they can be
//! injected instead of reached through a global:
//!
//! - [`DeviceManager`]: create the analog channel set for a named device.
//! - [`AnalogChannels`]: read the current value of channel `i`.
//!
//! [`MockDeviceManager`] provides a hardware-free implementation for tests
//! and the demo binary.

pub mod mock;

pub use mock::{MockChannels, MockDeviceManager};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;

/// A set of analog channels belonging to one opened device.
///
/// Reads are non-blocking snapshots of the channel's current value; the
/// poll loop calls [`read`](AnalogChannels::read) once per channel per tick.
pub trait AnalogChannels: Send + Sync {
    /// Number of channels in the set.
    fn len(&self) -> usize;

    /// True when the device exposes no channels.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current value of channel `channel`.
    fn read(&self, channel: usize) -> AppResult<f64>;
}

/// Factory for analog channel sets, abstracting the host's device manager.
#[async_trait]
pub trait DeviceManager: Send + Sync {
    /// Create the analog channel set for the named device.
    async fn create_analogs(&self, device: &str) -> AppResult<Arc<dyn AnalogChannels>>;
}
