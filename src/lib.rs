//! Core library for the camlink application.
//!
//! This library provides two peripheral services for a camera-rig host:
//! a polling adapter that snapshots and normalizes the analog channels of a
//! camera-tracking device, and a one-shot sender that moves large opaque
//! payloads to a single remote peer, either inline in bounded-size chunks
//! or spooled through a shared directory on disk.

pub mod calibration;
pub mod config;
pub mod device;
pub mod error;
pub mod scheduler;
pub mod tracker;
pub mod transfer;
