//! TinyTNC library: portable KISS TNC link layer.
//!
//! Bridges a KISS host on a serial line to a packet radio modem. Host bytes
//! are reassembled into KISS frames, configuration commands update the
//! channel parameters, and data frames go out through p-persistent CSMA,
//! either blocking (direct) or via a small retry queue. A beacon scheduler
//! decides when to send an APRS position report, on a fixed interval or
//! with SmartBeaconing.
//!
//! Everything here is `no_std` with no allocator. The board (serial, modem,
//! timer, random source) is reached only through the traits in [`hal`], so
//! the whole link layer is testable on any host with `cargo test`.
//!
//! - `comm`, `protocol`: KISS framing and host commands
//! - `channel`: channel parameters and CSMA access
//! - `beacon`, `gps`: beacon timing and position reports
//! - `settings`, `defaults`: station configuration
//! - `tnc`: the context the firmware main loop drives

#![cfg_attr(not(test), no_std)]

pub mod beacon;
pub mod channel;
pub mod comm;
pub mod defaults;
pub mod gps;
pub mod hal;
pub mod protocol;
pub mod settings;
pub mod tnc;
