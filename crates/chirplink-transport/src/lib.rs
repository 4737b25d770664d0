//! # chirplink-transport
//!
//! Chirplink reliable acoustic link layer.
//!
//! A fixed binary frame format with CRC-32 trailer, fragmentation and
//! reassembly, and two interchangeable ARQ disciplines (Stop-and-Wait and
//! Go-Back-N) driven over independent lossy data and ack channels, with a
//! deterministic virtual-time run harness for protocol experiments.
//!
//! ## Crate structure
//!
//! - [`wire`] — Frame header serialization and CRC-32 verification
//! - [`frag`] — Payload fragmentation and reassembly
//! - [`channel`] — Seeded drop/corrupt/delay channel model
//! - [`phy`] — Opaque modem transducer seam and base64 armoring
//! - [`receiver`] — Stop-and-Wait and Go-Back-N receiver halves
//! - [`sender`] — Stop-and-Wait and Go-Back-N sender halves
//! - [`runner`] — Run orchestrator with the virtual-time event loop
//! - [`stats`] — Per-run counters and the `RunResult` record
//! - [`config`] — Tuned defaults, TOML-loadable

pub mod channel;
pub mod config;
pub mod frag;
pub mod phy;
pub mod receiver;
pub mod runner;
pub mod sender;
pub mod stats;
pub mod wire;
