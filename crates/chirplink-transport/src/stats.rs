//! # Run Statistics
//!
//! Counters accumulated over one `run_once` and the resulting record.
//! Everything serializes to JSON for experiment tooling.

use serde::Serialize;

/// Per-run traffic counters, maintained by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LinkCounters {
    /// DATA transmissions offered to the data channel (retransmits included).
    pub data_sent: u64,
    /// DATA transmissions the channel dropped.
    pub data_dropped: u64,
    /// ACK transmissions offered to the ack channel.
    pub ack_sent: u64,
    /// ACK transmissions the channel dropped.
    pub ack_dropped: u64,
    /// Transmissions that failed PHY decode, de-armoring, or frame decode.
    pub crc_fail_total: u64,
}

/// Outcome of one `run_once`.
///
/// `wall_seconds` is read from the virtual clock, so two runs with
/// identical parameters produce identical results, field for field.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunResult {
    /// Whether the receiver reassembled the exact input payload.
    pub ok: bool,
    /// Elapsed virtual time of the run.
    pub wall_seconds: f64,
    /// Payload bytes per second of elapsed time; 0 on failure.
    pub goodput_bytes_per_sec: f64,
    /// Number of DATA fragments the payload was split into.
    pub frames_total: usize,
    /// Stop-and-Wait: per-frame retransmissions (0 under Go-Back-N).
    pub retries_total: u64,
    /// Go-Back-N: window timeouts (0 under Stop-and-Wait).
    pub timeouts_total: u64,
    pub crc_fail_total: u64,
    pub data_sent: u64,
    pub data_dropped: u64,
    pub ack_sent: u64,
    pub ack_dropped: u64,
    /// Modem on-air time: sum of sample_count / sample_rate per
    /// transmission. Only present when PHY-time accounting is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phy_seconds: Option<f64>,
    /// `phy_seconds + recoveries * timeout`: synthetic elapsed time
    /// independent of scheduling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_seconds: Option<f64>,
    /// Goodput over `virtual_seconds`; 0 on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_goodput_bytes_per_sec: Option<f64>,
}

impl RunResult {
    /// Retransmission events regardless of ARQ discipline.
    pub fn recoveries(&self) -> u64 {
        self.retries_total + self.timeouts_total
    }

    /// Fraction of DATA transmissions the channel delivered.
    pub fn data_delivery_rate(&self) -> f64 {
        if self.data_sent == 0 {
            0.0
        } else {
            (self.data_sent - self.data_dropped) as f64 / self.data_sent as f64
        }
    }
}
