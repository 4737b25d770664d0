//! # Link Configuration
//!
//! Tuning knobs with the defaults that fast-sim grid sweeps settled on,
//! deserializable from TOML so experiment profiles can live in files.

use serde::Deserialize;

use crate::channel::ChannelParams;
use crate::runner::{ArqMode, RunParams};

/// Flat link configuration. Every recognized option has an effect on the
/// run it parameterizes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Modem sample rate in Hz.
    pub sample_rate: u32,
    /// Fragment size in bytes.
    pub max_payload: usize,
    /// ACK wait per frame (SnW) or per window (GBN), milliseconds.
    pub timeout_ms: u64,
    /// Per-seq (SnW) / per-base (GBN) retry ceiling.
    pub max_retries: u32,
    /// Go-Back-N window size.
    pub window: usize,
    /// DATA channel drop probability.
    pub drop_data: f64,
    /// ACK channel drop probability.
    pub drop_ack: f64,
    /// DATA channel single-bit corruption probability.
    pub corrupt_data_prob: f64,
    /// ACK channel single-bit corruption probability.
    pub corrupt_ack_prob: f64,
    /// One-way DATA channel delay in virtual milliseconds.
    pub delay_data_ms: u64,
    /// One-way ACK channel delay in virtual milliseconds.
    pub delay_ack_ms: u64,
    /// PRNG seed for reproducibility.
    pub seed: u64,
    /// Logical message identifier.
    pub msg_id: u16,
    /// Track modem on-air time and virtual-time goodput.
    pub account_phy_time: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            sample_rate: 48_000,
            max_payload: 32,
            timeout_ms: 50,
            max_retries: 50,
            window: 4,
            drop_data: 0.25,
            drop_ack: 0.10,
            corrupt_data_prob: 0.03,
            corrupt_ack_prob: 0.01,
            delay_data_ms: 0,
            delay_ack_ms: 0,
            seed: 1,
            msg_id: 1,
            account_phy_time: true,
        }
    }
}

impl LinkConfig {
    /// Parse a configuration from TOML text; unset options keep their
    /// defaults, unknown options are rejected.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Build run parameters for the given ARQ discipline.
    pub fn run_params(&self, mode: ArqMode) -> RunParams {
        RunParams {
            mode,
            msg_id: self.msg_id,
            max_payload: self.max_payload,
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            window: self.window,
            seed: self.seed,
            data: ChannelParams {
                drop_prob: self.drop_data,
                corrupt_prob: self.corrupt_data_prob,
                delay_ms: self.delay_data_ms,
            },
            ack: ChannelParams {
                drop_prob: self.drop_ack,
                corrupt_prob: self.corrupt_ack_prob,
                delay_ms: self.delay_ack_ms,
            },
            account_phy_time: self.account_phy_time,
        }
    }
}
