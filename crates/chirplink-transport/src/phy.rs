//! # PHY Transducer Seam
//!
//! The acoustic modem is an external collaborator: the core only hands it
//! ASCII text and gets back opaque sample buffers (and vice versa). Frame
//! bytes cross this hop base64-armored, since the modem accepts text
//! rather than arbitrary bytes.
//!
//! The only physical quantity the core reads is the sample count, which
//! together with the sample rate gives the on-air duration of a
//! transmission.

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;

/// Default modem sample rate in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

/// An opaque byte-in / byte-out modem.
///
/// One transducer serves a whole run; each direction gets its own decoder
/// handle from [`Transducer::init_rx`] because real modem decoders carry
/// per-stream state and are not reentrant.
pub trait Transducer {
    /// Per-direction decoder state.
    type Rx;

    /// Modulate an ASCII string into a sample buffer.
    fn encode(&mut self, text: &str) -> Result<Bytes>;

    /// Create a fresh decoder handle.
    fn init_rx(&mut self) -> Self::Rx;

    /// Demodulate a sample buffer back into text. `None` means the
    /// transmission was not recoverable.
    fn decode(&mut self, rx: &mut Self::Rx, samples: &[u8]) -> Option<String>;

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Number of audio samples in an encoded buffer.
    fn sample_count(&self, samples: &[u8]) -> usize {
        samples.len()
    }
}

/// Byte-transparent test transducer: the "samples" are the text bytes
/// themselves. Lets the whole stack run without any DSP while keeping
/// every hop of the real pipeline, including the armoring.
#[derive(Debug, Clone)]
pub struct IdentityTransducer {
    sample_rate: u32,
}

impl IdentityTransducer {
    pub fn new() -> Self {
        IdentityTransducer {
            sample_rate: SAMPLE_RATE,
        }
    }
}

impl Default for IdentityTransducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transducer for IdentityTransducer {
    type Rx = ();

    fn encode(&mut self, text: &str) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(text.as_bytes()))
    }

    fn init_rx(&mut self) -> Self::Rx {}

    fn decode(&mut self, _rx: &mut Self::Rx, samples: &[u8]) -> Option<String> {
        String::from_utf8(samples.to_vec()).ok()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Armor frame bytes for the text-only modem hop.
pub fn armor(frame: &[u8]) -> String {
    BASE64.encode(frame)
}

/// Recover frame bytes from armored text.
pub fn dearmor(text: &str) -> Result<Bytes, base64::DecodeError> {
    BASE64.decode(text).map(Bytes::from)
}
