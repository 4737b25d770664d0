//! # Fragmentation & Reassembly
//!
//! Splits a caller payload into ordered DATA frames sharing a `msg_id`,
//! and rebuilds the payload from the parts a receiver has collected.
//!
//! An empty payload still produces one (empty) DATA frame so that the
//! ARQ machinery has something to acknowledge.

use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::wire::Frame;

/// Fragmentation failure kinds. Both are caller errors, never recoverable
/// protocol events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FragmentError {
    #[error("max_payload must be at least 1")]
    InvalidMaxPayload,
    #[error("payload needs {0} fragments, wire limit is 65535")]
    TooManyFragments(usize),
}

/// Split `payload` into DATA frames of at most `max_payload` bytes each.
///
/// Fragment `i` carries bytes `[i*max_payload, min((i+1)*max_payload, len))`
/// with `seq = i` and `total = ceil(len / max_payload)` (minimum 1).
pub fn fragment(payload: &Bytes, msg_id: u16, max_payload: usize) -> Result<Vec<Frame>, FragmentError> {
    if max_payload == 0 {
        return Err(FragmentError::InvalidMaxPayload);
    }

    let total = payload.len().div_ceil(max_payload).max(1);
    if total > u16::MAX as usize {
        return Err(FragmentError::TooManyFragments(total));
    }

    let mut frames = Vec::with_capacity(total);
    for seq in 0..total {
        let start = seq * max_payload;
        let end = ((seq + 1) * max_payload).min(payload.len());
        frames.push(Frame::data(
            msg_id,
            seq as u16,
            total as u16,
            payload.slice(start..end),
        ));
    }
    Ok(frames)
}

/// Receiver-side reassembly state for one logical message.
///
/// `total` starts unknown and is latched from the first accepted DATA
/// frame. Inserts are idempotent: duplicate fragments overwrite with
/// identical bytes.
#[derive(Debug, Default)]
pub struct Reassembly {
    parts: BTreeMap<u16, Bytes>,
    total: Option<u16>,
}

impl Reassembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the expected fragment count; only the first call takes effect.
    pub fn note_total(&mut self, total: u16) {
        if self.total.is_none() {
            self.total = Some(total);
        }
    }

    pub fn total(&self) -> Option<u16> {
        self.total
    }

    pub fn insert(&mut self, seq: u16, part: Bytes) {
        self.parts.insert(seq, part);
    }

    /// Number of distinct fragments collected so far.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Highest fragment index stored, if any.
    pub fn max_seq(&self) -> Option<u16> {
        self.parts.keys().next_back().copied()
    }

    pub fn is_complete(&self) -> bool {
        match self.total {
            Some(total) => (0..total).all(|seq| self.parts.contains_key(&seq)),
            None => false,
        }
    }

    /// Concatenate all fragments in order. `None` while any is missing
    /// (or before the total is known).
    pub fn assemble(&self) -> Option<Bytes> {
        let total = self.total?;
        if !self.is_complete() {
            return None;
        }
        let mut out = BytesMut::with_capacity(self.parts.values().map(Bytes::len).sum());
        for seq in 0..total {
            out.extend_from_slice(&self.parts[&seq]);
        }
        Some(out.freeze())
    }
}
