//! # Receiver State Machines
//!
//! Pure logic — no I/O, no clocks. Both receivers accept already-decoded
//! DATA frames for one message and answer with the ACK frame to emit, if
//! any. Undecodable transmissions never reach them; the orchestrator
//! counts those.
//!
//! Two ACK-emission policies:
//!
//! - **Stop-and-Wait**: every accepted frame (duplicates included) is
//!   answered with an ACK echoing its own `(msg_id, seq, total)`.
//! - **Go-Back-N**: cumulative. The ACK names the last in-order
//!   fragment received. Until the first in-order fragment arrives there
//!   is nothing to acknowledge, so no ACK is emitted at all; an
//!   "ACK below zero" would let the sender advance its base spuriously.

use bytes::Bytes;

use crate::frag::Reassembly;
use crate::wire::{Frame, FrameType};

// ─── Stop-and-Wait ──────────────────────────────────────────────────────────

/// Stop-and-Wait receiver half for one logical message.
#[derive(Debug)]
pub struct SnwReceiver {
    msg_id: u16,
    reassembly: Reassembly,
    assembled: Option<Bytes>,
}

impl SnwReceiver {
    pub fn new(msg_id: u16) -> Self {
        SnwReceiver {
            msg_id,
            reassembly: Reassembly::new(),
            assembled: None,
        }
    }

    /// Accept a DATA frame. Returns the ACK to send back, or `None` when
    /// the frame belongs to another message or is not DATA.
    ///
    /// Storage is idempotent and the assembled payload is latched on
    /// completion; later duplicates keep being ACKed so that the sender's
    /// final retransmissions can close.
    pub fn on_data(&mut self, frame: &Frame) -> Option<Frame> {
        if frame.frame_type != FrameType::Data || frame.msg_id != self.msg_id {
            return None;
        }

        self.reassembly.note_total(frame.total);
        self.reassembly.insert(frame.seq, frame.payload.clone());

        if self.assembled.is_none() {
            self.assembled = self.reassembly.assemble();
        }

        Some(Frame::ack(self.msg_id, frame.seq, frame.total))
    }

    /// The completed payload, once every fragment has arrived.
    pub fn assembled(&self) -> Option<&Bytes> {
        self.assembled.as_ref()
    }

    /// Number of distinct fragments stored so far.
    pub fn fragments_stored(&self) -> usize {
        self.reassembly.len()
    }
}

// ─── Go-Back-N ──────────────────────────────────────────────────────────────

/// Go-Back-N receiver half for one logical message.
///
/// `expected_seq` always equals the number of contiguous fragments
/// received starting at 0; nothing out of order is ever stored.
#[derive(Debug)]
pub struct GbnReceiver {
    msg_id: u16,
    expected_seq: usize,
    reassembly: Reassembly,
}

impl GbnReceiver {
    pub fn new(msg_id: u16) -> Self {
        GbnReceiver {
            msg_id,
            expected_seq: 0,
            reassembly: Reassembly::new(),
        }
    }

    /// Accept a DATA frame. In-order frames are stored and advance
    /// `expected_seq`; anything else only refreshes the cumulative ACK.
    pub fn on_data(&mut self, frame: &Frame) -> Option<Frame> {
        if frame.frame_type != FrameType::Data || frame.msg_id != self.msg_id {
            return None;
        }

        self.reassembly.note_total(frame.total);

        if frame.seq as usize == self.expected_seq {
            self.reassembly.insert(frame.seq, frame.payload.clone());
            self.expected_seq += 1;
        }

        if self.expected_seq == 0 {
            // Nothing in-order received yet, so nothing to acknowledge.
            return None;
        }

        Some(Frame::ack(
            self.msg_id,
            (self.expected_seq - 1) as u16,
            frame.total,
        ))
    }

    /// Next fragment index the receiver will store.
    pub fn expected_seq(&self) -> usize {
        self.expected_seq
    }

    /// The completed payload, once every fragment has arrived in order.
    pub fn assembled(&self) -> Option<Bytes> {
        self.reassembly.assemble()
    }

    /// Highest fragment index stored, if any.
    pub fn max_stored_seq(&self) -> Option<u16> {
        self.reassembly.max_seq()
    }
}
