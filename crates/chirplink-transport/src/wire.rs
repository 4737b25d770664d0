//! # Chirplink Wire Format
//!
//! Fixed binary frame, the sole on-wire unit. All multi-byte fields are
//! big-endian.
//!
//! ```text
//!  0                   1
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3
//! +---+-+-+---+-----+-----+-----+-----+
//! |"CP"|V|T|RSV|MSGID| SEQ |TOTAL| LEN |
//! +---+-+-+---+-----+-----+-----+-----+
//! | payload (LEN bytes)               |
//! +-----------------------------------+
//! | CRC-32 over header + payload      |
//! +-----------------------------------+
//! ```
//!
//! The CRC trails the payload so a receiver can verify integrity after
//! reading the whole transmission. The two reserved bytes are written as
//! zero and ignored on decode, leaving room for future flags without a
//! version bump.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Frame magic, first two bytes of every frame.
pub const MAGIC: [u8; 2] = *b"CP";

/// Protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed header size: magic(2) + version(1) + type(1) + reserved(2)
/// + msg_id(2) + seq(2) + total(2) + payload_len(2).
pub const HEADER_LEN: usize = 14;

/// CRC-32 trailer size.
pub const CRC_LEN: usize = 4;

/// Maximum payload in a single frame (64 KiB - 1).
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

// ─── Frame Type ──────────────────────────────────────────────────────────────

/// Whether the frame carries message data or an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Data = 0,
    Ack = 1,
}

impl FrameType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(FrameType::Data),
            1 => Some(FrameType::Ack),
            _ => None,
        }
    }
}

// ─── Decode Errors ───────────────────────────────────────────────────────────

/// Frame encode/decode failure kinds.
///
/// Every decode failure is recoverable at the protocol level: the caller
/// counts it and drops the transmission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: {0} bytes")]
    TooShort(usize),
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported version {0}")]
    BadVersion(u8),
    #[error("length mismatch: declared payload {declared}, buffer {buffer} bytes")]
    BadLength { declared: u16, buffer: usize },
    #[error("crc mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    BadCrc { expected: u32, computed: u32 },
    #[error("unknown frame type {0}")]
    BadType(u8),
    #[error("field out of range")]
    FieldOutOfRange,
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// A decoded Chirplink frame.
///
/// For ACK frames `seq` echoes the DATA sequence being acknowledged
/// (cumulative last-in-order under Go-Back-N) and the payload is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    /// Identifies the logical message this frame belongs to.
    pub msg_id: u16,
    /// Fragment index (DATA) or acknowledged index (ACK).
    pub seq: u16,
    /// Number of fragments in the logical message.
    pub total: u16,
    pub payload: Bytes,
}

impl Frame {
    /// Create a DATA frame.
    pub fn data(msg_id: u16, seq: u16, total: u16, payload: Bytes) -> Self {
        Frame {
            frame_type: FrameType::Data,
            msg_id,
            seq,
            total,
            payload,
        }
    }

    /// Create an ACK frame (empty payload).
    pub fn ack(msg_id: u16, seq: u16, total: u16) -> Self {
        Frame {
            frame_type: FrameType::Ack,
            msg_id,
            seq,
            total,
            payload: Bytes::new(),
        }
    }

    /// Serialize into wire bytes: header, payload, CRC-32 trailer.
    ///
    /// Fails with [`FrameError::FieldOutOfRange`] when the payload exceeds
    /// the 16-bit length field.
    pub fn encode(&self) -> Result<Bytes, FrameError> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::FieldOutOfRange);
        }

        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len() + CRC_LEN);
        buf.put_slice(&MAGIC);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(self.frame_type as u8);
        buf.put_u16(0); // reserved
        buf.put_u16(self.msg_id);
        buf.put_u16(self.seq);
        buf.put_u16(self.total);
        buf.put_u16(self.payload.len() as u16);
        buf.put_slice(&self.payload);

        let crc = crc32fast::hash(&buf);
        buf.put_u32(crc);
        Ok(buf.freeze())
    }

    /// Parse wire bytes back into a frame.
    ///
    /// The buffer must be exactly `HEADER_LEN + payload_len + CRC_LEN`
    /// bytes; the CRC is verified over everything before the trailer.
    /// The frame type byte is interpreted only after CRC verification so
    /// that wire corruption surfaces as [`FrameError::BadCrc`].
    pub fn decode(raw: &[u8]) -> Result<Frame, FrameError> {
        if raw.len() < HEADER_LEN + CRC_LEN {
            return Err(FrameError::TooShort(raw.len()));
        }
        if raw[0..2] != MAGIC {
            return Err(FrameError::BadMagic);
        }
        if raw[2] != PROTOCOL_VERSION {
            return Err(FrameError::BadVersion(raw[2]));
        }
        // raw[4..6] reserved, ignored

        let payload_len = u16::from_be_bytes([raw[12], raw[13]]);
        let body_end = HEADER_LEN + payload_len as usize;
        if raw.len() != body_end + CRC_LEN {
            return Err(FrameError::BadLength {
                declared: payload_len,
                buffer: raw.len(),
            });
        }

        let expected = u32::from_be_bytes([
            raw[body_end],
            raw[body_end + 1],
            raw[body_end + 2],
            raw[body_end + 3],
        ]);
        let computed = crc32fast::hash(&raw[..body_end]);
        if expected != computed {
            return Err(FrameError::BadCrc { expected, computed });
        }

        let frame_type = FrameType::from_byte(raw[3]).ok_or(FrameError::BadType(raw[3]))?;

        Ok(Frame {
            frame_type,
            msg_id: u16::from_be_bytes([raw[6], raw[7]]),
            seq: u16::from_be_bytes([raw[8], raw[9]]),
            total: u16::from_be_bytes([raw[10], raw[11]]),
            payload: Bytes::copy_from_slice(&raw[HEADER_LEN..body_end]),
        })
    }

    /// Total encoded size of this frame.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len() + CRC_LEN
    }
}
