//! # Run Orchestrator
//!
//! Wires the lossy channels, a receiver half, and a sender half to a PHY
//! transducer and drives one message to completion (or budget
//! exhaustion), producing a [`RunResult`].
//!
//! Control flow is single-threaded and cooperative: the sender step and
//! the receiver pump alternate under a virtual clock. Waiting for an ACK
//! never sleeps; time jumps to the next scheduled channel delivery, or
//! just past the deadline when nothing is in flight. Runs are therefore
//! deterministic in every field, and fast enough for large seed grids.

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::channel::{ChannelParams, LossyChannel};
use crate::frag::{fragment, FragmentError};
use crate::phy::{armor, dearmor, Transducer};
use crate::receiver::{GbnReceiver, SnwReceiver};
use crate::sender::{GbnSender, SnwSender};
use crate::stats::{LinkCounters, RunResult};
use crate::wire::{Frame, FrameError, FrameType};

// ─── Parameters ─────────────────────────────────────────────────────────────

/// Which ARQ discipline drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArqMode {
    StopAndWait,
    GoBackN,
}

/// Everything one `run_once` needs besides the payload and the PHY.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub mode: ArqMode,
    /// Logical message identifier carried by every frame.
    pub msg_id: u16,
    /// Fragment size in bytes.
    pub max_payload: usize,
    /// ACK wait per frame (Stop-and-Wait) or per window (Go-Back-N).
    pub timeout_ms: u64,
    /// Per-seq (Stop-and-Wait) / per-base (Go-Back-N) retry ceiling.
    pub max_retries: u32,
    /// Go-Back-N window size; must be at least 1.
    pub window: usize,
    /// PRNG seed; identical parameters and seed reproduce the run exactly.
    pub seed: u64,
    /// Impairment of the DATA direction.
    pub data: ChannelParams,
    /// Impairment of the ACK direction.
    pub ack: ChannelParams,
    /// Track modem on-air time and synthetic virtual-time goodput.
    pub account_phy_time: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        RunParams {
            mode: ArqMode::StopAndWait,
            msg_id: 1,
            max_payload: 32,
            timeout_ms: 50,
            max_retries: 50,
            window: 4,
            seed: 1,
            data: ChannelParams::default(),
            ack: ChannelParams::default(),
            account_phy_time: false,
        }
    }
}

/// Fatal argument-level failures. Protocol-level trouble (loss,
/// corruption, budget exhaustion) never surfaces here; it is counted
/// into the [`RunResult`] instead.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error(transparent)]
    Fragment(#[from] FragmentError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

// ─── Harness ────────────────────────────────────────────────────────────────

/// Shared plumbing for one run: channels, PHY handles, the seeded RNG,
/// and the virtual clock.
struct Harness<'a, T: Transducer> {
    phy: &'a mut T,
    rx_data: T::Rx,
    rx_ack: T::Rx,
    data_ch: LossyChannel,
    ack_ch: LossyChannel,
    rng: StdRng,
    now_ms: u64,
    timeout_ms: u64,
    msg_id: u16,
    phy_samples: u64,
    counters: LinkCounters,
}

impl<'a, T: Transducer> Harness<'a, T> {
    fn new(params: &RunParams, phy: &'a mut T) -> Self {
        let rx_data = phy.init_rx();
        let rx_ack = phy.init_rx();
        Harness {
            phy,
            rx_data,
            rx_ack,
            data_ch: LossyChannel::new(params.data),
            ack_ch: LossyChannel::new(params.ack),
            rng: StdRng::seed_from_u64(params.seed),
            now_ms: 0,
            timeout_ms: params.timeout_ms,
            msg_id: params.msg_id,
            phy_samples: 0,
            counters: LinkCounters::default(),
        }
    }

    /// Offer one encoded DATA frame to the data channel via the PHY.
    fn send_data(&mut self, raw_frame: &Bytes) {
        self.counters.data_sent += 1;
        let text = armor(raw_frame);
        match self.phy.encode(&text) {
            Ok(samples) => {
                self.phy_samples += self.phy.sample_count(&samples) as u64;
                if !self.data_ch.send(self.now_ms, samples, &mut self.rng) {
                    self.counters.data_dropped += 1;
                }
            }
            Err(_) => {
                // The modem failed to modulate: the transmission is as good
                // as undecodable on the far side.
                self.counters.crc_fail_total += 1;
            }
        }
    }

    /// Offer one ACK frame to the ack channel via the PHY.
    fn send_ack(&mut self, ack: &Frame) -> Result<(), LinkError> {
        self.counters.ack_sent += 1;
        let raw = ack.encode()?;
        let text = armor(&raw);
        match self.phy.encode(&text) {
            Ok(samples) => {
                self.phy_samples += self.phy.sample_count(&samples) as u64;
                if !self.ack_ch.send(self.now_ms, samples, &mut self.rng) {
                    self.counters.ack_dropped += 1;
                }
            }
            Err(_) => {
                self.counters.crc_fail_total += 1;
            }
        }
        Ok(())
    }

    /// Deliver everything due on the data channel to the receiver and send
    /// whatever ACKs it emits.
    fn pump(
        &mut self,
        on_data: &mut impl FnMut(&Frame) -> Option<Frame>,
    ) -> Result<(), LinkError> {
        for samples in self.data_ch.drain(self.now_ms) {
            let Some(text) = self.phy.decode(&mut self.rx_data, &samples) else {
                self.counters.crc_fail_total += 1;
                continue;
            };
            let raw = match dearmor(&text) {
                Ok(raw) => raw,
                Err(_) => {
                    self.counters.crc_fail_total += 1;
                    continue;
                }
            };
            let frame = match Frame::decode(&raw) {
                Ok(frame) => frame,
                Err(_) => {
                    self.counters.crc_fail_total += 1;
                    continue;
                }
            };
            if let Some(ack) = on_data(&frame) {
                self.send_ack(&ack)?;
            }
        }
        Ok(())
    }

    /// Read every ACK currently due, returning the `(seq, total)` pairs
    /// that decoded cleanly and belong to this message.
    fn read_acks(&mut self) -> Vec<(u16, u16)> {
        let mut acks = Vec::new();
        for samples in self.ack_ch.drain(self.now_ms) {
            let Some(text) = self.phy.decode(&mut self.rx_ack, &samples) else {
                self.counters.crc_fail_total += 1;
                continue;
            };
            let raw = match dearmor(&text) {
                Ok(raw) => raw,
                Err(_) => {
                    self.counters.crc_fail_total += 1;
                    continue;
                }
            };
            match Frame::decode(&raw) {
                Ok(f) if f.frame_type == FrameType::Ack && f.msg_id == self.msg_id => {
                    acks.push((f.seq, f.total));
                }
                Ok(_) => {}
                Err(_) => self.counters.crc_fail_total += 1,
            }
        }
        acks
    }

    /// Advance the virtual clock to the next channel delivery, or just
    /// past `deadline_ms` when nothing is due before it. Returns `false`
    /// on deadline expiry.
    fn advance(&mut self, deadline_ms: u64) -> bool {
        let next = match (self.data_ch.next_deliverable(), self.ack_ch.next_deliverable()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match next {
            Some(t) if t <= deadline_ms => {
                self.now_ms = self.now_ms.max(t);
                true
            }
            _ => {
                self.now_ms = deadline_ms + 1;
                false
            }
        }
    }

    /// Pump and collect ACKs until the Stop-and-Wait sender advances or
    /// the deadline passes.
    fn wait_for_snw_ack(
        &mut self,
        rx: &mut SnwReceiver,
        tx: &mut SnwSender,
    ) -> Result<bool, LinkError> {
        let want = tx.current_seq();
        let deadline = self.now_ms + self.timeout_ms;
        loop {
            self.pump(&mut |f| rx.on_data(f))?;
            for (seq, total) in self.read_acks() {
                tx.on_ack(seq, total);
            }
            if tx.current_seq() != want {
                return Ok(true);
            }
            if !self.advance(deadline) {
                return Ok(false);
            }
        }
    }

    /// Pump and collect ACKs until the Go-Back-N base advances or the
    /// deadline passes. Cumulative semantics: only the maximum `seq` read
    /// in each drain matters.
    fn wait_for_gbn_progress(
        &mut self,
        rx: &mut GbnReceiver,
        tx: &mut GbnSender,
    ) -> Result<bool, LinkError> {
        let deadline = self.now_ms + self.timeout_ms;
        loop {
            self.pump(&mut |f| rx.on_data(f))?;
            let mut best: Option<u16> = None;
            for (seq, _total) in self.read_acks() {
                best = Some(best.map_or(seq, |b| b.max(seq)));
            }
            if let Some(best) = best {
                if tx.on_cumulative_ack(best) {
                    return Ok(true);
                }
            }
            if !self.advance(deadline) {
                return Ok(false);
            }
        }
    }
}

// ─── run_once ───────────────────────────────────────────────────────────────

/// Transmit `payload` as one message and report what happened.
///
/// `ok` is true iff the receiver reassembled the exact input within the
/// retry/timeout budget. Argument-level problems (zero `max_payload`,
/// zero `window`, oversized fragments) surface as [`LinkError`]; every
/// protocol-level failure is counted and recovered or ends the run with
/// `ok = false`.
pub fn run_once<T: Transducer>(
    payload: &Bytes,
    params: &RunParams,
    phy: &mut T,
) -> Result<RunResult, LinkError> {
    if params.mode == ArqMode::GoBackN && params.window == 0 {
        return Err(LinkError::InvalidArg("window must be at least 1".into()));
    }

    let frames = fragment(payload, params.msg_id, params.max_payload)?;
    let raw_frames = frames
        .iter()
        .map(Frame::encode)
        .collect::<Result<Vec<_>, _>>()?;

    let mut harness = Harness::new(params, phy);
    match params.mode {
        ArqMode::StopAndWait => run_snw(&mut harness, &raw_frames, payload, params),
        ArqMode::GoBackN => run_gbn(&mut harness, &raw_frames, payload, params),
    }
}

fn run_snw<T: Transducer>(
    h: &mut Harness<'_, T>,
    raw_frames: &[Bytes],
    payload: &Bytes,
    params: &RunParams,
) -> Result<RunResult, LinkError> {
    let mut rx = SnwReceiver::new(params.msg_id);
    let mut tx = SnwSender::new(raw_frames.len(), params.max_retries);
    let mut exhausted = false;

    while let Some(seq) = tx.current_seq() {
        h.send_data(&raw_frames[seq as usize]);
        if !h.wait_for_snw_ack(&mut rx, &mut tx)? {
            match tx.on_timeout() {
                Ok(()) => trace!(seq, retries = tx.retries_total(), "ack timeout, retransmitting"),
                Err(err) => {
                    debug!(%err, "stop-and-wait run out of budget");
                    exhausted = true;
                    break;
                }
            }
        }
    }

    // Late duplicates may still be in flight; answer them so the channel
    // drains cleanly.
    h.pump(&mut |f| rx.on_data(f))?;

    let ok = !exhausted && rx.assembled().map(|b| b == payload).unwrap_or(false);
    Ok(finalize(h, ok, payload.len(), raw_frames.len(), tx.retries_total(), 0, params))
}

fn run_gbn<T: Transducer>(
    h: &mut Harness<'_, T>,
    raw_frames: &[Bytes],
    payload: &Bytes,
    params: &RunParams,
) -> Result<RunResult, LinkError> {
    let mut rx = GbnReceiver::new(params.msg_id);
    let mut tx = GbnSender::new(raw_frames.len(), params.window, params.max_retries);
    let mut exhausted = false;

    while !tx.is_done() {
        for seq in tx.fill_window() {
            h.send_data(&raw_frames[seq]);
        }
        if !h.wait_for_gbn_progress(&mut rx, &mut tx)? {
            match tx.on_timeout() {
                Ok(()) => trace!(
                    base = tx.base(),
                    timeouts = tx.timeouts_total(),
                    "window timeout, going back to base"
                ),
                Err(err) => {
                    debug!(%err, "go-back-n run out of budget");
                    exhausted = true;
                    break;
                }
            }
        }
    }

    h.pump(&mut |f| rx.on_data(f))?;

    let ok = !exhausted && rx.assembled().map(|b| b == *payload).unwrap_or(false);
    Ok(finalize(h, ok, payload.len(), raw_frames.len(), 0, tx.timeouts_total(), params))
}

fn finalize<T: Transducer>(
    h: &mut Harness<'_, T>,
    ok: bool,
    payload_len: usize,
    frames_total: usize,
    retries_total: u64,
    timeouts_total: u64,
    params: &RunParams,
) -> RunResult {
    let wall_seconds = (h.now_ms as f64 / 1000.0).max(0.001);
    let goodput = if ok { payload_len as f64 / wall_seconds } else { 0.0 };

    let (phy_seconds, virtual_seconds, virtual_goodput) = if params.account_phy_time {
        let phy_s = h.phy_samples as f64 / h.phy.sample_rate() as f64;
        let recoveries = retries_total + timeouts_total;
        let virt_s = phy_s + recoveries as f64 * (params.timeout_ms as f64 / 1000.0);
        let virt_goodput = if ok {
            payload_len as f64 / virt_s.max(1e-9)
        } else {
            0.0
        };
        (Some(phy_s), Some(virt_s), Some(virt_goodput))
    } else {
        (None, None, None)
    };

    debug!(
        ok,
        mode = ?params.mode,
        frames_total,
        retries_total,
        timeouts_total,
        data_sent = h.counters.data_sent,
        crc_fail = h.counters.crc_fail_total,
        "run complete"
    );

    RunResult {
        ok,
        wall_seconds,
        goodput_bytes_per_sec: goodput,
        frames_total,
        retries_total,
        timeouts_total,
        crc_fail_total: h.counters.crc_fail_total,
        data_sent: h.counters.data_sent,
        data_dropped: h.counters.data_dropped,
        ack_sent: h.counters.ack_sent,
        ack_dropped: h.counters.ack_dropped,
        phy_seconds,
        virtual_seconds,
        virtual_goodput_bytes_per_sec: virtual_goodput,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::IdentityTransducer;

    #[test]
    fn zero_max_payload_is_fatal() {
        let mut phy = IdentityTransducer::new();
        let params = RunParams {
            max_payload: 0,
            ..Default::default()
        };
        let err = run_once(&Bytes::from_static(b"x"), &params, &mut phy).unwrap_err();
        assert!(matches!(
            err,
            LinkError::Fragment(FragmentError::InvalidMaxPayload)
        ));
    }

    #[test]
    fn zero_window_is_fatal_for_gbn() {
        let mut phy = IdentityTransducer::new();
        let params = RunParams {
            mode: ArqMode::GoBackN,
            window: 0,
            ..Default::default()
        };
        let err = run_once(&Bytes::from_static(b"x"), &params, &mut phy).unwrap_err();
        assert!(matches!(err, LinkError::InvalidArg(_)));
    }

    #[test]
    fn zero_window_is_tolerated_for_snw() {
        let mut phy = IdentityTransducer::new();
        let params = RunParams {
            window: 0,
            ..Default::default()
        };
        let result = run_once(&Bytes::from_static(b"x"), &params, &mut phy).unwrap();
        assert!(result.ok);
    }

    #[test]
    fn phy_accounting_off_by_default() {
        let mut phy = IdentityTransducer::new();
        let result = run_once(&Bytes::from_static(b"hi"), &RunParams::default(), &mut phy).unwrap();
        assert!(result.phy_seconds.is_none());
        assert!(result.virtual_seconds.is_none());
    }

    #[test]
    fn phy_accounting_tracks_on_air_time() {
        let mut phy = IdentityTransducer::new();
        let params = RunParams {
            account_phy_time: true,
            ..Default::default()
        };
        let result = run_once(&Bytes::from_static(b"hello"), &params, &mut phy).unwrap();
        let phy_s = result.phy_seconds.unwrap();
        // One data + one ack transmission of armored frames.
        assert!(phy_s > 0.0);
        assert_eq!(result.virtual_seconds.unwrap(), phy_s);
        assert!(result.virtual_goodput_bytes_per_sec.unwrap() > 0.0);
    }
}
