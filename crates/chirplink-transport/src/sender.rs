//! # Sender State Machines
//!
//! Pure logic — no I/O, no clocks. The orchestrator owns the channels and
//! the timeout; the machines here decide *what* to (re)transmit and when
//! the retry budget is spent.
//!
//! - **Stop-and-Wait**: one frame in flight, per-sequence retry ceiling.
//! - **Go-Back-N**: a fixed window of unacknowledged frames; on timeout
//!   every unacknowledged frame from `base` is retransmitted.

use std::ops::Range;
use thiserror::Error;

/// Protocol-progress exhaustion. Ends the run with `ok = false`; counters
/// survive in the [`crate::stats::RunResult`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArqError {
    #[error("too many retries on seq {seq} ({retries})")]
    TooManyRetries { seq: u16, retries: u32 },
    #[error("too many timeouts at base {base} ({timeouts})")]
    TooManyTimeouts { base: u16, timeouts: u32 },
}

// ─── Stop-and-Wait ──────────────────────────────────────────────────────────

/// Stop-and-Wait sender half: walks the fragment sequence one frame at a
/// time, retransmitting the current frame on every timeout.
#[derive(Debug)]
pub struct SnwSender {
    total: usize,
    current: usize,
    retries_on_current: u32,
    max_retries: u32,
    retries_total: u64,
}

impl SnwSender {
    pub fn new(total: usize, max_retries: u32) -> Self {
        SnwSender {
            total,
            current: 0,
            retries_on_current: 0,
            max_retries,
            retries_total: 0,
        }
    }

    /// Sequence currently awaiting acknowledgement, `None` when done.
    pub fn current_seq(&self) -> Option<u16> {
        (self.current < self.total).then_some(self.current as u16)
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.total
    }

    /// Feed one received ACK. Advances to the next fragment when the ACK
    /// matches the in-flight `(seq, total)` pair; anything else (late or
    /// foreign ACKs) is ignored. Returns whether progress was made.
    pub fn on_ack(&mut self, seq: u16, total: u16) -> bool {
        match self.current_seq() {
            Some(cur) if seq == cur && total as usize == self.total => {
                self.current += 1;
                self.retries_on_current = 0;
                true
            }
            _ => false,
        }
    }

    /// Note an ACK-wait timeout for the in-flight frame.
    pub fn on_timeout(&mut self) -> Result<(), ArqError> {
        self.retries_total += 1;
        self.retries_on_current += 1;
        if self.retries_on_current >= self.max_retries {
            return Err(ArqError::TooManyRetries {
                seq: self.current as u16,
                retries: self.retries_on_current,
            });
        }
        Ok(())
    }

    /// Retransmissions across all fragments so far.
    pub fn retries_total(&self) -> u64 {
        self.retries_total
    }
}

// ─── Go-Back-N ──────────────────────────────────────────────────────────────

/// Go-Back-N sender half.
///
/// Invariants: `base <= next_to_send <= min(base + window, total)`, and
/// `base` never decreases (cumulative ACKs are monotone).
#[derive(Debug)]
pub struct GbnSender {
    total: usize,
    window: usize,
    base: usize,
    next_to_send: usize,
    last_cum_ack: Option<u16>,
    retries_at_base: u32,
    max_retries: u32,
    timeouts_total: u64,
}

impl GbnSender {
    pub fn new(total: usize, window: usize, max_retries: u32) -> Self {
        GbnSender {
            total,
            window,
            base: 0,
            next_to_send: 0,
            last_cum_ack: None,
            retries_at_base: 0,
            max_retries,
            timeouts_total: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.base >= self.total
    }

    /// Sequences to transmit now to fill the window. Advances
    /// `next_to_send` past them; the range is empty when the window is
    /// already full.
    pub fn fill_window(&mut self) -> Range<usize> {
        let hi = self.total.min(self.base + self.window);
        let range = self.next_to_send..hi;
        if hi > self.next_to_send {
            self.next_to_send = hi;
        }
        range
    }

    /// Feed the best (maximum-seq) cumulative ACK read from one drain.
    /// Returns whether the window base advanced.
    pub fn on_cumulative_ack(&mut self, seq: u16) -> bool {
        if let Some(prev) = self.last_cum_ack {
            if seq < prev {
                // Late ACK from an earlier window position, not a regression.
                return false;
            }
        }
        self.last_cum_ack = Some(seq);

        let new_base = self.total.min(seq as usize + 1);
        if new_base <= self.base {
            return false;
        }
        self.base = new_base;
        self.retries_at_base = 0;
        if self.next_to_send < self.base {
            self.next_to_send = self.base;
        }
        true
    }

    /// Note a window timeout: no ACK progress within the deadline. On
    /// success the machine has rewound `next_to_send` to `base`, so the
    /// next [`Self::fill_window`] retransmits the whole window.
    pub fn on_timeout(&mut self) -> Result<(), ArqError> {
        self.timeouts_total += 1;
        self.retries_at_base += 1;
        if self.retries_at_base >= self.max_retries {
            return Err(ArqError::TooManyTimeouts {
                base: self.base as u16,
                timeouts: self.retries_at_base,
            });
        }
        self.next_to_send = self.base;
        Ok(())
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn next_to_send(&self) -> usize {
        self.next_to_send
    }

    pub fn last_cum_ack(&self) -> Option<u16> {
        self.last_cum_ack
    }

    /// Window timeouts across the whole run so far.
    pub fn timeouts_total(&self) -> u64 {
        self.timeouts_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Stop-and-Wait ──────────────────────────────────────────────────

    #[test]
    fn snw_walks_sequences_in_order() {
        let mut tx = SnwSender::new(3, 10);
        assert_eq!(tx.current_seq(), Some(0));
        assert!(tx.on_ack(0, 3));
        assert_eq!(tx.current_seq(), Some(1));
        assert!(tx.on_ack(1, 3));
        assert!(tx.on_ack(2, 3));
        assert!(tx.is_done());
        assert_eq!(tx.current_seq(), None);
    }

    #[test]
    fn snw_ignores_mismatched_acks() {
        let mut tx = SnwSender::new(3, 10);
        assert!(!tx.on_ack(1, 3)); // wrong seq
        assert!(!tx.on_ack(0, 5)); // wrong total
        assert_eq!(tx.current_seq(), Some(0));
    }

    #[test]
    fn snw_ignores_duplicate_ack_after_advance() {
        let mut tx = SnwSender::new(2, 10);
        assert!(tx.on_ack(0, 2));
        assert!(!tx.on_ack(0, 2));
        assert_eq!(tx.current_seq(), Some(1));
    }

    #[test]
    fn snw_counts_retries_and_exhausts() {
        let mut tx = SnwSender::new(1, 3);
        assert!(tx.on_timeout().is_ok());
        assert!(tx.on_timeout().is_ok());
        assert_eq!(
            tx.on_timeout(),
            Err(ArqError::TooManyRetries { seq: 0, retries: 3 })
        );
        assert_eq!(tx.retries_total(), 3);
    }

    #[test]
    fn snw_retry_count_resets_per_sequence() {
        let mut tx = SnwSender::new(2, 2);
        assert!(tx.on_timeout().is_ok());
        assert!(tx.on_ack(0, 2));
        // Fresh budget on the next fragment.
        assert!(tx.on_timeout().is_ok());
        assert_eq!(tx.retries_total(), 2);
    }

    // ─── Go-Back-N ──────────────────────────────────────────────────────

    #[test]
    fn gbn_fill_window_caps_at_window_and_total() {
        let mut tx = GbnSender::new(5, 4, 10);
        assert_eq!(tx.fill_window(), 0..4);
        assert_eq!(tx.fill_window(), 4..4); // window full

        let mut small = GbnSender::new(2, 4, 10);
        assert_eq!(small.fill_window(), 0..2); // capped by total
    }

    #[test]
    fn gbn_ack_slides_window_forward() {
        let mut tx = GbnSender::new(5, 2, 10);
        assert_eq!(tx.fill_window(), 0..2);

        assert!(tx.on_cumulative_ack(0));
        assert_eq!(tx.base(), 1);
        assert_eq!(tx.fill_window(), 2..3);

        assert!(tx.on_cumulative_ack(2));
        assert_eq!(tx.base(), 3);
        assert_eq!(tx.fill_window(), 3..5);
    }

    #[test]
    fn gbn_base_never_decreases() {
        let mut tx = GbnSender::new(8, 4, 10);
        tx.fill_window();
        assert!(tx.on_cumulative_ack(3));
        assert_eq!(tx.base(), 4);

        // A late cumulative ACK for an earlier position is ignored.
        assert!(!tx.on_cumulative_ack(1));
        assert_eq!(tx.base(), 4);
        assert_eq!(tx.last_cum_ack(), Some(3));
    }

    #[test]
    fn gbn_duplicate_cumulative_ack_is_no_progress() {
        let mut tx = GbnSender::new(4, 4, 10);
        tx.fill_window();
        assert!(tx.on_cumulative_ack(1));
        assert!(!tx.on_cumulative_ack(1));
        assert_eq!(tx.base(), 2);
    }

    #[test]
    fn gbn_first_ack_zero_advances_base_to_one() {
        let mut tx = GbnSender::new(4, 4, 10);
        tx.fill_window();
        assert_eq!(tx.last_cum_ack(), None);
        assert!(tx.on_cumulative_ack(0));
        assert_eq!(tx.base(), 1);
    }

    #[test]
    fn gbn_timeout_rewinds_to_base() {
        let mut tx = GbnSender::new(6, 3, 10);
        assert_eq!(tx.fill_window(), 0..3);
        assert!(tx.on_cumulative_ack(0));
        assert_eq!(tx.fill_window(), 3..4);

        assert!(tx.on_timeout().is_ok());
        assert_eq!(tx.next_to_send(), tx.base());
        // Whole window goes out again.
        assert_eq!(tx.fill_window(), 1..4);
    }

    #[test]
    fn gbn_timeouts_exhaust_at_max_retries() {
        let mut tx = GbnSender::new(4, 2, 2);
        tx.fill_window();
        assert!(tx.on_timeout().is_ok());
        assert_eq!(
            tx.on_timeout(),
            Err(ArqError::TooManyTimeouts { base: 0, timeouts: 2 })
        );
        assert_eq!(tx.timeouts_total(), 2);
    }

    #[test]
    fn gbn_progress_resets_retry_budget() {
        let mut tx = GbnSender::new(4, 2, 2);
        tx.fill_window();
        assert!(tx.on_timeout().is_ok());
        assert!(tx.on_cumulative_ack(0));
        // Budget is per-base; a fresh base starts clean.
        assert!(tx.on_timeout().is_ok());
        assert_eq!(tx.timeouts_total(), 2);
    }

    #[test]
    fn gbn_ack_of_final_fragment_completes() {
        let mut tx = GbnSender::new(3, 4, 10);
        tx.fill_window();
        assert!(tx.on_cumulative_ack(2));
        assert!(tx.is_done());
        assert_eq!(tx.base(), 3);
    }

    #[test]
    fn gbn_window_invariant_holds_through_churn() {
        let mut tx = GbnSender::new(10, 3, 10);
        for step in 0u16..8 {
            tx.fill_window();
            assert!(tx.base() <= tx.next_to_send());
            assert!(tx.next_to_send() <= (tx.base() + 3).min(10));
            if step % 2 == 0 {
                tx.on_cumulative_ack(step);
            } else {
                let _ = tx.on_timeout();
            }
        }
    }
}
