//! # Lossy Channel Model
//!
//! A unidirectional unreliable carrier with per-packet drop and
//! corruption sampling and a fixed one-way delay in virtual milliseconds.
//! Deliveries are scheduled, not slept: the orchestrator drains the
//! queue by virtual time.
//!
//! All randomness comes from a caller-supplied seeded RNG so that a run
//! is reproducible from its seed alone.

use bytes::{Bytes, BytesMut};
use rand::Rng;
use rand::RngExt as _;
use std::collections::VecDeque;

/// Impairment parameters for one channel direction. The default is a
/// perfect channel: no loss, no corruption, immediate delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelParams {
    /// Probability that a packet is dropped entirely.
    pub drop_prob: f64,
    /// Probability that one bit of a surviving packet is flipped.
    pub corrupt_prob: f64,
    /// Fixed one-way delay in virtual milliseconds.
    pub delay_ms: u64,
}

#[derive(Debug, Clone)]
struct Scheduled {
    deliver_at_ms: u64,
    data: Bytes,
}

/// A unidirectional lossy carrier.
#[derive(Debug)]
pub struct LossyChannel {
    params: ChannelParams,
    queue: VecDeque<Scheduled>,
}

impl LossyChannel {
    pub fn new(params: ChannelParams) -> Self {
        LossyChannel {
            params,
            queue: VecDeque::new(),
        }
    }

    /// Offer a packet to the channel at `now_ms`.
    ///
    /// Samples the drop probability first; a dropped packet is gone
    /// without trace and `false` is returned. A surviving packet may have
    /// one bit flipped at a uniformly random byte before being scheduled
    /// for delivery at `now_ms + delay_ms`.
    pub fn send(&mut self, now_ms: u64, data: Bytes, rng: &mut impl Rng) -> bool {
        if self.params.drop_prob > 0.0 && rng.random::<f64>() < self.params.drop_prob {
            return false;
        }
        let data = self.maybe_corrupt(data, rng);
        self.queue.push_back(Scheduled {
            deliver_at_ms: now_ms + self.params.delay_ms,
            data,
        });
        true
    }

    fn maybe_corrupt(&self, data: Bytes, rng: &mut impl Rng) -> Bytes {
        if self.params.corrupt_prob <= 0.0 || rng.random::<f64>() >= self.params.corrupt_prob {
            return data;
        }
        if data.is_empty() {
            return data;
        }
        let mut buf = BytesMut::from(&data[..]);
        let i = rng.random_range(0..buf.len());
        buf[i] ^= 0x01;
        buf.freeze()
    }

    /// Remove and return every packet due at or before `now_ms`, in
    /// delivery order (enqueue order breaks ties).
    pub fn drain(&mut self, now_ms: u64) -> Vec<Bytes> {
        let mut ready = Vec::new();
        let mut rest = VecDeque::with_capacity(self.queue.len());
        for item in self.queue.drain(..) {
            if item.deliver_at_ms <= now_ms {
                ready.push(item.data);
            } else {
                rest.push_back(item);
            }
        }
        self.queue = rest;
        ready
    }

    /// Earliest pending delivery time, if anything is in flight.
    pub fn next_deliverable(&self) -> Option<u64> {
        self.queue.iter().map(|s| s.deliver_at_ms).min()
    }

    /// Number of packets in flight.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
