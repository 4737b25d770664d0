//! # Integration tests: full runs through framing, channels, and PHY
//!
//! Every test drives `run_once` with the identity transducer, so the
//! whole pipeline is exercised (fragmentation, armoring, the PHY hop,
//! channel impairment, frame decode, ACK flow) without any DSP.
//! The virtual clock makes all of it deterministic.

use bytes::Bytes;
use chirplink_transport::channel::ChannelParams;
use chirplink_transport::phy::IdentityTransducer;
use chirplink_transport::runner::{run_once, ArqMode, RunParams};
use chirplink_transport::stats::RunResult;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn payload_130b() -> Bytes {
    Bytes::from(b"hello world! ".repeat(10))
}

fn lossless(mode: ArqMode) -> RunParams {
    RunParams {
        mode,
        ..Default::default()
    }
}

fn lossy(mode: ArqMode, drop_data: f64, drop_ack: f64, seed: u64) -> RunParams {
    RunParams {
        mode,
        data: ChannelParams {
            drop_prob: drop_data,
            ..Default::default()
        },
        ack: ChannelParams {
            drop_prob: drop_ack,
            ..Default::default()
        },
        seed,
        ..Default::default()
    }
}

fn run(payload: &Bytes, params: &RunParams) -> RunResult {
    let mut phy = IdentityTransducer::new();
    run_once(payload, params, &mut phy).expect("run_once should not hit an argument error")
}

// ─── Zero Loss ──────────────────────────────────────────────────────────────

#[test]
fn snw_single_frame_clean_channel() {
    let params = RunParams {
        max_payload: 16,
        ..lossless(ArqMode::StopAndWait)
    };
    let result = run(&Bytes::from_static(b"hello"), &params);

    assert!(result.ok);
    assert_eq!(result.frames_total, 1);
    assert_eq!(result.retries_total, 0);
    assert_eq!(result.data_sent, 1);
    assert_eq!(result.ack_sent, 1);
    assert_eq!(result.data_dropped, 0);
    assert_eq!(result.crc_fail_total, 0);
}

#[test]
fn snw_multi_frame_clean_channel() {
    let params = RunParams {
        max_payload: 16,
        ..lossless(ArqMode::StopAndWait)
    };
    let result = run(&payload_130b(), &params);

    assert!(result.ok);
    assert_eq!(result.frames_total, 9); // ceil(130/16)
    assert_eq!(result.retries_total, 0);
    assert_eq!(result.data_sent, 9);
    assert_eq!(result.ack_sent, 9);
}

#[test]
fn gbn_multi_frame_clean_channel() {
    let params = RunParams {
        max_payload: 16,
        ..lossless(ArqMode::GoBackN)
    };
    let result = run(&payload_130b(), &params);

    assert!(result.ok);
    assert_eq!(result.frames_total, 9);
    assert_eq!(result.timeouts_total, 0);
    assert_eq!(result.data_sent, 9);
}

#[test]
fn empty_payload_travels_as_single_empty_frame() {
    let params = RunParams {
        max_payload: 8,
        ..lossless(ArqMode::StopAndWait)
    };
    let result = run(&Bytes::new(), &params);

    assert!(result.ok);
    assert_eq!(result.frames_total, 1);
    assert_eq!(result.data_sent, 1);
}

#[test]
fn clean_delivery_across_fragment_sizes_and_modes() {
    let payload = payload_130b();
    for mode in [ArqMode::StopAndWait, ArqMode::GoBackN] {
        for max_payload in [1, 7, 16, 64, 200] {
            let params = RunParams {
                max_payload,
                ..lossless(mode)
            };
            let result = run(&payload, &params);
            assert!(result.ok, "mode {mode:?} max_payload {max_payload}");
            assert_eq!(result.retries_total, 0);
            assert_eq!(result.timeouts_total, 0);
            assert_eq!(
                result.frames_total,
                payload.len().div_ceil(max_payload)
            );
        }
    }
}

// ─── Lossy Channels ─────────────────────────────────────────────────────────

#[test]
fn snw_recovers_from_loss() {
    let params = RunParams {
        max_payload: 16,
        max_retries: 30,
        ..lossy(ArqMode::StopAndWait, 0.25, 0.10, 2000)
    };
    let result = run(&payload_130b(), &params);

    assert!(result.ok);
    assert!(result.retries_total > 0, "loss at these rates should cost retries");
    assert!(result.data_sent >= result.frames_total as u64);
    // With zero corruption and zero delay, every retry traces back to a drop.
    assert!(result.data_dropped + result.ack_dropped > 0);
}

#[test]
fn gbn_recovers_from_loss() {
    let params = RunParams {
        max_payload: 32,
        window: 4,
        ..lossy(ArqMode::GoBackN, 0.25, 0.10, 4000)
    };
    let result = run(&payload_130b(), &params);

    assert!(result.ok);
    assert_eq!(result.frames_total, 5); // ceil(130/32)
    assert!(result.data_sent >= 5);
}

#[test]
fn full_data_loss_exhausts_budget() {
    for mode in [ArqMode::StopAndWait, ArqMode::GoBackN] {
        let params = RunParams {
            max_retries: 5,
            ..lossy(mode, 1.0, 0.0, 7)
        };
        let result = run(&payload_130b(), &params);

        assert!(!result.ok, "mode {mode:?}");
        assert_eq!(result.goodput_bytes_per_sec, 0.0);
        assert_eq!(result.data_sent, result.data_dropped);
        // Nothing ever reached the receiver, so nothing was acknowledged.
        assert_eq!(result.ack_sent, 0);
    }
}

#[test]
fn full_ack_loss_exhausts_budget_but_receiver_heard_us() {
    let params = RunParams {
        max_retries: 4,
        ..lossy(ArqMode::StopAndWait, 0.0, 1.0, 7)
    };
    let result = run(&payload_130b(), &params);

    assert!(!result.ok);
    assert!(result.ack_sent > 0);
    assert_eq!(result.ack_sent, result.ack_dropped);
}

#[test]
fn corruption_is_caught_and_retransmission_recovers() {
    let params = RunParams {
        max_payload: 16,
        seed: 42,
        data: ChannelParams {
            corrupt_prob: 0.5,
            ..Default::default()
        },
        ..lossless(ArqMode::StopAndWait)
    };
    let result = run(&payload_130b(), &params);

    assert!(result.ok);
    assert!(result.crc_fail_total > 0, "corrupted frames must be counted");
    assert!(result.retries_total > 0);
    // Corruption is not a channel drop.
    assert_eq!(result.data_dropped, 0);
}

#[test]
fn success_rate_grows_with_retry_budget() {
    let payload = payload_130b();
    let successes = |max_retries: u32| -> usize {
        (0..30)
            .filter(|&i| {
                let params = RunParams {
                    max_payload: 16,
                    max_retries,
                    ..lossy(ArqMode::StopAndWait, 0.25, 0.10, 1000 + i)
                };
                run(&payload, &params).ok
            })
            .count()
    };

    let tight = successes(1);
    let medium = successes(6);
    let generous = successes(30);

    assert!(tight <= medium && medium <= generous);
    assert!(tight < generous, "retry budget must matter under loss");
    assert_eq!(generous, 30, "30 retries should always recover at these rates");
}

// ─── Delay ──────────────────────────────────────────────────────────────────

#[test]
fn gbn_tolerates_round_trip_delay_within_timeout() {
    let params = RunParams {
        mode: ArqMode::GoBackN,
        max_payload: 32,
        timeout_ms: 50,
        data: ChannelParams {
            delay_ms: 20,
            ..Default::default()
        },
        ack: ChannelParams {
            delay_ms: 20,
            ..Default::default()
        },
        ..Default::default()
    };
    let result = run(&payload_130b(), &params);

    assert!(result.ok);
    assert_eq!(result.timeouts_total, 0, "40ms RTT fits a 50ms window timeout");
    assert!(result.wall_seconds >= 0.040);
}

#[test]
fn snw_times_out_when_rtt_exceeds_timeout() {
    let params = RunParams {
        mode: ArqMode::StopAndWait,
        timeout_ms: 30,
        max_retries: 10,
        data: ChannelParams {
            delay_ms: 20,
            ..Default::default()
        },
        ack: ChannelParams {
            delay_ms: 20,
            ..Default::default()
        },
        ..Default::default()
    };
    let result = run(&Bytes::from_static(b"late"), &params);

    // The first ACK always lands after the 30ms deadline, but the
    // retransmission loop still converges: the late ACK is read during a
    // later wait.
    assert!(result.retries_total > 0);
    assert!(result.ok);
}

// ─── Determinism ────────────────────────────────────────────────────────────

#[test]
fn identical_params_reproduce_identical_results() {
    for mode in [ArqMode::StopAndWait, ArqMode::GoBackN] {
        let params = RunParams {
            max_payload: 24,
            data: ChannelParams {
                drop_prob: 0.25,
                corrupt_prob: 0.03,
                delay_ms: 20,
            },
            ack: ChannelParams {
                drop_prob: 0.10,
                corrupt_prob: 0.01,
                delay_ms: 20,
            },
            seed: 123,
            account_phy_time: true,
            ..lossless(mode)
        };
        let a = run(&payload_130b(), &params);
        let b = run(&payload_130b(), &params);
        assert_eq!(a, b, "mode {mode:?}");
    }
}

#[test]
fn different_seeds_usually_diverge() {
    let base = RunParams {
        max_payload: 16,
        ..lossy(ArqMode::StopAndWait, 0.25, 0.10, 0)
    };
    let payload = payload_130b();

    let reference = run(&payload, &RunParams { seed: 1, ..base.clone() });
    let divergent = (2..12).any(|seed| {
        run(&payload, &RunParams { seed, ..base.clone() }) != reference
    });
    assert!(divergent, "ten different seeds should not all replay the same run");
}
