//! Batch statistics over run results: nearest-rank percentiles and the
//! per-configuration summary the grid sweeps report.

use chirplink_transport::stats::RunResult;
use serde::Serialize;

/// Nearest-rank percentile on an unsorted slice, `q` in `[0, 1]`.
/// Returns 0.0 for an empty slice.
pub fn pctl(xs: &[f64], q: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if q <= 0.0 {
        return sorted[0];
    }
    if q >= 1.0 {
        return sorted[sorted.len() - 1];
    }
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx]
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

/// Aggregate view of one batch of runs. Latency/goodput/recovery figures
/// are computed over the successful runs only; the failure count shows up
/// in `success_rate`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub runs: usize,
    pub ok_runs: usize,
    pub success_rate: f64,
    pub goodput_avg: f64,
    pub time_p50: f64,
    pub time_p90: f64,
    pub time_max: f64,
    pub retries_avg: f64,
    pub timeouts_avg: f64,
    pub crc_fail_avg: f64,
    /// Mean synthetic elapsed time, when PHY-time accounting was on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_time_avg: Option<f64>,
    /// Mean virtual-time goodput, when PHY-time accounting was on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_goodput_avg: Option<f64>,
}

impl Summary {
    pub fn from_results(results: &[RunResult]) -> Self {
        let ok: Vec<&RunResult> = results.iter().filter(|r| r.ok).collect();
        let runs = results.len();
        let ok_runs = ok.len();
        let success_rate = if runs == 0 {
            0.0
        } else {
            ok_runs as f64 / runs as f64
        };

        let times: Vec<f64> = ok.iter().map(|r| r.wall_seconds).collect();
        let goodputs: Vec<f64> = ok.iter().map(|r| r.goodput_bytes_per_sec).collect();
        let retries: Vec<f64> = ok.iter().map(|r| r.retries_total as f64).collect();
        let timeouts: Vec<f64> = ok.iter().map(|r| r.timeouts_total as f64).collect();
        let crc_fails: Vec<f64> = ok.iter().map(|r| r.crc_fail_total as f64).collect();

        let virt_times: Vec<f64> = ok.iter().filter_map(|r| r.virtual_seconds).collect();
        let virt_goodputs: Vec<f64> = ok
            .iter()
            .filter_map(|r| r.virtual_goodput_bytes_per_sec)
            .collect();
        let has_virtual = !ok.is_empty() && virt_times.len() == ok.len();

        Summary {
            runs,
            ok_runs,
            success_rate,
            goodput_avg: mean(&goodputs),
            time_p50: pctl(&times, 0.50),
            time_p90: pctl(&times, 0.90),
            time_max: times.iter().copied().fold(0.0, f64::max),
            retries_avg: mean(&retries),
            timeouts_avg: mean(&timeouts),
            crc_fail_avg: mean(&crc_fails),
            virtual_time_avg: has_virtual.then(|| mean(&virt_times)),
            virtual_goodput_avg: has_virtual.then(|| mean(&virt_goodputs)),
        }
    }
}
