use reno_lab_abstract::SimConfig;
use serde::Serialize;

/// Window state in effect during one RTT, recorded before that RTT's losses are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSample {
    pub time: f64,
    pub cwnd: f64,
    pub ssthresh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub config: SimConfig,
    pub ticks: u64,
    pub samples: Vec<WindowSample>,
    /// Acknowledged data in MSS units.
    pub bytes_acked: f64,
    /// `bytes_acked / sim_time`, in MSS per second.
    pub throughput: f64,
    pub loss_ticks: u64,
}

impl SimulationReport {
    pub fn cwnd_series(&self) -> Vec<(f64, f64)> {
        self.samples.iter().map(|s| (s.time, s.cwnd)).collect()
    }

    pub fn ssthresh_series(&self) -> Vec<(f64, f64)> {
        self.samples.iter().map(|s| (s.time, s.ssthresh)).collect()
    }

    pub fn max_cwnd(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.cwnd).reduce(f64::max)
    }

    pub fn min_cwnd(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.cwnd).reduce(f64::min)
    }

    pub fn min_ssthresh(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.ssthresh).reduce(f64::min)
    }
}
