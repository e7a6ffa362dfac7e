use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Loss probabilities run when the caller does not name any.
pub const DEFAULT_LOSS_RATES: [f64; 3] = [0.001, 0.01, 0.02];

/// Longest run accepted, in RTT ticks. Every tick keeps one trace sample.
pub const MAX_TICKS: u64 = 100_000_000;

/// Parameters of a single Reno run. Times are in seconds, window sizes in MSS units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub rtt: f64,
    pub sim_time: f64,
    pub mss: f64,
    pub initial_cwnd: f64,
    pub initial_ssthresh: f64,
    pub loss_rate: f64,
    /// Upper clamp applied to cwnd after every tick.
    pub cwnd_cap: f64,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rtt: 0.05,
            sim_time: 20.0,
            mss: 1.0,
            initial_cwnd: 1.0,
            initial_ssthresh: 64.0,
            loss_rate: 0.0,
            cwnd_cap: 1000.0,
            seed: 0,
        }
    }
}

impl SimConfig {
    /// Copy of this config with a different loss probability.
    pub fn with_loss_rate(&self, loss_rate: f64) -> Self {
        Self {
            loss_rate,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("rtt", self.rtt),
            ("sim_time", self.sim_time),
            ("mss", self.mss),
            ("initial_cwnd", self.initial_cwnd),
            ("initial_ssthresh", self.initial_ssthresh),
            ("loss_rate", self.loss_rate),
            ("cwnd_cap", self.cwnd_cap),
        ];
        if let Some(&(field, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite { field });
        }

        if self.rtt <= 0.0 {
            return Err(ConfigError::NonPositiveRtt(self.rtt));
        }
        if self.sim_time <= 0.0 {
            return Err(ConfigError::NonPositiveSimTime(self.sim_time));
        }
        if self.mss <= 0.0 {
            return Err(ConfigError::NonPositiveMss(self.mss));
        }
        if !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(ConfigError::LossRateOutOfRange(self.loss_rate));
        }
        if self.initial_cwnd <= 0.0 {
            return Err(ConfigError::NonPositiveInitialCwnd(self.initial_cwnd));
        }
        if self.initial_ssthresh <= 0.0 {
            return Err(ConfigError::NonPositiveInitialSsthresh(
                self.initial_ssthresh,
            ));
        }
        if self.cwnd_cap < self.initial_cwnd {
            return Err(ConfigError::CapBelowInitialCwnd {
                cap: self.cwnd_cap,
                initial: self.initial_cwnd,
            });
        }
        let ticks = self.tick_ratio();
        if ticks > MAX_TICKS as f64 {
            return Err(ConfigError::TooManyTicks {
                ticks,
                max: MAX_TICKS,
            });
        }
        Ok(())
    }

    /// Number of RTT ticks in a run: ceil(sim_time / rtt).
    ///
    /// Quotients within rounding noise of an integer are snapped to it, so a
    /// 1 s run at 50 ms RTT is 20 ticks rather than 21.
    pub fn tick_count(&self) -> u64 {
        self.tick_ratio().min(MAX_TICKS as f64) as u64
    }

    fn tick_ratio(&self) -> f64 {
        let ratio = self.sim_time / self.rtt;
        let nearest = ratio.round();
        let ticks = if (ratio - nearest).abs() <= 4.0 * f64::EPSILON * nearest.max(1.0) {
            nearest
        } else {
            ratio.ceil()
        };
        ticks.max(1.0)
    }
}
