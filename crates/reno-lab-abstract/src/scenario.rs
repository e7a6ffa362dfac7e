use crate::config::{DEFAULT_LOSS_RATES, SimConfig};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: SimConfigOverride,
    /// Loss probabilities to run, each as an independent scenario.
    pub loss_rates: Option<Vec<f64>>,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScenario {
    pub fn loss_rates(&self) -> Vec<f64> {
        self.loss_rates
            .clone()
            .unwrap_or_else(|| DEFAULT_LOSS_RATES.to_vec())
    }

    /// Base config for this scenario: defaults with the file's overrides applied.
    pub fn base_config(&self) -> SimConfig {
        let mut config = SimConfig::default();
        self.config.apply_to(&mut config);
        config
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SimConfigOverride {
    pub rtt: Option<f64>,
    pub sim_time: Option<f64>,
    pub mss: Option<f64>,
    pub initial_cwnd: Option<f64>,
    pub initial_ssthresh: Option<f64>,
    pub cwnd_cap: Option<f64>,
    pub seed: Option<u64>,
}

impl SimConfigOverride {
    /// Layer `top` over `self`: fields set in `top` win.
    pub fn merged_with(&self, top: &SimConfigOverride) -> SimConfigOverride {
        SimConfigOverride {
            rtt: top.rtt.or(self.rtt),
            sim_time: top.sim_time.or(self.sim_time),
            mss: top.mss.or(self.mss),
            initial_cwnd: top.initial_cwnd.or(self.initial_cwnd),
            initial_ssthresh: top.initial_ssthresh.or(self.initial_ssthresh),
            cwnd_cap: top.cwnd_cap.or(self.cwnd_cap),
            seed: top.seed.or(self.seed),
        }
    }

    pub fn apply_to(&self, config: &mut SimConfig) {
        if let Some(v) = self.rtt {
            config.rtt = v;
        }
        if let Some(v) = self.sim_time {
            config.sim_time = v;
        }
        if let Some(v) = self.mss {
            config.mss = v;
        }
        if let Some(v) = self.initial_cwnd {
            config.initial_cwnd = v;
        }
        if let Some(v) = self.initial_ssthresh {
            config.initial_ssthresh = v;
        }
        if let Some(v) = self.cwnd_cap {
            config.cwnd_cap = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
    }
}

/// Checks applied to every run of a scenario.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// The trace holds exactly this many samples
    TraceLength { ticks: u64 },
    /// The first recorded cwnd equals this value
    InitialCwnd { value: f64 },
    /// The largest recorded cwnd is within range
    CwndMax { min: f64, max: Option<f64> },
    /// No recorded cwnd drops below `min`
    CwndFloor { min: f64 },
    /// No recorded ssthresh drops below `min`
    SsthreshFloor { min: f64 },
    /// Average throughput (MSS/s) is within range
    ThroughputRange { min: f64, max: Option<f64> },
    /// Number of ticks that saw at least one loss is within range
    LossTicks { min: u64, max: Option<u64> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_only_touches_named_fields() {
        let mut config = SimConfig::default();
        let overrides = SimConfigOverride {
            rtt: Some(0.1),
            seed: Some(9),
            ..Default::default()
        };
        overrides.apply_to(&mut config);
        assert_eq!(config.rtt, 0.1);
        assert_eq!(config.seed, 9);
        assert_eq!(config.sim_time, SimConfig::default().sim_time);
        assert_eq!(config.cwnd_cap, SimConfig::default().cwnd_cap);
    }

    #[test]
    fn merged_override_prefers_top_layer() {
        let file = SimConfigOverride {
            rtt: Some(0.1),
            sim_time: Some(5.0),
            ..Default::default()
        };
        let cli = SimConfigOverride {
            rtt: Some(0.02),
            seed: Some(3),
            ..Default::default()
        };
        let merged = file.merged_with(&cli);
        assert_eq!(merged.rtt, Some(0.02));
        assert_eq!(merged.sim_time, Some(5.0));
        assert_eq!(merged.seed, Some(3));
        assert_eq!(merged.mss, None);
    }

    #[test]
    fn missing_loss_rates_fall_back_to_defaults() {
        let scenario = TestScenario {
            name: "defaults".into(),
            description: String::new(),
            config: SimConfigOverride::default(),
            loss_rates: None,
            assertions: Vec::new(),
        };
        assert_eq!(scenario.loss_rates(), DEFAULT_LOSS_RATES.to_vec());
        assert_eq!(scenario.base_config(), SimConfig::default());
    }
}
