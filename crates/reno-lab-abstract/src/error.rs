use thiserror::Error;

/// Reasons a configuration is rejected before any simulation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("rtt must be positive, got {0}")]
    NonPositiveRtt(f64),
    #[error("simulated time must be positive, got {0}")]
    NonPositiveSimTime(f64),
    #[error("segment size (mss) must be positive, got {0}")]
    NonPositiveMss(f64),
    #[error("loss probability must lie in [0, 1], got {0}")]
    LossRateOutOfRange(f64),
    #[error("initial cwnd must be positive, got {0}")]
    NonPositiveInitialCwnd(f64),
    #[error("initial ssthresh must be positive, got {0}")]
    NonPositiveInitialSsthresh(f64),
    #[error("cwnd cap {cap} is below the initial cwnd {initial}")]
    CapBelowInitialCwnd { cap: f64, initial: f64 },
    #[error("run would take {ticks} ticks, more than the limit of {max}")]
    TooManyTicks { ticks: f64, max: u64 },
    #[error("`{field}` must be a finite number")]
    NonFinite { field: &'static str },
    #[error("at least one loss rate is required")]
    NoLossRates,
}
