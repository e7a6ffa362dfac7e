use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use reno_lab_abstract::{ConfigError, SimConfig};
use tracing::info;

use crate::engine::run_simulation;
use crate::trace::SimulationReport;

/// Seed for the `index`-th scenario of an experiment seeded with `base`.
pub fn derive_seed(base: u64, index: usize) -> u64 {
    base.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Run one simulation per loss rate, in parallel.
///
/// Every derived config is validated before any run starts. Each run owns a
/// `StdRng` seeded with [`derive_seed`], so the reports do not depend on
/// thread scheduling. Reports come back in `loss_rates` order.
pub fn run_experiment(
    base: &SimConfig,
    loss_rates: &[f64],
) -> Result<Vec<SimulationReport>, ConfigError> {
    if loss_rates.is_empty() {
        return Err(ConfigError::NoLossRates);
    }

    let configs = loss_rates
        .iter()
        .enumerate()
        .map(|(idx, &loss)| {
            let config = SimConfig {
                loss_rate: loss,
                seed: derive_seed(base.seed, idx),
                ..base.clone()
            };
            config.validate().map(|_| config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "Running {} scenario(s) over {} s at rtt={} s",
        configs.len(),
        base.sim_time,
        base.rtt
    );

    configs
        .par_iter()
        .map(|config| run_simulation(config, StdRng::seed_from_u64(config.seed)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> SimConfig {
        SimConfig {
            sim_time: 5.0,
            seed: 1234,
            ..Default::default()
        }
    }

    #[test]
    fn reports_follow_loss_rate_order() {
        let rates = [0.02, 0.0, 0.001, 0.01];
        let reports = run_experiment(&short_config(), &rates).unwrap();
        assert_eq!(reports.len(), rates.len());
        for (report, rate) in reports.iter().zip(rates) {
            assert_eq!(report.config.loss_rate, rate);
            assert_eq!(report.ticks, 100);
        }
        assert_eq!(reports[1].loss_ticks, 0);
    }

    #[test]
    fn experiment_is_reproducible() {
        let rates = [0.001, 0.01, 0.02];
        let a = run_experiment(&short_config(), &rates).unwrap();
        let b = run_experiment(&short_config(), &rates).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn scenarios_get_distinct_seeds() {
        let reports = run_experiment(&short_config(), &[0.05, 0.05]).unwrap();
        assert_ne!(reports[0].config.seed, reports[1].config.seed);
        assert_eq!(reports[0].config.seed, 1234);
    }

    #[test]
    fn any_invalid_rate_rejects_the_whole_experiment() {
        let err = run_experiment(&short_config(), &[0.01, 1.2]).unwrap_err();
        assert_eq!(err, ConfigError::LossRateOutOfRange(1.2));
        assert_eq!(
            run_experiment(&short_config(), &[]).unwrap_err(),
            ConfigError::NoLossRates
        );
    }
}
