use anyhow::{Context, Result, bail};
use reno_lab_abstract::{TestAssertion, TestScenario};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::batch::run_experiment;
use crate::trace::SimulationReport;

pub fn load_scenario(path: impl AsRef<Path>) -> Result<TestScenario> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    parse_scenario(&content)
        .with_context(|| format!("Failed to parse scenario file {}", path.display()))
}

pub fn parse_scenario(content: &str) -> Result<TestScenario> {
    let scenario: TestScenario = toml::from_str(content)?;
    Ok(scenario)
}

/// Load a scenario file, run every loss rate in it and check its assertions.
pub fn run_scenario(path: impl AsRef<Path>) -> Result<Vec<SimulationReport>> {
    let scenario = load_scenario(path)?;
    execute(&scenario)
}

pub fn run_scenario_str(content: &str) -> Result<Vec<SimulationReport>> {
    let scenario = parse_scenario(content).context("Failed to parse scenario")?;
    execute(&scenario)
}

pub fn execute(scenario: &TestScenario) -> Result<Vec<SimulationReport>> {
    info!("Running scenario '{}'", scenario.name);
    if !scenario.description.is_empty() {
        info!("{}", scenario.description);
    }

    let reports = run_experiment(&scenario.base_config(), &scenario.loss_rates())
        .with_context(|| format!("Scenario '{}' has an invalid config", scenario.name))?;

    for report in &reports {
        for assertion in &scenario.assertions {
            check_assertion(assertion, report).with_context(|| {
                format!(
                    "Scenario '{}' failed at loss rate {}",
                    scenario.name, report.config.loss_rate
                )
            })?;
        }
    }

    info!(
        "Scenario '{}' passed {} assertion(s) over {} run(s)",
        scenario.name,
        scenario.assertions.len(),
        reports.len()
    );
    Ok(reports)
}

pub fn check_assertion(assertion: &TestAssertion, report: &SimulationReport) -> Result<()> {
    match *assertion {
        TestAssertion::TraceLength { ticks } => {
            let len = report.samples.len() as u64;
            if len != ticks {
                bail!("expected a trace of {ticks} samples, got {len}");
            }
        }
        TestAssertion::InitialCwnd { value } => {
            let first = report.samples.first().map(|s| s.cwnd);
            if first != Some(value) {
                bail!("expected initial cwnd {value}, got {first:?}");
            }
        }
        TestAssertion::CwndMax { min, max } => {
            let peak = report.max_cwnd().unwrap_or(0.0);
            check_range("peak cwnd", peak, min, max)?;
        }
        TestAssertion::CwndFloor { min } => {
            if let Some(low) = report.min_cwnd().filter(|&low| low < min) {
                bail!("cwnd dropped to {low}, below floor {min}");
            }
        }
        TestAssertion::SsthreshFloor { min } => {
            if let Some(low) = report.min_ssthresh().filter(|&low| low < min) {
                bail!("ssthresh dropped to {low}, below floor {min}");
            }
        }
        TestAssertion::ThroughputRange { min, max } => {
            check_range("throughput", report.throughput, min, max)?;
        }
        TestAssertion::LossTicks { min, max } => {
            let n = report.loss_ticks;
            if n < min || max.is_some_and(|max| n > max) {
                bail!("loss ticks {n} outside [{min}, {max:?}]");
            }
        }
    }
    Ok(())
}

fn check_range(what: &str, value: f64, min: f64, max: Option<f64>) -> Result<()> {
    if value < min {
        bail!("{what} {value} is below {min}");
    }
    if let Some(max) = max
        && value > max
    {
        bail!("{what} {value} is above {max}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scenarios_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../scenarios")
    }

    #[test]
    fn bundled_scenarios_pass() {
        let mut found = 0;
        for entry in fs::read_dir(scenarios_dir()).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                let reports = run_scenario(&path)
                    .unwrap_or_else(|e| panic!("{}: {e:#}", path.display()));
                assert!(!reports.is_empty());
                found += 1;
            }
        }
        assert!(found > 0, "no scenario files found");
    }

    #[test]
    fn lossless_scenario_from_string() {
        let reports = run_scenario_str(
            r#"
            name = "lossless"
            loss_rates = [0.0]

            [config]
            sim_time = 1.0

            [[assertions]]
            type = "trace_length"
            ticks = 20

            [[assertions]]
            type = "initial_cwnd"
            value = 1.0

            [[assertions]]
            type = "cwnd_max"
            min = 77.0
            max = 77.0

            [[assertions]]
            type = "loss_ticks"
            min = 0
            max = 0
            "#,
        )
        .unwrap();
        assert_eq!(reports.len(), 1);
        // 1+2+...+64 during slow start, then 65..=77.
        assert_eq!(reports[0].bytes_acked, 127.0 + (65..=77).sum::<i32>() as f64);
    }

    #[test]
    fn failing_assertion_is_reported() {
        let err = run_scenario_str(
            r#"
            name = "too-strict"
            loss_rates = [1.0]

            [config]
            sim_time = 1.0

            [[assertions]]
            type = "throughput_range"
            min = 1.0
            "#,
        )
        .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("too-strict"), "{message}");
        assert!(message.contains("throughput"), "{message}");
    }

    #[test]
    fn invalid_config_stops_before_running() {
        let err = run_scenario_str(
            r#"
            name = "bad-rtt"
            loss_rates = [0.01]

            [config]
            rtt = -0.05
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("rtt must be positive"));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(parse_scenario("name = \"x\"\n[config]\nrttt = 0.1\n").is_err());
    }
}
