use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use reno_lab_abstract::{SimConfigOverride, TestScenario};
use reno_lab_simulator::tui::{MemoryLogBuffer, TuiApp};
use reno_lab_simulator::{SimulationReport, scenario_runner};

#[derive(Parser, Debug)]
#[command(author, version, about = "TCP Reno congestion-window simulator")]
struct Args {
    /// Load a scenario (config, loss rates and assertions) from a TOML file.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Loss probabilities to simulate, comma separated or repeated.
    #[arg(long = "loss-rate", value_delimiter = ',')]
    loss_rates: Vec<f64>,

    /// Round-trip time in seconds.
    #[arg(long)]
    rtt: Option<f64>,
    /// Total simulated time in seconds.
    #[arg(long)]
    sim_time: Option<f64>,
    #[arg(long)]
    mss: Option<f64>,
    #[arg(long)]
    initial_cwnd: Option<f64>,
    #[arg(long)]
    initial_ssthresh: Option<f64>,
    #[arg(long)]
    cwnd_cap: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,

    /// Replay the traces in the terminal UI.
    #[arg(long, default_value_t = false)]
    tui: bool,

    /// Write the finished runs as JSON.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_buffer = init_logging(args.tui);
    info!("reno-lab starting…");

    let scenario = args.build_scenario()?;
    let reports = scenario_runner::execute(&scenario)?;

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &reports)?;
    }

    let reports = if args.tui {
        let mut app = TuiApp::new(reports, log_buffer);
        app.run()?;
        app.into_reports()
    } else {
        reports
    };

    for report in &reports {
        println!("{}", summary_line(report));
    }
    Ok(())
}

impl Args {
    fn overrides(&self) -> SimConfigOverride {
        SimConfigOverride {
            rtt: self.rtt,
            sim_time: self.sim_time,
            mss: self.mss,
            initial_cwnd: self.initial_cwnd,
            initial_ssthresh: self.initial_ssthresh,
            cwnd_cap: self.cwnd_cap,
            seed: self.seed,
        }
    }

    /// Scenario file (if any) with command-line values layered on top.
    fn build_scenario(&self) -> Result<TestScenario> {
        let mut scenario = match &self.scenario {
            Some(path) => scenario_runner::load_scenario(path)?,
            None => TestScenario {
                name: "ad-hoc".to_string(),
                description: String::new(),
                config: SimConfigOverride::default(),
                loss_rates: None,
                assertions: Vec::new(),
            },
        };
        scenario.config = scenario.config.merged_with(&self.overrides());
        if !self.loss_rates.is_empty() {
            scenario.loss_rates = Some(self.loss_rates.clone());
        }
        Ok(scenario)
    }
}

fn init_logging(use_tui: bool) -> Option<MemoryLogBuffer> {
    if use_tui {
        let buffer = MemoryLogBuffer::new();
        let writer = buffer.clone();
        tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .init();
        Some(buffer)
    } else {
        tracing_subscriber::fmt::init();
        None
    }
}

fn summary_line(report: &SimulationReport) -> String {
    format!(
        "Loss Rate = {:.2}%  -->  Throughput = {:.2} MSS/s",
        report.config.loss_rate * 100.0,
        report.throughput
    )
}

fn write_trace(path: &Path, reports: &[SimulationReport]) -> Result<()> {
    let data = serde_json::to_vec_pretty(reports).context("Failed to serialize simulation trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reno_lab_abstract::{DEFAULT_LOSS_RATES, SimConfig};

    #[test]
    fn no_flags_runs_the_classic_loss_rates() {
        let args = Args::try_parse_from(["reno-lab"]).unwrap();
        let scenario = args.build_scenario().unwrap();
        assert_eq!(scenario.loss_rates(), DEFAULT_LOSS_RATES.to_vec());
        assert_eq!(scenario.base_config(), SimConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "reno-lab",
            "--loss-rate",
            "0.05,0.1",
            "--loss-rate",
            "0.2",
            "--rtt",
            "0.1",
            "--seed",
            "9",
        ])
        .unwrap();
        let scenario = args.build_scenario().unwrap();
        assert_eq!(scenario.loss_rates(), vec![0.05, 0.1, 0.2]);
        let config = scenario.base_config();
        assert_eq!(config.rtt, 0.1);
        assert_eq!(config.seed, 9);
        assert_eq!(config.sim_time, 20.0);
    }

    #[test]
    fn summary_matches_console_format() {
        let config = SimConfig {
            sim_time: 1.0,
            ..Default::default()
        };
        let reports = reno_lab_simulator::run_experiment(&config, &[0.0]).unwrap();
        assert_eq!(
            summary_line(&reports[0]),
            "Loss Rate = 0.00%  -->  Throughput = 1050.00 MSS/s"
        );
    }

    #[test]
    fn trace_is_written_as_json() {
        let config = SimConfig {
            sim_time: 0.2,
            ..Default::default()
        };
        let reports = reno_lab_simulator::run_experiment(&config, &[0.0]).unwrap();
        let path = std::env::temp_dir().join(format!("reno-lab-trace-{}.json", std::process::id()));
        write_trace(&path, &reports).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert!(written.contains("\"samples\""));
        assert!(written.contains("\"throughput\""));
    }
}
