use crate::sampler::{TickOutcome, UniformSource, sample};
use crate::trace::{SimulationReport, WindowSample};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reno_lab_abstract::{ConfigError, SimConfig};
use tracing::{debug, info};

/// Floor applied to cwnd when it is halved after a loss.
pub const MIN_CWND: f64 = 1.0;
/// Floor applied to ssthresh when it is halved after a loss.
pub const MIN_SSTHRESH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SlowStart,
    CongestionAvoidance,
}

/// Mutable Reno state for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionState {
    pub time: f64,
    pub cwnd: f64,
    pub ssthresh: f64,
}

impl CongestionState {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            time: 0.0,
            cwnd: config.initial_cwnd,
            ssthresh: config.initial_ssthresh,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.cwnd < self.ssthresh {
            Phase::SlowStart
        } else {
            Phase::CongestionAvoidance
        }
    }

    /// Fold one tick's outcome into the window. `phase` must be taken from the
    /// pre-tick state; a loss overrides it entirely.
    pub fn apply(&mut self, phase: Phase, lost: bool, mss: f64, cwnd_cap: f64) {
        if lost {
            self.ssthresh = (self.cwnd / 2.0).max(MIN_SSTHRESH);
            self.cwnd = (self.cwnd / 2.0).max(MIN_CWND);
        } else {
            match phase {
                Phase::SlowStart => self.cwnd *= 2.0,
                Phase::CongestionAvoidance => self.cwnd += mss,
            }
        }
        // Only cwnd is capped; ssthresh keeps its halved value.
        self.cwnd = self.cwnd.min(cwnd_cap);
    }
}

/// RTT-stepped Reno simulator over a validated config.
pub struct Simulator<'a, S = StdRng> {
    config: &'a SimConfig,
    state: CongestionState,
    rng: S,
    tick: u64,
    total_ticks: u64,

    samples: Vec<WindowSample>,
    bytes_acked: f64,
    loss_ticks: u64,
}

impl<'a> Simulator<'a, StdRng> {
    /// Simulator drawing losses from a `StdRng` seeded with `config.seed`.
    pub fn new(config: &'a SimConfig) -> Result<Self, ConfigError> {
        Self::with_source(config, StdRng::seed_from_u64(config.seed))
    }
}

impl<'a, S: UniformSource> Simulator<'a, S> {
    pub fn with_source(config: &'a SimConfig, rng: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let total_ticks = config.tick_count();
        Ok(Self {
            config,
            state: CongestionState::new(config),
            rng,
            tick: 0,
            total_ticks,
            samples: Vec::with_capacity(total_ticks.min(1 << 20) as usize),
            bytes_acked: 0.0,
            loss_ticks: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        self.config
    }

    pub fn state(&self) -> &CongestionState {
        &self.state
    }

    pub fn current_time(&self) -> f64 {
        self.state.time
    }

    pub fn remaining_ticks(&self) -> u64 {
        self.total_ticks - self.tick
    }

    /// Run one RTT. Returns `None` once simulated time has been used up.
    pub fn step(&mut self) -> Option<TickOutcome> {
        if self.tick >= self.total_ticks {
            return None;
        }

        self.samples.push(WindowSample {
            time: self.state.time,
            cwnd: self.state.cwnd,
            ssthresh: self.state.ssthresh,
        });

        let phase = self.state.phase();
        let outcome = sample(
            self.state.cwnd,
            self.config.mss,
            self.config.loss_rate,
            &mut self.rng,
        );
        self.bytes_acked += outcome.acked as f64 * self.config.mss;
        if outcome.lost {
            self.loss_ticks += 1;
        }

        debug!(
            "tick {} t={:.3}s cwnd={} ssthresh={} {:?}: sent={} acked={} lost={}",
            self.tick,
            self.state.time,
            self.state.cwnd,
            self.state.ssthresh,
            phase,
            outcome.attempted,
            outcome.acked,
            outcome.lost
        );

        self.state
            .apply(phase, outcome.lost, self.config.mss, self.config.cwnd_cap);
        self.tick += 1;
        self.state.time = self.tick as f64 * self.config.rtt;
        Some(outcome)
    }

    pub fn run_until_complete(&mut self) {
        info!(
            "Running Reno simulation: loss={} rtt={}s ticks={}",
            self.config.loss_rate, self.config.rtt, self.total_ticks
        );
        while self.step().is_some() {}
        info!(
            "Simulation complete: loss={} throughput={:.2} MSS/s loss_ticks={}",
            self.config.loss_rate,
            self.throughput(),
            self.loss_ticks
        );
    }

    pub fn throughput(&self) -> f64 {
        self.bytes_acked / self.config.sim_time
    }

    /// Snapshot of the run so far.
    pub fn export_report(&self) -> SimulationReport {
        SimulationReport {
            config: self.config.clone(),
            ticks: self.tick,
            samples: self.samples.clone(),
            bytes_acked: self.bytes_acked,
            throughput: self.throughput(),
            loss_ticks: self.loss_ticks,
        }
    }

    pub fn into_report(self) -> SimulationReport {
        let throughput = self.throughput();
        SimulationReport {
            config: self.config.clone(),
            ticks: self.tick,
            samples: self.samples,
            bytes_acked: self.bytes_acked,
            throughput,
            loss_ticks: self.loss_ticks,
        }
    }
}

/// Run a full simulation with an injected randomness source.
pub fn run_simulation<S: UniformSource>(
    config: &SimConfig,
    rng: S,
) -> Result<SimulationReport, ConfigError> {
    let mut sim = Simulator::with_source(config, rng)?;
    sim.run_until_complete();
    Ok(sim.into_report())
}
