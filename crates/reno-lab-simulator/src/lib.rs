pub mod batch;
pub mod engine;
pub mod sampler;
pub mod scenario_runner;
pub mod trace;

#[cfg(feature = "tui")]
pub mod tui;

pub use batch::{derive_seed, run_experiment};
pub use engine::{CongestionState, MIN_CWND, MIN_SSTHRESH, Phase, Simulator, run_simulation};
pub use sampler::{TickOutcome, UniformSource, sample, segments_for_window};
pub use trace::{SimulationReport, WindowSample};
