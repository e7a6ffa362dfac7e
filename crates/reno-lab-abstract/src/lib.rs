pub mod config;
pub mod error;
pub mod scenario;

pub use config::{DEFAULT_LOSS_RATES, MAX_TICKS, SimConfig};
pub use error::ConfigError;
pub use scenario::{SimConfigOverride, TestAssertion, TestScenario};
