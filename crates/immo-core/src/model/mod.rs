pub mod orchestrator;
pub mod seed;

pub use orchestrator::{run_simulation, simulate, SimulationInput, SimulationResult};
pub use seed::SeedCashSeries;
