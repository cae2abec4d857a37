pub mod driver;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use driver::{ControlEvent, FrameDriver, ScriptedEvent};
pub use seeds::resolve_seed_inputs;
pub use simulation::{SimulationPlan, SimulationSettings, SimulationSummary, Simulator};
pub use tester::*;
