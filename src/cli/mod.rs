pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod plan;
pub mod runtime;
pub mod scenario;
pub mod session;
pub mod simulate;

pub use config::{cmd_config, ConfigArgs};
pub use plan::{cmd_plan, PlanArgs};
pub use scenario::{Scenario, ScriptedSite, ScriptedSurface};
pub use session::{cmd_status, cmd_stop};
pub use simulate::{cmd_simulate, SimulateArgs};
