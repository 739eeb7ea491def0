use clap::Subcommand;

use super::config::ConfigArgs;
use super::plan::PlanArgs;
use super::simulate::SimulateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Manage booking settings
    Config(ConfigArgs),

    /// Show when a scheduled start would activate
    Plan(PlanArgs),

    /// Run the booking engine against a scripted site
    Simulate(SimulateArgs),

    /// Show the session run markers
    Status,

    /// Clear the session run markers
    Stop,
}
