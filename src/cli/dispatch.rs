use super::config::cmd_config;
use super::env::CliArgs;
use super::plan::cmd_plan;
use super::session::{cmd_status, cmd_stop};
use super::simulate::cmd_simulate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Config(args) => cmd_config(args, ctx, &cli.output).await,
        Commands::Plan(args) => cmd_plan(args, ctx, &cli.output).await,
        Commands::Simulate(args) => cmd_simulate(args, ctx, &cli.output).await,
        Commands::Status => cmd_status(ctx, &cli.output),
        Commands::Stop => cmd_stop(ctx),
    }
}
