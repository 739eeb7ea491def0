use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::{emit_structured, OutputFormat};

#[derive(Debug, Serialize)]
struct SessionStatus {
    session_dir: String,
    running: bool,
    continuation: bool,
}

pub fn cmd_status(ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let markers = ctx.session_markers();
    let status = SessionStatus {
        session_dir: ctx.session_dir().display().to_string(),
        running: markers.running.get(),
        continuation: markers.continuation.get(),
    };

    if !emit_structured(&status, output)? {
        let line = match (status.running, status.continuation) {
            (true, true) => "running, continuing into order confirmation",
            (true, false) => "running",
            (false, true) => "continuing into order confirmation",
            (false, false) => "stopped",
        };
        println!("{line} ({})", status.session_dir);
    }
    Ok(())
}

pub fn cmd_stop(ctx: &CliContext) -> Result<()> {
    let markers = ctx.session_markers();
    let was_set = markers.any_set();
    markers.clear();
    info!(session_dir = %ctx.session_dir().display(), was_set, "session markers cleared");
    if was_set {
        println!("stopped");
    } else {
        println!("already stopped");
    }
    Ok(())
}
