use anyhow::{Context, Result};
use candidate_filter::train_types_for_prefixes;
use chrono::{DateTime, FixedOffset, Local};
use clap::Args;
use railbook_core_types::BookingConfig;
use railbook_scheduler::{explain_activation, format_countdown, time_until};
use railbook_state_center::SettingsStore;
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::output::{emit_structured, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Evaluate against this instant (RFC 3339) instead of the local clock
    #[arg(long, value_name = "TIME")]
    pub now: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub now: DateTime<FixedOffset>,
    pub schedule: SchedulePlan,
    pub query: QueryPlan,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SchedulePlan {
    /// Polling waits until `start_at`.
    Scheduled {
        nominal: DateTime<FixedOffset>,
        start_at: DateTime<FixedOffset>,
        lead: String,
        countdown: String,
    },
    /// Already inside the lead window.
    StartsNow {
        nominal: DateTime<FixedOffset>,
    },
    Immediate {
        reason: String,
    },
}

#[derive(Debug, Serialize)]
pub struct QueryPlan {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<String>,
    pub time_window: String,
    pub train_types: Vec<&'static str>,
    pub order_index: u32,
    pub query_interval_ms: u64,
    pub missing_fields: Vec<&'static str>,
}

pub async fn cmd_plan(args: PlanArgs, ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let now = match args.now.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("parsing --now {raw:?}"))?,
        None => Local::now().into(),
    };
    let config = ctx.settings_store().load();
    let report = build_plan(now, &config);

    if !emit_structured(&report, output)? {
        print_human_plan(&report);
    }
    Ok(())
}

pub fn build_plan(now: DateTime<FixedOffset>, config: &BookingConfig) -> PlanReport {
    let schedule = match explain_activation(&now, &config.schedule) {
        Ok(activation) if activation.start_at > now => SchedulePlan::Scheduled {
            countdown: format_countdown(time_until(&now, &activation.start_at)),
            lead: humantime::format_duration(activation.lead).to_string(),
            nominal: activation.nominal,
            start_at: activation.start_at,
        },
        Ok(activation) => SchedulePlan::StartsNow {
            nominal: activation.nominal,
        },
        Err(err) => SchedulePlan::Immediate {
            reason: err.to_string(),
        },
    };

    let preset = config.query_preset();
    let query = QueryPlan {
        from: preset.from.map(|s| format!("{} ({})", s.name, s.code)),
        to: preset.to.map(|s| format!("{} ({})", s.name, s.code)),
        date: preset.date,
        time_window: preset.time_window.code().to_string(),
        train_types: train_types_for_prefixes(&config.train_prefixes)
            .iter()
            .map(|ty| ty.key())
            .collect(),
        order_index: config.order_index,
        query_interval_ms: config.query_interval_ms,
        missing_fields: config.missing_query_fields(),
    };

    PlanReport {
        now,
        schedule,
        query,
    }
}

fn print_human_plan(report: &PlanReport) {
    match &report.schedule {
        SchedulePlan::Scheduled {
            nominal,
            start_at,
            lead,
            countdown,
        } => {
            println!("Scheduled start: {}", nominal.format("%Y-%m-%d %H:%M"));
            println!("Polling begins:  {} (lead {})", start_at.format("%H:%M:%S"), lead);
            println!("Countdown:       {countdown}");
        }
        SchedulePlan::StartsNow { nominal } => {
            println!(
                "Scheduled start {} is inside the lead window; polling starts now",
                nominal.format("%H:%M")
            );
        }
        SchedulePlan::Immediate { reason } => {
            println!("Scheduling inactive ({reason}); polling starts on demand");
        }
    }

    let query = &report.query;
    let unset = || "-".to_string();
    println!(
        "Route:           {} -> {} on {}",
        query.from.clone().unwrap_or_else(unset),
        query.to.clone().unwrap_or_else(unset),
        query.date.clone().unwrap_or_else(unset)
    );
    let trains = if query.train_types.is_empty() {
        "all trains".to_string()
    } else {
        query.train_types.join("/")
    };
    println!(
        "Selection:       candidate #{} of {}, window {}, every {} ms",
        query.order_index, trains, query.time_window, query.query_interval_ms
    );
    if !query.missing_fields.is_empty() {
        println!("Missing:         {}", query.missing_fields.join(", "));
    }
}
