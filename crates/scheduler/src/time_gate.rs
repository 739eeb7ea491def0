//! Time gate: when does a scheduled booking window open.
//!
//! Everything here is a pure function of the wall clock and the schedule
//! configuration; arming a timer against the result is the orchestrator's job.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone};
use railbook_core_types::{ScheduleConfig, MIN_LEAD_SECONDS};

use crate::error::ScheduleError;

/// A resolved schedule: the nominal target and the earlier instant polling starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activation<Tz: TimeZone> {
    pub nominal: DateTime<Tz>,
    pub start_at: DateTime<Tz>,
    pub lead: Duration,
}

/// Parse `H:MM` / `HH:MM` on a 24-hour clock.
pub fn parse_schedule_time(raw: &str) -> Result<NaiveTime, ScheduleError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScheduleError::MissingTime);
    }
    let invalid = || ScheduleError::InvalidTime(raw.to_string());
    let (hour, minute) = raw.split_once(':').ok_or_else(invalid)?;
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Resolve the schedule against `now`, explaining why when it cannot be.
///
/// The nominal instant is always strictly after `now`: a time already passed
/// today rolls over to the same time tomorrow.
pub fn explain_activation<Tz: TimeZone>(
    now: &DateTime<Tz>,
    schedule: &ScheduleConfig,
) -> Result<Activation<Tz>, ScheduleError> {
    if !schedule.enabled {
        return Err(ScheduleError::Disabled);
    }
    let time = parse_schedule_time(&schedule.time)?;

    let today = now.date_naive();
    let mut nominal = local_instant(now, today, time)?;
    if nominal <= *now {
        let tomorrow = today
            .succ_opt()
            .ok_or_else(|| ScheduleError::NonexistentLocalTime(time.to_string()))?;
        nominal = local_instant(now, tomorrow, time)?;
    }

    let lead = Duration::from_secs(schedule.lead_seconds.max(MIN_LEAD_SECONDS));
    let start_at = nominal.clone() - ChronoDuration::seconds(lead.as_secs() as i64);
    Ok(Activation {
        nominal,
        start_at,
        lead,
    })
}

/// Instant at which polling should begin, `None` when scheduling is off or unusable.
pub fn compute_activation<Tz: TimeZone>(
    now: &DateTime<Tz>,
    schedule: &ScheduleConfig,
) -> Option<DateTime<Tz>> {
    explain_activation(now, schedule)
        .ok()
        .map(|activation| activation.start_at)
}

/// Time left until `at`, zero once it has passed.
pub fn time_until<Tz: TimeZone>(now: &DateTime<Tz>, at: &DateTime<Tz>) -> Duration {
    at.clone()
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// `m:ss` countdown text.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn local_instant<Tz: TimeZone>(
    now: &DateTime<Tz>,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<DateTime<Tz>, ScheduleError> {
    now.timezone()
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| ScheduleError::NonexistentLocalTime(format!("{date} {time}")))
}
