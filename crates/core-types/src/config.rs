//! User-edited booking configuration.
//!
//! The configuration is owned by the settings store; the engine only ever
//! works on a normalized snapshot taken when a run activates.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floor applied to the poll interval.
pub const MIN_QUERY_INTERVAL_MS: u64 = 800;
pub const DEFAULT_QUERY_INTERVAL_MS: u64 = 1500;
pub const DEFAULT_LEAD_SECONDS: u64 = 5;
pub const MIN_LEAD_SECONDS: u64 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("station must be formatted as \"name,CODE\", got {0:?}")]
    MalformedStation(String),
    #[error("unknown departure window {0:?}")]
    UnknownWindow(String),
}

/// Departure time window offered by the search form.
///
/// Serialized with the site's own option codes. Unknown codes deserialize to
/// [`TimeWindow::AllDay`] so a stale settings file never narrows a search.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TimeWindow {
    #[default]
    AllDay,
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 5] = [
        TimeWindow::AllDay,
        TimeWindow::Night,
        TimeWindow::Morning,
        TimeWindow::Afternoon,
        TimeWindow::Evening,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            TimeWindow::AllDay => "00002400",
            TimeWindow::Night => "00000600",
            TimeWindow::Morning => "06001200",
            TimeWindow::Afternoon => "12001800",
            TimeWindow::Evening => "18002400",
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, TimeWindow::AllDay)
    }

    /// Half-open minute-of-day range, `None` for the all-day sentinel.
    pub fn minute_range(&self) -> Option<Range<u16>> {
        match self {
            TimeWindow::AllDay => None,
            TimeWindow::Night => Some(0..360),
            TimeWindow::Morning => Some(360..720),
            TimeWindow::Afternoon => Some(720..1080),
            TimeWindow::Evening => Some(1080..1440),
        }
    }

    pub fn contains_minute(&self, minute_of_day: u16) -> bool {
        self.minute_range()
            .map(|range| range.contains(&minute_of_day))
            .unwrap_or(true)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TimeWindow {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        TimeWindow::ALL
            .into_iter()
            .find(|window| window.code() == raw)
            .ok_or_else(|| ConfigError::UnknownWindow(raw.to_string()))
    }
}

impl From<String> for TimeWindow {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl From<TimeWindow> for String {
    fn from(window: TimeWindow) -> Self {
        window.code().to_string()
    }
}

/// Station given as `"城市,代码"`, e.g. `"北京,BJP"`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StationCode {
    pub name: String,
    pub code: String,
}

impl StationCode {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedStation(raw.to_string());
        let (name, code) = raw.split_once(',').ok_or_else(malformed)?;
        let (name, code) = (name.trim(), code.trim());
        if name.is_empty() || code.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            name: name.to_string(),
            code: code.to_string(),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Nominal start as `HH:MM`, 24-hour clock.
    pub time: String,
    pub lead_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            time: String::new(),
            lead_seconds: DEFAULT_LEAD_SECONDS,
        }
    }
}

/// Everything the search form needs before a query can be dispatched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryPreset {
    pub from: Option<StationCode>,
    pub to: Option<StationCode>,
    pub date: Option<String>,
    pub time_window: TimeWindow,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    pub from_station: String,
    pub to_station: String,
    pub date: String,
    /// Accepted train-class prefixes; empty accepts every train.
    pub train_prefixes: Vec<String>,
    pub time_window: TimeWindow,
    /// 1-based ordinal among eligible candidates.
    pub order_index: u32,
    pub query_interval_ms: u64,
    pub schedule: ScheduleConfig,
    pub passengers: Vec<String>,
    pub seat_preference: Vec<String>,
    pub allow_no_seat: bool,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            from_station: String::new(),
            to_station: String::new(),
            date: String::new(),
            train_prefixes: vec!["G".into(), "D".into()],
            time_window: TimeWindow::AllDay,
            order_index: 1,
            query_interval_ms: DEFAULT_QUERY_INTERVAL_MS,
            schedule: ScheduleConfig::default(),
            passengers: Vec::new(),
            seat_preference: vec!["二等座".into(), "一等座".into(), "商务座".into()],
            allow_no_seat: true,
        }
    }
}

impl BookingConfig {
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Enforce the configuration invariants in place.
    pub fn normalize(&mut self) {
        self.from_station = self.from_station.trim().to_string();
        self.to_station = self.to_station.trim().to_string();
        self.date = self.date.trim().to_string();
        let upper: Vec<String> = self
            .train_prefixes
            .iter()
            .map(|prefix| prefix.to_uppercase())
            .collect();
        self.train_prefixes = normalize_list(&upper);
        self.passengers = normalize_list(&self.passengers);
        self.seat_preference = normalize_list(&self.seat_preference);
        self.order_index = self.order_index.max(1);
        self.query_interval_ms = self.query_interval_ms.max(MIN_QUERY_INTERVAL_MS);
        self.schedule.time = self.schedule.time.trim().to_string();
        self.schedule.lead_seconds = self.schedule.lead_seconds.max(MIN_LEAD_SECONDS);
    }

    pub fn has_prefix_filter(&self) -> bool {
        self.train_prefixes.iter().any(|p| !p.trim().is_empty())
    }

    pub fn has_time_filter(&self) -> bool {
        !self.time_window.is_all_day()
    }

    /// Query fields the search form cannot do without.
    pub fn missing_query_fields(&self) -> Vec<&'static str> {
        let preset = self.query_preset();
        let mut missing = Vec::new();
        if preset.from.is_none() {
            missing.push("from_station");
        }
        if preset.to.is_none() {
            missing.push("to_station");
        }
        if preset.date.is_none() {
            missing.push("date");
        }
        missing
    }

    /// Malformed stations are dropped, leaving the search to fail closed.
    pub fn query_preset(&self) -> QueryPreset {
        let date = self.date.trim();
        QueryPreset {
            from: StationCode::parse(&self.from_station).ok(),
            to: StationCode::parse(&self.to_station).ok(),
            date: (!date.is_empty()).then(|| date.to_string()),
            time_window: self.time_window,
        }
    }

    /// Fields an edit may not change while a run is active or scheduled.
    pub fn locked_changes(&self, next: &BookingConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.query_interval_ms != next.query_interval_ms {
            changed.push("query_interval_ms");
        }
        if self.order_index != next.order_index {
            changed.push("order_index");
        }
        if self.schedule.time != next.schedule.time {
            changed.push("schedule.time");
        }
        if self.schedule.lead_seconds != next.schedule.lead_seconds {
            changed.push("schedule.lead_seconds");
        }
        changed
    }
}

fn normalize_list(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() || out.iter().any(|seen| seen == trimmed) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}
