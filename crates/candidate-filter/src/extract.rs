//! Best-effort extraction of train number and departure time from a row.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::RowDescriptor;

static ROW_ID_TRAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ticket_\w*([A-Z]\d+)").expect("row id pattern"));
static CLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2}:\d{2})").expect("clock pattern"));

/// Row id first, then the label, then the first cell.
pub fn train_number(row: &RowDescriptor) -> String {
    let from_id = row
        .row_id
        .as_deref()
        .and_then(|id| ROW_ID_TRAIN.captures(id))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let raw = from_id
        .or_else(|| non_empty(&row.label))
        .or_else(|| row.cells.first().and_then(|cell| non_empty(cell)))
        .unwrap_or_default();
    raw.to_uppercase()
}

/// First `HH:MM` found in the row's cells, kept only when it is a valid clock time.
pub fn departure_time(row: &RowDescriptor) -> Option<String> {
    let found = row
        .cells
        .iter()
        .find_map(|cell| CLOCK.captures(cell).and_then(|caps| caps.get(1)))?;
    let text = found.as_str();
    minute_of_day(text).map(|_| text.to_string())
}

pub fn minute_of_day(text: &str) -> Option<u16> {
    let (hour, minute) = text.trim().split_once(':')?;
    if hour.len() != 2 || minute.len() != 2 {
        return None;
    }
    let hour: u16 = hour.parse().ok()?;
    let minute: u16 = minute.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
