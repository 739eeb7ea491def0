use railbook_core_types::ActionRef;
use serde::{Deserialize, Serialize};

use crate::extract;

/// One raw row of the search results table as the surface reports it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RowDescriptor {
    /// DOM id of the row, e.g. `ticket_240000G10100`.
    #[serde(default)]
    pub row_id: Option<String>,
    /// Train number text shown in the first column.
    #[serde(default)]
    pub label: String,
    /// Cell texts in column order.
    #[serde(default)]
    pub cells: Vec<String>,
    pub action: ActionRef,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Already in a chosen state.
    #[serde(default)]
    pub chosen: bool,
}

fn enabled_default() -> bool {
    true
}

impl RowDescriptor {
    pub fn new(label: impl Into<String>, action: ActionRef) -> Self {
        Self {
            row_id: None,
            label: label.into(),
            cells: Vec::new(),
            action,
            enabled: true,
            chosen: false,
        }
    }

    pub fn with_cells<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cells = cells.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_clickable(&self) -> bool {
        self.enabled && !self.chosen
    }
}

/// A selectable result row, recomputed on every poll.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Uppercased train identifier, possibly empty when nothing could be read.
    pub train_no: String,
    /// Departure as `HH:MM` when the row exposes a valid one.
    pub departure: Option<String>,
    pub action: ActionRef,
    pub selectable: bool,
    /// Position of the row in the original listing.
    pub row_index: usize,
}

impl Candidate {
    pub fn from_row(index: usize, row: &RowDescriptor) -> Self {
        Self {
            train_no: extract::train_number(row),
            departure: extract::departure_time(row),
            action: row.action.clone(),
            selectable: row.is_clickable(),
            row_index: index,
        }
    }

    pub fn departure_minute(&self) -> Option<u16> {
        self.departure.as_deref().and_then(extract::minute_of_day)
    }
}
