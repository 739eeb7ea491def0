use railbook_core_types::BookingConfig;
use tracing::debug;

use crate::model::{Candidate, RowDescriptor};

/// Clickable rows that pass both the prefix and the time-window filter, in row order.
pub fn eligible_candidates(rows: &[RowDescriptor], config: &BookingConfig) -> Vec<Candidate> {
    let prefixes = normalized_prefixes(config);
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.is_clickable())
        .map(|(index, row)| Candidate::from_row(index, row))
        .filter(|candidate| {
            let prefix_ok = prefix_eligible(&candidate.train_no, &prefixes);
            let time_ok = time_eligible(candidate, config);
            debug!(
                train = %candidate.train_no,
                departure = ?candidate.departure,
                prefix_ok,
                time_ok,
                "candidate check"
            );
            prefix_ok && time_ok
        })
        .collect()
}

/// Pick the `order_index`-th eligible candidate, clamped to the last one available.
///
/// Without any filter configured, eligibility is skipped and the ordinal is
/// applied to the clickable rows directly.
pub fn select_candidate(rows: &[RowDescriptor], config: &BookingConfig) -> Option<Candidate> {
    let ordinal = config.order_index.max(1) as usize - 1;

    if !config.has_prefix_filter() && !config.has_time_filter() {
        let clickable: Vec<(usize, &RowDescriptor)> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_clickable())
            .collect();
        let (index, row) = clickable.get(ordinal.min(clickable.len().checked_sub(1)?))?;
        debug!(index, "no filter configured, selecting by ordinal");
        return Some(Candidate::from_row(*index, row));
    }

    let eligible = eligible_candidates(rows, config);
    let last = eligible.len().checked_sub(1)?;
    let chosen = eligible.into_iter().nth(ordinal.min(last))?;
    debug!(
        train = %chosen.train_no,
        departure = ?chosen.departure,
        requested = config.order_index,
        "selected filtered candidate"
    );
    Some(chosen)
}

fn normalized_prefixes(config: &BookingConfig) -> Vec<String> {
    config
        .train_prefixes
        .iter()
        .map(|prefix| prefix.trim().to_uppercase())
        .filter(|prefix| !prefix.is_empty())
        .collect()
}

fn prefix_eligible(train_no: &str, prefixes: &[String]) -> bool {
    prefixes.is_empty() || prefixes.iter().any(|prefix| train_no.starts_with(prefix))
}

fn time_eligible(candidate: &Candidate, config: &BookingConfig) -> bool {
    match candidate.departure_minute() {
        Some(minute) => config.time_window.contains_minute(minute),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railbook_core_types::{ActionRef, TimeWindow};

    fn row(train: &str, time: &str) -> RowDescriptor {
        RowDescriptor::new(train, ActionRef::new(format!("book-{train}")))
            .with_cells([train.to_string(), time.to_string()])
    }

    fn config(prefixes: &[&str], window: TimeWindow, order: u32) -> BookingConfig {
        BookingConfig {
            train_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            time_window: window,
            order_index: order,
            ..BookingConfig::default()
        }
    }

    fn sample_rows() -> Vec<RowDescriptor> {
        vec![
            row("G101", "05:00"),
            row("D202", "07:00"),
            row("G303", "08:00"),
            row("G404", "09:00"),
        ]
    }

    #[test]
    fn filtered_selection_picks_second_eligible() {
        let cfg = config(&["G"], TimeWindow::Morning, 2);
        let eligible: Vec<String> = eligible_candidates(&sample_rows(), &cfg)
            .into_iter()
            .map(|c| c.train_no)
            .collect();
        assert_eq!(eligible, vec!["G303", "G404"]);

        let chosen = select_candidate(&sample_rows(), &cfg).unwrap();
        assert_eq!(chosen.train_no, "G404");
        assert_eq!(chosen.row_index, 3);
        assert_eq!(chosen.action, ActionRef::new("book-G404"));
    }

    #[test]
    fn unfiltered_selection_clamps_over_clickable_rows() {
        let mut rows = sample_rows();
        rows[1] = rows[1].clone().disabled();
        rows[2].chosen = true;

        for (order, expected) in [(1, "G101"), (2, "G404"), (9, "G404")] {
            let cfg = config(&[], TimeWindow::AllDay, order);
            assert_eq!(select_candidate(&rows, &cfg).unwrap().train_no, expected);
        }
    }

    #[test]
    fn exhausted_ordinal_degrades_to_last_eligible() {
        let cfg = config(&["G"], TimeWindow::AllDay, 5);
        assert_eq!(
            select_candidate(&sample_rows(), &cfg).unwrap().train_no,
            "G404"
        );
    }

    #[test]
    fn prefix_matching_is_case_insensitive_and_trimmed() {
        let cfg = config(&[" d "], TimeWindow::AllDay, 1);
        let chosen = select_candidate(&sample_rows(), &cfg).unwrap();
        assert_eq!(chosen.train_no, "D202");

        let lower = vec![row("d9", "10:00")];
        assert_eq!(select_candidate(&lower, &cfg).unwrap().train_no, "D9");
    }

    #[test]
    fn every_prefix_filtered_candidate_matches_a_prefix() {
        let rows: Vec<RowDescriptor> = ["G1", "D2", "K3", "GC4", "T5", "Z6", "g7"]
            .iter()
            .map(|t| row(t, "10:00"))
            .collect();
        for prefixes in [vec!["G"], vec!["K", "T"], vec!["gc"], vec!["Z", "D"]] {
            let cfg = config(&prefixes, TimeWindow::AllDay, 1);
            for candidate in eligible_candidates(&rows, &cfg) {
                assert!(prefixes
                    .iter()
                    .any(|p| candidate.train_no.starts_with(&p.to_uppercase())));
            }
        }
    }

    #[test]
    fn boundary_departure_belongs_to_later_window() {
        let rows = vec![row("G1", "06:00")];
        assert!(select_candidate(&rows, &config(&[], TimeWindow::Morning, 1)).is_some());
        assert!(select_candidate(&rows, &config(&[], TimeWindow::Night, 1)).is_none());
    }

    #[test]
    fn unparseable_departure_fails_open() {
        let rows = vec![row("G1", "--:--")];
        let chosen = select_candidate(&rows, &config(&[], TimeWindow::Evening, 1)).unwrap();
        assert_eq!(chosen.departure, None);
    }

    #[test]
    fn empty_or_unclickable_listing_selects_nothing() {
        assert!(select_candidate(&[], &config(&[], TimeWindow::AllDay, 1)).is_none());
        let rows = vec![row("G1", "08:00").disabled()];
        assert!(select_candidate(&rows, &config(&[], TimeWindow::AllDay, 1)).is_none());
        assert!(select_candidate(&rows, &config(&["G"], TimeWindow::AllDay, 1)).is_none());
    }
}
