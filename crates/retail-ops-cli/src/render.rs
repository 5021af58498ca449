//! Plain-text rendering for one-shot commands.
//!
//! Each renderer takes a [`ViewState`] so loading, empty and error output
//! stay distinct from a table of data.

use retail_ops_aggregate::{completion_overview, RowHistory, SummaryRow, TrendPoint};
use retail_ops_dashboard::ViewState;

/// Message shown while a request is in flight and nothing is cached.
pub const LOADING: &str = "Loading...";

/// Message shown when a request succeeded with nothing to display.
pub const EMPTY: &str = "No records match the current filters.";

const BAR_WIDTH: usize = 40;

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

fn line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize], align: &[Align]) -> String {
    let mut out = String::new();
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        let width = widths[i];
        let padded = match align[i] {
            Align::Left => format!("{cell:<width$}"),
            Align::Right => format!("{cell:>width$}"),
        };
        out.push_str(&padded);
    }
    out.trim_end().to_string()
}

/// Lay out `rows` under `headers` with padded columns.
fn table(headers: &[&str], align: &[Align], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = line(headers.iter().copied(), &widths, align);
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str), &widths, align));
        out.push('\n');
    }
    out
}

/// Render data, or the message for a non-data state.
fn render_state<T>(state: &ViewState<T>, ready: impl Fn(&T) -> String) -> String {
    match state {
        ViewState::Ready(data) => ready(data),
        ViewState::Loading { stale: Some(data) } => format!("{}(refreshing)\n", ready(data)),
        ViewState::Loading { stale: None } => format!("{LOADING}\n"),
        ViewState::Empty => format!("{EMPTY}\n"),
        ViewState::Error(message) => format!("Error: {message}\n"),
    }
}

/// Render a status summary as a table followed by an overview line.
#[must_use]
pub fn summary(state: &ViewState<Vec<SummaryRow>>) -> String {
    render_state(state, |rows| {
        let daily = rows.iter().any(|r| r.date.is_some());

        let mut headers = vec!["Store", "Total", "Done", "Pending", "In progress", "Status", "%"];
        let mut align = vec![
            Align::Left,
            Align::Right,
            Align::Right,
            Align::Right,
            Align::Right,
            Align::Left,
            Align::Right,
        ];
        if daily {
            headers.insert(0, "Date");
            align.insert(0, Align::Left);
        }

        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    row.label.clone(),
                    row.counts.total.to_string(),
                    row.counts.completed.to_string(),
                    row.counts.pending.to_string(),
                    row.counts.in_progress.to_string(),
                    row.status.to_string(),
                    format!("{}%", row.percent),
                ];
                if daily {
                    cells.insert(0, row.date.map(|d| d.to_string()).unwrap_or_default());
                }
                cells
            })
            .collect();

        let overview = completion_overview(rows);
        let mut out = table(&headers, &align, &cells);
        out.push_str(&format!(
            "\n{} rows: {} all done, {} incomplete, {} no entry. {}/{} completed ({}%).\n",
            overview.rows,
            overview.all_done,
            overview.incomplete,
            overview.no_entry,
            overview.completed,
            overview.total,
            overview.percent
        ));
        out
    })
}

/// Scale `value` out of `max` to a bar of at most [`BAR_WIDTH`] cells.
fn bar_len(value: usize, max: usize) -> usize {
    if max == 0 {
        0
    } else {
        (value * BAR_WIDTH).div_ceil(max)
    }
}

/// Render a trend as one stacked text bar per day.
///
/// `#` is completed, `=` in progress, `.` pending.
#[must_use]
pub fn trend(state: &ViewState<Vec<TrendPoint>>) -> String {
    render_state(state, |points| {
        let max = points
            .iter()
            .map(|p| p.pending + p.in_progress + p.completed)
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for point in points {
            let completed = bar_len(point.completed, max);
            let in_progress = bar_len(point.in_progress, max);
            let pending = bar_len(point.pending, max);
            let bar = format!(
                "{}{}{}",
                "#".repeat(completed),
                "=".repeat(in_progress),
                ".".repeat(pending)
            );
            out.push_str(&format!(
                "{}  {bar:<width$}  done {:>3}  in progress {:>3}  pending {:>3}\n",
                point.date,
                point.completed,
                point.in_progress,
                point.pending,
                width = BAR_WIDTH * 3,
            ));
        }
        out
    })
}

fn quantity(value: Option<f64>) -> String {
    match value {
        None => "-".to_string(),
        Some(q) if q.fract().abs() < f64::EPSILON => format!("{q:.0}"),
        Some(q) => format!("{q:.2}"),
    }
}

/// Render stock history as one row per item and one column per day.
#[must_use]
pub fn history(state: &ViewState<Vec<RowHistory>>) -> String {
    render_state(state, |rows| {
        let days: Vec<String> = rows
            .first()
            .map(|row| row.days.iter().map(|d| d.date.format("%m-%d").to_string()).collect())
            .unwrap_or_default();

        let mut headers: Vec<&str> = vec!["Item"];
        headers.extend(days.iter().map(String::as_str));
        let mut align = vec![Align::Left];
        align.extend(days.iter().map(|_| Align::Right));

        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.item_id.to_string()];
                cells.extend(row.days.iter().map(|d| quantity(d.quantity)));
                cells
            })
            .collect();

        table(&headers, &align, &cells)
    })
}
