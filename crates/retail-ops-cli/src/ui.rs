//! UI rendering with ratatui.
//!
//! The live dashboard is a header bar, a summary table beside a trend chart,
//! and a status bar with key hints.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, Wrap};
use ratatui::Frame;
use retail_ops_aggregate::{completion_overview, CompletionStatus, SummaryRow, TrendPoint};
use retail_ops_dashboard::ViewState;

use crate::app::Screen;
use crate::render::{EMPTY, LOADING};

const BAR_WIDTH: u16 = 2;
const GROUP_GAP: u16 = 2;

/// Render one frame.
pub fn render(frame: &mut Frame, screen: &Screen) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header bar
            Constraint::Min(5),    // Panels
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header_bar(frame, screen, main_layout[0]);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_layout[1]);

    render_summary_panel(frame, screen, content_layout[0]);
    render_trend_panel(frame, screen, content_layout[1]);
    render_status_bar(frame, screen, main_layout[2]);
}

/// Truncate a string in the middle with an ellipsis if it exceeds `max_len`
/// characters.
fn truncate_middle(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        return s.to_string();
    }
    if max_len < 5 {
        return chars[..max_len].iter().collect();
    }
    let keep = (max_len - 3) / 2;
    let start: String = chars[..keep].iter().collect();
    let end: String = chars[chars.len() - keep..].iter().collect();
    format!("{start}...{end}")
}

fn width_of(s: &str) -> u16 {
    u16::try_from(s.chars().count()).unwrap_or(u16::MAX)
}

/// Render the header bar with the table name and backend.
fn render_header_bar(frame: &mut Frame, screen: &Screen, area: Rect) {
    let title = "RETAIL OPS";
    let context = format!(
        "  {} | {} | last {} days | {}",
        screen.table,
        screen.mode.label(),
        screen.days,
        screen.timezone
    );

    let max_url_width = (usize::from(area.width) / 3).saturating_sub(2);
    let backend = truncate_middle(&screen.backend, max_url_width);
    let used = width_of(title) + width_of(&context) + width_of(&backend);

    let line = Line::from(vec![
        Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(context),
        Span::raw(" ".repeat(usize::from(area.width.saturating_sub(used)))),
        Span::raw(backend),
    ]);

    let header = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Render a message in place of data, keeping the panel border.
fn render_message(frame: &mut Frame, block: Block<'_>, text: String, style: Style, area: Rect) {
    let paragraph = Paragraph::new(text)
        .style(style)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Render a non-data state. Returns the data to draw otherwise, along with
/// whether it is stale.
fn unwrap_state<'a, T>(
    frame: &mut Frame,
    state: &'a ViewState<T>,
    block: Block<'_>,
    area: Rect,
) -> Option<(&'a T, bool)> {
    match state {
        ViewState::Ready(data) => Some((data, false)),
        ViewState::Loading { stale: Some(data) } => Some((data, true)),
        ViewState::Loading { stale: None } => {
            render_message(frame, block, LOADING.to_string(), Style::default().fg(Color::Gray), area);
            None
        }
        ViewState::Empty => {
            render_message(frame, block, EMPTY.to_string(), Style::default().fg(Color::DarkGray), area);
            None
        }
        ViewState::Error(message) => {
            render_message(frame, block, format!("Error: {message}"), Style::default().fg(Color::Red), area);
            None
        }
    }
}

fn panel(title: &str, stale: bool) -> Block<'_> {
    let block = Block::default().borders(Borders::ALL).title(format!(" {title} "));
    if stale {
        block
            .title_bottom(" refreshing ")
            .border_style(Style::default().fg(Color::DarkGray))
    } else {
        block.border_style(Style::default().fg(Color::Gray))
    }
}

const fn status_color(status: CompletionStatus) -> Color {
    match status {
        CompletionStatus::AllDone => Color::Green,
        CompletionStatus::Incomplete => Color::Yellow,
        CompletionStatus::NoEntry => Color::DarkGray,
    }
}

/// Render the per-store summary table.
fn render_summary_panel(frame: &mut Frame, screen: &Screen, area: Rect) {
    let Some((rows, stale)) = unwrap_state(frame, &screen.summary, panel("Stores", false), area) else {
        return;
    };

    let overview = completion_overview(rows);
    let title = format!(
        "Stores: {}/{} done, {}%",
        overview.all_done, overview.rows, overview.percent
    );
    let daily = rows.iter().any(|r| r.date.is_some());

    let mut header = vec!["Store", "Total", "Done", "Pending", "Active", "Status", "%"];
    let mut widths = vec![
        Constraint::Min(12),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(11),
        Constraint::Length(5),
    ];
    if daily {
        header.insert(0, "Date");
        widths.insert(0, Constraint::Length(10));
    }

    let body: Vec<Row> = rows.iter().map(|row| summary_row(row, daily)).collect();
    let table = Table::new(body, widths)
        .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(panel(&title, stale));
    frame.render_widget(table, area);
}

fn summary_row(row: &SummaryRow, daily: bool) -> Row<'static> {
    let mut cells = vec![
        Cell::from(row.label.clone()),
        Cell::from(row.counts.total.to_string()),
        Cell::from(row.counts.completed.to_string()),
        Cell::from(row.counts.pending.to_string()),
        Cell::from(row.counts.in_progress.to_string()),
        Cell::from(row.status.to_string()).style(Style::default().fg(status_color(row.status))),
        Cell::from(format!("{}%", row.percent)),
    ];
    if daily {
        cells.insert(0, Cell::from(row.date.map(|d| d.format("%m-%d").to_string()).unwrap_or_default()));
    }
    Row::new(cells)
}

fn bar(value: usize, color: Color) -> Bar<'static> {
    Bar::default()
        .value(u64::try_from(value).unwrap_or(u64::MAX))
        .style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color))
}

/// Render the trend as one group of bars per day: completed, in progress,
/// pending. Only the most recent days that fit are drawn.
fn render_trend_panel(frame: &mut Frame, screen: &Screen, area: Rect) {
    let Some((points, stale)) = unwrap_state(frame, &screen.trend, panel("Trend", false), area) else {
        return;
    };

    let group_width = BAR_WIDTH * 3 + GROUP_GAP;
    let fit = usize::from(area.width.saturating_sub(2) / group_width).max(1);
    let shown: &[TrendPoint] = &points[points.len().saturating_sub(fit)..];

    let mut chart = BarChart::default()
        .block(panel("Trend: done / active / pending", stale))
        .bar_width(BAR_WIDTH)
        .bar_gap(0)
        .group_gap(GROUP_GAP);
    for point in shown {
        let bars = [
            bar(point.completed, Color::Green),
            bar(point.in_progress, Color::Yellow),
            bar(point.pending, Color::Gray),
        ];
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(point.date.format("%d").to_string()))
                .bars(&bars),
        );
    }
    frame.render_widget(chart, area);
}

/// Render the status bar with key hints and the last refresh time.
fn render_status_bar(frame: &mut Frame, screen: &Screen, area: Rect) {
    let hints = " q quit  r refresh  g grouping  +/- days";
    let updated = screen.last_refresh.map_or_else(
        || "not loaded ".to_string(),
        |at| format!("updated {} UTC ", at.format("%H:%M:%S")),
    );
    let padding = area.width.saturating_sub(width_of(hints) + width_of(&updated));

    let line = Line::from(vec![
        Span::styled(hints, Style::default().fg(Color::Cyan)),
        Span::raw(" ".repeat(usize::from(padding))),
        Span::styled(updated, Style::default().fg(Color::Gray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
