//! Retail ops CLI - status summaries, trends and stock history from the
//! terminal.
//!
//! This is the entry point for the `retail-ops` binary.

mod app;
mod render;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use retail_ops_aggregate::DisplayTimezone;
use retail_ops_client::{BackendConfig, RecordSource, RestClient, TableQuery};
use retail_ops_core::{FieldMap, ItemId, RecordId, SnapshotFieldMap, TaskStatus};
use retail_ops_dashboard::{DashboardConfig, DashboardService, Grouping, ViewModel, ViewState};

use app::App;

/// How often the terminal polls for key presses.
const TICK_RATE: Duration = Duration::from_millis(100);

/// Retail ops CLI - completion status and stock levels across stores.
#[derive(Parser, Debug)]
#[command(name = "retail-ops")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL.
    #[arg(long, env = "RETAIL_OPS_URL")]
    url: String,

    /// Backend API key.
    #[arg(long, env = "RETAIL_OPS_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Access token of a signed-in user; the API key is used when absent.
    #[arg(long, env = "RETAIL_OPS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// IANA timezone calendar days are computed in.
    #[arg(long, env = "RETAIL_OPS_TZ", default_value = "UTC")]
    tz: DisplayTimezone,

    /// Seconds fetched rows stay fresh.
    #[arg(long, default_value_t = 30)]
    cache_ttl: u64,

    /// Print JSON instead of tables.
    #[arg(long, default_value = "false")]
    json: bool,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-store completion summary.
    Summary {
        #[command(flatten)]
        target: Target,

        /// Row grouping.
        #[arg(long, value_enum, default_value_t = By::Store)]
        by: By,

        /// With `--by store-day`, restrict to the last N days.
        #[arg(long)]
        days: Option<u32>,
    },

    /// Daily status counts over a rolling window.
    Trend {
        #[command(flatten)]
        target: Target,

        /// Window length in days.
        #[arg(long)]
        days: Option<u32>,
    },

    /// Daily stock levels of selected items.
    History {
        /// Snapshot table.
        table: String,

        /// Item keys, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        items: Vec<ItemId>,

        /// Window length in days.
        #[arg(long)]
        days: Option<u32>,

        /// Extra `column=value` equality filters.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Item key column.
        #[arg(long, default_value = "item_id")]
        item_column: String,

        /// Store key column.
        #[arg(long, default_value = "store_id")]
        store_column: String,

        /// Quantity column.
        #[arg(long, default_value = "quantity")]
        quantity_column: String,

        /// Timestamp column.
        #[arg(long, default_value = "created_at")]
        date_column: String,
    },

    /// Set the status of one row.
    SetStatus {
        /// Table holding the row.
        table: String,

        /// Row id.
        id: RecordId,

        /// New status: pending, in_progress or completed.
        status: TaskStatus,
    },

    /// Live terminal dashboard.
    Watch {
        #[command(flatten)]
        target: Target,

        /// Window length in days.
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Seconds between automatic refreshes.
        #[arg(long, default_value_t = 30)]
        refresh: u64,
    },
}

/// The table to read and how its columns map onto record fields.
#[derive(ClapArgs, Debug)]
struct Target {
    /// Table to read.
    table: String,

    /// Extra `column=value` equality filters.
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Primary key column.
    #[arg(long, default_value = "id")]
    id_column: String,

    /// Store column.
    #[arg(long, default_value = "store_id")]
    store_column: String,

    /// Date or timestamp column.
    #[arg(long, default_value = "created_at")]
    date_column: String,

    /// Status column.
    #[arg(long, default_value = "status")]
    status_column: String,
}

impl Target {
    fn query(&self) -> TableQuery {
        filtered(TableQuery::new(&self.table), &self.filters)
    }

    fn fields(&self) -> FieldMap {
        FieldMap {
            id: self.id_column.clone(),
            store: self.store_column.clone(),
            date: self.date_column.clone(),
            status: self.status_column.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum By {
    Store,
    StoreDay,
}

/// Parse a `column=value` filter.
fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected column=value, got {s:?}")),
    }
}

fn filtered(query: TableQuery, filters: &[(String, String)]) -> TableQuery {
    filters
        .iter()
        .fold(query, |query, (column, value)| query.eq(column.clone(), value.clone()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never mix with table or JSON output.
    if args.debug || std::env::var_os("RUST_LOG").is_some() {
        let filter = if args.debug {
            EnvFilter::new("retail_ops=debug,warn")
        } else {
            EnvFilter::from_default_env()
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let mut backend = BackendConfig::new(&args.url, &args.api_key);
    if let Some(token) = &args.token {
        backend = backend.with_access_token(token);
    }
    let client = RestClient::new(backend).context("Failed to create backend client")?;

    let config = DashboardConfig {
        cache_ttl_seconds: args.cache_ttl,
        timezone: args.tz,
        ..DashboardConfig::default()
    };
    let service = Arc::new(DashboardService::new(Arc::new(client), config));

    match args.command {
        Command::Summary { target, by, days } => {
            let grouping = match by {
                By::Store => Grouping::Store,
                By::StoreDay => Grouping::StoreDay { days },
            };
            let query = target.query();
            let view = ViewModel::default();
            view.load(
                query.cache_key(),
                service.status_summary(&query, &target.fields(), grouping),
            )
            .await;
            emit(&view.state(), args.json, render::summary)
        }
        Command::Trend { target, days } => {
            let query = target.query();
            let view = app::trend_view();
            view.load(query.cache_key(), service.trend(&query, &target.fields(), days))
                .await;
            emit(&view.state(), args.json, render::trend)
        }
        Command::History {
            table,
            items,
            days,
            filters,
            item_column,
            store_column,
            quantity_column,
            date_column,
        } => {
            let fields = SnapshotFieldMap {
                item: item_column,
                store: store_column,
                quantity: quantity_column,
                date: date_column,
            };
            let query = filtered(TableQuery::new(table), &filters);
            let view = ViewModel::default();
            view.load(
                query.cache_key(),
                service.stock_history(&query, &fields, &items, days),
            )
            .await;
            emit(&view.state(), args.json, render::history)
        }
        Command::SetStatus { table, id, status } => {
            service
                .set_status(&table, &id, status)
                .await
                .with_context(|| format!("Failed to update {table} row {id}"))?;
            println!("{table} {id}: {}", status.as_str());
            Ok(())
        }
        Command::Watch { target, days, refresh } => {
            let app = App::new(service, &args.url, target.query(), target.fields(), days);
            watch(app, Duration::from_secs(refresh.max(1))).await
        }
    }
}

/// Print a finished view. Errors become the command's error so the process
/// exits non-zero.
fn emit<T: Serialize>(state: &ViewState<T>, json: bool, render: fn(&ViewState<T>) -> String) -> anyhow::Result<()> {
    match state {
        ViewState::Error(message) => anyhow::bail!("{message}"),
        ViewState::Ready(data) if json => println!("{}", serde_json::to_string_pretty(data)?),
        ViewState::Empty if json => println!("[]"),
        _ => print!("{}", render(state)),
    }
    Ok(())
}

/// Run the live dashboard until the user quits.
async fn watch<S: RecordSource + 'static>(mut app: App<S>, refresh: Duration) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app, refresh).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main event loop. Loads run in background tasks, so every tick redraws
/// whatever the views hold at that moment.
async fn run_event_loop<S: RecordSource + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S>,
    refresh: Duration,
) -> anyhow::Result<()> {
    let mut refresh_interval = tokio::time::interval(refresh);

    loop {
        terminal.draw(|f| ui::render(f, &app.screen()))?;

        tokio::select! {
            () = tokio::time::sleep(TICK_RATE) => {
                while event::poll(Duration::from_millis(0)).unwrap_or(false) {
                    if let Ok(Event::Key(key)) = event::read() {
                        if key.kind == KeyEventKind::Press {
                            handle_key(app, key.code, key.modifiers);
                        }
                    }
                }
            }

            _ = refresh_interval.tick() => {
                app.refresh(false);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle one key press.
fn handle_key<S: RecordSource + 'static>(app: &mut App<S>, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => app.should_quit = true,
        KeyCode::Char('r') => app.refresh(true),
        KeyCode::Char('g') => app.toggle_mode(),
        KeyCode::Char('+' | '=') | KeyCode::Right => app.widen(),
        KeyCode::Char('-') | KeyCode::Left => app.narrow(),
        _ => {}
    }
}
