use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, TimeZone, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::{
    clock,
    config::Settings,
    domain::{Category, SessionId, SessionRecord, StopOutcome, Store},
    duration::format_duration,
    error::{Result, StopwatchError},
    storage::{self, FileRecordStore, RecordStore},
    tracker::TimeTracker,
};

#[derive(Parser, Debug)]
#[command(name = "category-stopwatch")]
#[command(about = "Track time against named categories, one stopwatch at a time", long_about = None)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "CATEGORY_STOPWATCH_DATA_DIR",
        help = "Directory holding the stopwatch record"
    )]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Path to config.json")]
    pub config: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Log debug output to stderr")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Create a category")]
    Add {
        #[arg(help = "Category name")]
        name: String,
    },

    #[command(about = "Start the stopwatch for a category, stopping any other")]
    Start {
        #[arg(help = "Category name or ID")]
        category: String,
    },

    #[command(about = "Stop the running stopwatch")]
    Stop,

    #[command(about = "Change the duration of a recorded session")]
    Edit {
        #[arg(help = "Category name or ID")]
        category: String,

        #[arg(help = "Session ID or a unique prefix of it")]
        session: String,

        #[arg(help = "New duration: HH:MM:SS, MM:SS, or whole minutes")]
        duration: String,
    },

    #[command(about = "Delete a category and all of its sessions")]
    Delete {
        #[arg(help = "Category name or ID")]
        category: String,
    },

    #[command(about = "Show today's and all-time totals per category")]
    Status,

    #[command(about = "List the most recently finished sessions")]
    Recent {
        #[arg(long, short, help = "Number of sessions to show")]
        limit: Option<usize>,
    },

    #[command(about = "Export sessions")]
    Export {
        #[arg(long, value_enum, help = "Export format")]
        format: ExportFormat,

        #[arg(long, short, help = "Output path")]
        out: Option<PathBuf>,
    },

    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(help = "Shell type (bash, zsh, fish)")]
        shell: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub category_id: String,
    pub category_name: String,
    pub session_id: String,
    pub start: i64,
    pub end: i64,
    pub duration_ms: u64,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryExport {
    pub id: String,
    pub name: String,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub categories: Vec<CategoryExport>,
    pub sessions: Vec<SessionExport>,
}

fn resolve_category<'a>(store: &'a Store, query: &str) -> Result<&'a Category> {
    store
        .find_category(query)
        .ok_or_else(|| StopwatchError::CategoryNotFound(query.to_string()))
}

/// Exact session id first, then a prefix that matches exactly one session.
fn resolve_session(category: &Category, query: &str) -> Result<SessionId> {
    let query = query.trim();
    if let Some(session) = category.session(&SessionId::new(query)) {
        return Ok(session.id.clone());
    }

    let mut matches = category
        .sessions
        .iter()
        .filter(|s| !query.is_empty() && s.id.as_str().starts_with(query));
    match (matches.next(), matches.next()) {
        (Some(session), None) => Ok(session.id.clone()),
        _ => Err(StopwatchError::SessionNotFound(query.to_string())),
    }
}

pub fn format_local_time(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn add_category<B: RecordStore>(
    tracker: &mut TimeTracker<B>,
    name: &str,
    out: &mut impl Write,
) -> Result<()> {
    match tracker.add_category(name)? {
        Some(id) => writeln!(out, "Added category '{}' ({})", name.trim(), id)?,
        None => writeln!(out, "Category name is empty, nothing added")?,
    }
    Ok(())
}

pub fn start_session<B: RecordStore>(
    tracker: &mut TimeTracker<B>,
    query: &str,
    now: i64,
    out: &mut impl Write,
) -> Result<()> {
    let category = resolve_category(tracker.store(), query)?;
    let (id, name) = (category.id.clone(), category.name.clone());
    let previous = tracker.store().active_category().map(|c| c.name.clone());

    if !tracker.start_session(&id, now)? {
        writeln!(out, "'{}' is already running", name)?;
        return Ok(());
    }

    if let Some(previous) = previous {
        writeln!(out, "Stopped '{}'", previous)?;
    }
    writeln!(out, "Started '{}'", name)?;
    Ok(())
}

pub fn stop_session<B: RecordStore>(
    tracker: &mut TimeTracker<B>,
    now: i64,
    out: &mut impl Write,
) -> Result<()> {
    match tracker.stop_active_session(now)? {
        StopOutcome::NotActive => writeln!(out, "No active session")?,
        StopOutcome::DanglingCleared => {
            writeln!(out, "Cleared a session whose category no longer exists")?
        }
        StopOutcome::Recorded {
            category_id,
            session,
        } => {
            let name = tracker
                .store()
                .category(&category_id)
                .map(|c| c.name.as_str())
                .unwrap_or("?");
            writeln!(
                out,
                "Stopped '{}'. Elapsed time: {}",
                name,
                format_duration(session.duration_ms)
            )?;
        }
    }
    Ok(())
}

pub fn edit_session<B: RecordStore>(
    tracker: &mut TimeTracker<B>,
    category_query: &str,
    session_query: &str,
    duration: &str,
    out: &mut impl Write,
) -> Result<()> {
    let category = resolve_category(tracker.store(), category_query)?;
    let category_id = category.id.clone();
    let session_id = resolve_session(category, session_query)?;

    tracker.edit_session_duration_text(&category_id, &session_id, duration)?;
    let session = tracker
        .store()
        .category(&category_id)
        .and_then(|c| c.session(&session_id));
    if let Some(session) = session {
        writeln!(
            out,
            "Session {} now lasts {}",
            short_id(session.id.as_str()),
            format_duration(session.duration_ms)
        )?;
    }
    Ok(())
}

pub fn delete_category<B: RecordStore>(
    tracker: &mut TimeTracker<B>,
    query: &str,
    out: &mut impl Write,
) -> Result<()> {
    let category = resolve_category(tracker.store(), query)?;
    let (id, name) = (category.id.clone(), category.name.clone());
    tracker.delete_category(&id)?;
    writeln!(out, "Deleted '{}'", name)?;
    Ok(())
}

pub fn status(store: &Store, now: i64, out: &mut impl Write) -> Result<()> {
    if store.categories.is_empty() {
        writeln!(out, "No categories yet.")?;
        return Ok(());
    }

    let today = store.today_totals_by_category(now);
    writeln!(out, "{:22} {:>10} {:>10}", "CATEGORY", "TODAY", "ALL TIME")?;
    writeln!(out, "{}", "-".repeat(44))?;
    for category in &store.categories {
        let marker = if store.is_active(&category.id) { "*" } else { " " };
        writeln!(
            out,
            "{}{:21} {:>10} {:>10}",
            marker,
            category.name,
            format_duration(today.get(&category.id).copied().unwrap_or(0)),
            format_duration(store.all_time_total(category, now))
        )?;
    }

    if let (Some(category), Some(elapsed)) = (store.active_category(), store.active_elapsed(now)) {
        writeln!(out, "{}", "-".repeat(44))?;
        writeln!(
            out,
            "Running: {} for {}",
            category.name,
            format_duration(elapsed)
        )?;
    }
    Ok(())
}

pub fn recent(store: &Store, limit: usize, out: &mut impl Write) -> Result<()> {
    let records = store.recent_sessions(limit);
    if records.is_empty() {
        writeln!(out, "No completed sessions yet.")?;
        return Ok(());
    }

    for record in &records {
        writeln!(
            out,
            "{}  {:20} {:>10}  {}",
            format_local_time(record.session.start),
            record.category_name,
            format_duration(record.session.duration_ms),
            short_id(record.session.id.as_str())
        )?;
    }
    Ok(())
}

fn session_export(record: SessionRecord) -> SessionExport {
    SessionExport {
        category_id: record.category_id.0,
        category_name: record.category_name,
        session_id: record.session.id.0,
        start: record.session.start,
        end: record.session.end,
        duration_ms: record.session.duration_ms,
        duration: format_duration(record.session.duration_ms),
    }
}

pub fn build_export(store: &Store) -> DataExport {
    DataExport {
        schema_version: 1,
        exported_at: Utc::now(),
        categories: store
            .categories
            .iter()
            .map(|c| CategoryExport {
                id: c.id.0.clone(),
                name: c.name.clone(),
                total_ms: c.total_ms,
            })
            .collect(),
        sessions: store
            .recent_sessions(usize::MAX)
            .into_iter()
            .map(session_export)
            .collect(),
    }
}

pub fn render_export(store: &Store, format: ExportFormat) -> Result<String> {
    let export = build_export(store);
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&export)?),
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for session in &export.sessions {
                writer.serialize(session)?;
            }
            writer.flush()?;
            let bytes = writer
                .into_inner()
                .map_err(|e| StopwatchError::Io(e.into_error()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

pub fn export_data(
    store: &Store,
    format: ExportFormat,
    out_path: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let rendered = render_export(store, format)?;
    if let Some(path) = out_path {
        storage::write_text_file(path, &rendered)?;
        writeln!(out, "Exported to {}", path.display())?;
    } else {
        write!(out, "{}", rendered)?;
        if !rendered.ends_with('\n') {
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn print_completions(shell: &str, out: &mut impl Write) -> Result<()> {
    use clap_complete::Shell;
    let shell = match shell {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        _ => return Err(StopwatchError::UnsupportedShell(shell.to_string())),
    };
    clap_complete::generate(shell, &mut Cli::command(), "category-stopwatch", out);
    Ok(())
}

pub fn run_command(command: Command, settings: &Settings, data_dir: &Path) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Command::Completions { shell } = &command {
        return print_completions(shell, &mut out);
    }

    let now = clock::now_ms();
    let mut tracker = TimeTracker::open(FileRecordStore::in_dir(data_dir), now);

    match command {
        Command::Add { name } => add_category(&mut tracker, &name, &mut out),
        Command::Start { category } => start_session(&mut tracker, &category, now, &mut out),
        Command::Stop => stop_session(&mut tracker, now, &mut out),
        Command::Edit {
            category,
            session,
            duration,
        } => edit_session(&mut tracker, &category, &session, &duration, &mut out),
        Command::Delete { category } => delete_category(&mut tracker, &category, &mut out),
        Command::Status => status(tracker.store(), now, &mut out),
        Command::Recent { limit } => recent(
            tracker.store(),
            limit.unwrap_or(settings.recent_limit),
            &mut out,
        ),
        Command::Export { format, out: path } => {
            export_data(tracker.store(), format, path.as_deref(), &mut out)
        }
        Command::Completions { .. } => Ok(()),
    }
}
