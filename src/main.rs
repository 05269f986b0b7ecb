//! # Tideline
//!
//! A terminal task manager with recurring tasks. Tideline pairs a scriptable
//! CLI with an interactive TUI; both work on the same local JSON task store.
//!
//! ## Features
//!
//! *   **Priorities**: every task is `low`, `medium` or `high`, shown as a coloured badge.
//! *   **Recurring tasks**: daily, weekly (optionally on chosen weekdays), monthly and
//!     yearly cadences with an interval, ending never, on a date, or after a count.
//!     A recurring task is expanded into concrete dated instances when it is added.
//! *   **Filters**: all, active or completed tasks.
//! *   **Dashboard**: new / completed / pending tasks per day, week, month or year,
//!     compared with the previous period.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! tideline
//! # or explicitly
//! tideline ui
//! ```
//!
//! #### TUI Key Bindings
//!
//! *   `q`: Quit
//! *   `a`: Add task (text, priority, start date, recurrence)
//! *   `Space`: Toggle done
//! *   `e`: Edit text
//! *   `p`: Cycle priority
//! *   `d`: Delete selected task
//! *   `f`: Cycle filter (all / active / completed)
//! *   `x`: Clear completed tasks
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! # Basic task
//! tideline add "Write report" --priority high --category Work
//!
//! # Every other day, three times
//! tideline add "Water plants" --recur daily --every 2 --count 3 --start 2024-01-01
//!
//! # Mondays, Wednesdays and Fridays until the end of March
//! tideline add "Gym" --recur weekly --on mon,wed,fri --until 2024-03-31
//!
//! # See the schedule without saving
//! tideline preview "Rent" --recur monthly --start 2024-01-31 --count 6
//!
//! tideline list --filter active
//! tideline complete 3_1
//! tideline edit 3_1 --text "Water the ferns"
//! tideline dashboard --period week
//! ```
//!
//! ## Data Storage
//!
//! Tasks are saved in your local data directory:
//! *   Linux: `~/.local/share/tideline/tasks.json`
//! *   macOS: `~/Library/Application Support/tideline/tasks.json`
//! *   Windows: `%LOCALAPPDATA%\tideline\tasks.json`
//!
//! You can override this by setting the `TASKS_DB` environment variable.
//!
//! ## Configuration
//!
//! `~/.config/tideline/config.toml` (or `$TIDELINE_CONFIG`):
//!
//! ```toml
//! default_priority = "medium"
//!
//! [recurrence]
//! max_occurrences = 50
//! open_ended_occurrences = 10
//! ```
//!
//! Set `RUST_LOG=tideline=debug` to see what the store is doing.

use std::io;
use std::process::ExitCode;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use tideline::analytics::Period;
use tideline::commands::*;
use tideline::models::{
    parse_date, parse_time, parse_weekdays, EndCondition, Priority, RecurrenceSettings,
    RecurrenceType, TaskDraft, TaskFilter,
};
use tideline::tui::run_tui;
use tideline::{Config, Result, TaskError};

#[derive(Parser)]
#[command(name = "tideline")]
#[command(about = "Terminal task manager with recurring tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task (expanded into instances when recurring)
    Add {
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Show the dates a recurring task would get, without saving
    Preview {
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// List tasks
    List {
        /// Which tasks to show (all, active, completed)
        #[arg(short, long, default_value = "all")]
        filter: String,
    },
    /// Toggle a task between done and active
    Complete {
        id: String,
    },
    /// Delete a task
    Remove {
        id: String,
        /// Also delete every other instance of the same recurring task
        #[arg(short, long)]
        series: bool,
    },
    /// Edit a task
    Edit {
        id: String,
        /// New task text
        #[arg(short, long)]
        text: Option<String>,
        /// New priority (low, medium, high)
        #[arg(short, long)]
        priority: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// New category
        #[arg(short, long)]
        category: Option<String>,
        /// New start date in YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// New end date in YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
        /// New reminder time in HH:MM
        #[arg(long)]
        reminder: Option<String>,
    },
    /// Delete all completed tasks
    Clear,
    /// Show total, completed and pending counts
    Stats,
    /// Show productivity for a period
    Dashboard {
        /// day, week, month or year
        #[arg(short, long, default_value = "day")]
        period: String,
    },
    /// Reset the task store (delete all tasks)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

/// Task fields shared by `add` and `preview`.
#[derive(Args)]
struct DraftArgs {
    /// Task text (quoted if it has spaces)
    text: String,
    /// Priority (low, medium, high)
    #[arg(short, long)]
    priority: Option<String>,
    /// Start date in YYYY-MM-DD (first occurrence of a recurring task)
    #[arg(short, long)]
    start: Option<String>,
    /// End date in YYYY-MM-DD
    #[arg(short, long)]
    end: Option<String>,
    /// Longer description
    #[arg(short, long)]
    description: Option<String>,
    /// Category
    #[arg(short, long)]
    category: Option<String>,
    /// Reminder time in HH:MM (stored only)
    #[arg(long)]
    reminder: Option<String>,
    /// Recurrence (daily, weekly, monthly, yearly)
    #[arg(short, long)]
    recur: Option<String>,
    /// Repeat every N days/weeks/months/years
    #[arg(long, default_value_t = 1)]
    every: u32,
    /// Weekdays for weekly recurrence, e.g. mon,wed,fri or 1,3,5
    #[arg(long, requires = "recur")]
    on: Option<String>,
    /// Last possible occurrence date in YYYY-MM-DD
    #[arg(long, requires = "recur", conflicts_with = "count")]
    until: Option<String>,
    /// Number of occurrences
    #[arg(long, requires = "recur")]
    count: Option<u32>,
}

impl DraftArgs {
    /// Parses the raw arguments into one draft, rejecting anything malformed.
    fn into_draft(self, default_priority: Priority) -> Result<TaskDraft> {
        let recurrence = match &self.recur {
            None => None,
            Some(kind) => {
                let kind: RecurrenceType = kind.parse()?;
                let end = match (&self.until, self.count) {
                    (Some(date), _) => EndCondition::Date { end_date: parse_date(date)? },
                    (None, Some(count)) => EndCondition::Count { count },
                    (None, None) => EndCondition::Never,
                };
                let mut settings = RecurrenceSettings::new(kind, self.every).with_end(end);
                if let Some(days) = &self.on {
                    if kind != RecurrenceType::Weekly {
                        return Err(TaskError::validation("--on only applies to weekly recurrence."));
                    }
                    settings.weekly_days = parse_weekdays(days)?;
                }
                Some(settings)
            }
        };
        Ok(TaskDraft {
            text: self.text,
            priority: self.priority.as_deref().map(str::parse::<Priority>).transpose()?.unwrap_or(default_priority),
            start_date: self.start.as_deref().map(parse_date).transpose()?,
            end_date: self.end.as_deref().map(parse_date).transpose()?,
            description: self.description,
            category: self.category,
            reminder_time: self.reminder.as_deref().map(parse_time).transpose()?,
            recurrence,
        })
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tideline=warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let limits = config.expansion_limits();

    match cli.command {
        Some(Commands::Add { draft }) => {
            cmd_add(draft.into_draft(config.default_priority)?, &limits, false)?;
        }
        Some(Commands::Preview { draft }) => {
            cmd_preview(draft.into_draft(config.default_priority)?, &limits)?;
        }
        Some(Commands::List { filter }) => cmd_list(filter.parse::<TaskFilter>()?)?,
        Some(Commands::Complete { id }) => {
            cmd_complete(&id, false)?;
        }
        Some(Commands::Remove { id, series }) => {
            cmd_remove(&id, series, false)?;
        }
        Some(Commands::Edit { id, text, priority, description, category, start, end, reminder }) => {
            let edit = TaskEdit {
                text,
                priority: priority.as_deref().map(str::parse::<Priority>).transpose()?,
                description,
                category,
                start_date: start.as_deref().map(parse_date).transpose()?,
                end_date: end.as_deref().map(parse_date).transpose()?,
                reminder_time: reminder.as_deref().map(parse_time).transpose()?,
            };
            cmd_edit(&id, edit, false)?;
        }
        Some(Commands::Clear) => {
            cmd_clear_completed(false)?;
        }
        Some(Commands::Stats) => {
            cmd_stats()?;
        }
        Some(Commands::Dashboard { period }) => {
            cmd_dashboard(period.parse::<Period>()?)?;
        }
        Some(Commands::Reset { force }) => cmd_reset(force)?,
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => return Err(TaskError::validation(format!("Unsupported shell: {}", shell))),
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "tideline", &mut io::stdout());
        }
        Some(Commands::Ui) | None => run_tui(limits)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is_validation() {
                tracing::error!(error = %e, "command failed");
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
