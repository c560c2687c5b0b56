//! # taskapp
//!
//! Terminal client for the task planning backend: one-off tasks, recurring
//! blueprints, targets, notifications and weekly metrics.
//!
//! ## Usage
//!
//! ```bash
//! taskapp login alice
//! taskapp list --view upcoming --type work
//! taskapp add "Write report" --description "Q3 numbers" --due 2026-10-20 --priority 4
//! taskapp complete 12
//! taskapp plans --status running
//! taskapp plan add 3 --recurrence weekly --interval 2 --days Mon,Thu
//! taskapp briefing
//! ```
//!
//! ## Configuration
//!
//! `~/.config/taskapp/config.toml` (or `--config`, or `TASKAPP_CONFIG`):
//!
//! ```toml
//! [server]
//! base_url = "http://localhost:8080"
//! timeout_secs = 10
//!
//! [cache]
//! stale_secs = 60
//!
//! [log]
//! level = "warn"
//!
//! [view]
//! upcoming_days = 14
//! ```
//!
//! ## Local state
//!
//! The session cookies and the query cache live in the local data directory
//! (`~/.local/share/taskapp` on Linux), overridable with `TASKAPP_DATA_DIR`.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use taskapp::client::ApiClient;
use taskapp::commands::*;
use taskapp::config::Config;
use taskapp::error::AppError;
use taskapp::models::{DisplayStatus, MetricsPeriod, RecurrenceType, TaskStatus, TaskType, Weekday};
use taskapp::selectors::{ScheduleFilter, TaskFilter};
use taskapp::storage;
use taskapp::workspace::Workspace;

#[derive(Parser)]
#[command(name = "taskapp", version)]
#[command(about = "Task and recurring plan manager for the terminal", long_about = None)]
struct Cli {
    /// Backend origin, e.g. http://localhost:8080
    #[arg(long, global = true, env = "TASKAPP_SERVER")]
    server: Option<String>,
    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Ignore cached results for this run
    #[arg(long, global = true)]
    refresh: bool,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the backend
    Login {
        username: String,
        /// Password; prompted without echo when omitted. Prefer the
        /// environment variable in scripts.
        #[arg(long, env = "TASKAPP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// End the session
    Logout,
    /// Show the logged in user
    Whoami,
    /// List tasks
    List {
        #[arg(long, value_enum, default_value_t = ListView::All)]
        view: ListView,
        /// Month for --view month, YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// active, completed or canceled
        #[arg(short, long)]
        status: Option<TaskStatus>,
        /// work, life, study or shopping
        #[arg(short = 't', long = "type")]
        task_type: Option<TaskType>,
        /// Text to look for in title or description
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    /// Show a task in detail
    Show { id: u64 },
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date in YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
        /// Start date in YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// 1 (low) to 5 (urgent)
        #[arg(short, long, default_value_t = 2)]
        priority: i32,
        #[arg(short = 't', long = "type")]
        task_type: Option<TaskType>,
    },
    /// Edit a task
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(short, long)]
        priority: Option<i32>,
        #[arg(short = 't', long = "type")]
        task_type: Option<TaskType>,
    },
    /// Mark a task as completed
    Complete { id: u64 },
    /// Mark a task as active again
    Reopen { id: u64 },
    /// Cancel a task
    Cancel { id: u64 },
    /// Delete a task
    Remove { id: u64 },
    /// List blueprints and their recurring plans
    Plans {
        /// Only blueprints of this target
        #[arg(long)]
        target: Option<u64>,
        /// running, upcoming, paused, completed or template
        #[arg(short, long)]
        status: Option<DisplayStatus>,
        /// none, daily, weekly, monthly or yearly
        #[arg(short, long)]
        recurrence: Option<RecurrenceType>,
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    /// Manage recurring plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// List targets
    Targets {
        #[arg(short = 't', long = "type")]
        target_type: Option<TaskType>,
    },
    /// Manage targets
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Task counts for a day
    Stats {
        /// Day in YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Weekly or monthly performance
    Metrics {
        #[arg(long)]
        monthly: bool,
        #[arg(long)]
        target: Option<u64>,
    },
    /// List notifications
    Notifications {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        size: u32,
    },
    /// Mark notifications as read
    Read {
        #[arg(required_unless_present = "all")]
        id: Option<u64>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// Show the latest daily briefing
    Briefing,
    /// Forget the stored session and cache
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Attach a recurring plan to a blueprint
    Add {
        /// Blueprint (task template) id
        template_id: u64,
        #[arg(short, long)]
        recurrence: RecurrenceType,
        #[arg(short, long, default_value_t = 1)]
        interval: u32,
        /// Weekdays for weekly plans, e.g. Mon,Thu
        #[arg(long, value_delimiter = ',')]
        days: Vec<Weekday>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Track completions as a habit
        #[arg(long)]
        habit: bool,
    },
    /// Delete a recurring plan
    Remove { id: u64 },
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Add a target
    Add {
        title: String,
        #[arg(short = 't', long = "type")]
        target_type: TaskType,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a target
    Remove { id: u64 },
}

fn init_logging(level: &str, verbose: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "taskapp=debug" } else { level })
    });
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<(), AppError> {
    // Local commands must work with a broken config file.
    let command = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "taskapp", &mut io::stdout());
            return Ok(());
        }
        Commands::Reset { force } => {
            init_logging(&Config::default().log_level, cli.verbose);
            return cmd_reset(force);
        }
        other => other,
    };

    let config = Config::load(cli.config.as_deref())?.with_base_url(cli.server);
    init_logging(&config.log_level, cli.verbose);
    tracing::debug!(base_url = %config.base_url, "config loaded");

    let client = ApiClient::new(&config, storage::load_session())?;
    let mut ws = Workspace::new(client, storage::load_cache(), config.stale_after).with_refresh(cli.refresh);

    let result = dispatch(&mut ws, command, &config);

    if let Err(e) = storage::save_cache(ws.cache()) {
        tracing::warn!(error = %e, "could not save query cache");
    }
    result
}

fn dispatch(ws: &mut Workspace<ApiClient>, command: Commands, config: &Config) -> Result<(), AppError> {
    match command {
        Commands::Login { username, password } => cmd_login(ws, username, password),
        Commands::Logout => cmd_logout(ws),
        Commands::Whoami => cmd_whoami(ws),
        Commands::List { view, month, status, task_type, search } => {
            let filter = TaskFilter { status, task_type, search: search.unwrap_or_default() };
            cmd_list(ws, view, month, &filter, config.upcoming_days)
        }
        Commands::Show { id } => cmd_show(ws, id),
        Commands::Add { title, description, due, start, priority, task_type } => {
            let input = TaskInput {
                title: Some(title),
                description,
                due,
                start,
                priority: Some(priority),
                task_type,
            };
            cmd_add(ws, input, false).map(|_| ())
        }
        Commands::Edit { id, title, description, due, start, priority, task_type } => {
            let input = TaskInput { title, description, due, start, priority, task_type };
            cmd_edit(ws, id, input, false)
        }
        Commands::Complete { id } => cmd_set_status(ws, id, TaskStatus::Completed, false),
        Commands::Reopen { id } => cmd_set_status(ws, id, TaskStatus::Active, false),
        Commands::Cancel { id } => cmd_set_status(ws, id, TaskStatus::Canceled, false),
        Commands::Remove { id } => cmd_remove(ws, id, false),
        Commands::Plans { target, status, recurrence, search } => {
            let filter = ScheduleFilter { status, recurrence, search: search.unwrap_or_default() };
            cmd_plans(ws, target, &filter)
        }
        Commands::Plan { command } => match command {
            PlanCommands::Add { template_id, recurrence, interval, days, start, end, habit } => {
                let input = PlanInput { template_id, recurrence, interval, days, start, end, habit };
                cmd_plan_add(ws, input, false).map(|_| ())
            }
            PlanCommands::Remove { id } => cmd_plan_remove(ws, id, false),
        },
        Commands::Targets { target_type } => cmd_targets(ws, target_type),
        Commands::Target { command } => match command {
            TargetCommands::Add { title, target_type, description } => {
                cmd_target_add(ws, title, target_type, description, false).map(|_| ())
            }
            TargetCommands::Remove { id } => cmd_target_remove(ws, id, false),
        },
        Commands::Stats { date } => cmd_stats(ws, date),
        Commands::Metrics { monthly, target } => {
            let period = if monthly { MetricsPeriod::Monthly } else { MetricsPeriod::Weekly };
            cmd_metrics(ws, period, target)
        }
        Commands::Notifications { page, size } => cmd_notifications(ws, page, size),
        Commands::Read { id, all } => cmd_read(ws, if all { None } else { id }, false),
        Commands::Briefing => cmd_briefing(ws),
        Commands::Completions { .. } | Commands::Reset { .. } => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
