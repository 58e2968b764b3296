use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tf", about = concat!("taskflow v", env!("CARGO_PKG_VERSION"), " - tasks, reminders and alarms"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'D', long = "data-dir", global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, config file and database
    Init(InitArgs),
    /// Add a task
    Add(AddArgs),
    /// List tasks
    List(ListArgs),
    /// Show task details and its alarms
    Show(ShowArgs),
    /// Change a task; its pending alarms follow a new start time
    Edit(EditArgs),
    /// Toggle a task's completed flag
    Done(DoneArgs),
    /// Delete a task and its alarms
    Rm(RmArgs),
    /// Manage alarms
    Alarm(AlarmCmd),
    /// Show task statistics
    Stats,
    /// List achievements
    Achievements,
    /// Show or edit the notebook
    Notebook(NotebookArgs),
    /// Show or set the color theme
    Theme(ThemeArgs),
    /// Export all data as JSON
    Export(ExportArgs),
    /// Print a plain-text report of every task
    Report(ReportArgs),
    /// Import data from an export file
    Import(ImportArgs),
    /// Delete all data
    Clear(ClearArgs),
    /// Read or change configuration
    Config(ConfigCmd),
    /// Run the alarm daemon in the foreground
    Run,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Rewrite the config file even if it exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Day (YYYY-MM-DD, default: today)
    #[arg(long, short = 'd')]
    pub date: Option<String>,
    /// Start time (HH:MM)
    #[arg(long, short = 't')]
    pub time: Option<String>,
    /// Priority: high, medium or low
    #[arg(long, short = 'p', default_value = "medium")]
    pub priority: String,
    /// Ring an alarm at "YYYY-MM-DD HH:MM"
    #[arg(long, conflicts_with = "remind")]
    pub alarm: Option<String>,
    /// Ring an alarm this many minutes before the start time (default from config)
    #[arg(long, num_args = 0..=1, value_name = "MINUTES")]
    pub remind: Option<Option<u32>>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only this day (YYYY-MM-DD)
    #[arg(long, short = 'd', conflicts_with = "today")]
    pub date: Option<String>,
    /// Only today
    #[arg(long)]
    pub today: bool,
    /// Only open tasks
    #[arg(long, conflicts_with = "completed")]
    pub pending: bool,
    /// Only completed tasks
    #[arg(long)]
    pub completed: bool,
    /// Only this priority
    #[arg(long, short = 'p')]
    pub priority: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID (or unique prefix)
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID (or unique prefix)
    pub id: String,
    /// New task text
    #[arg(long)]
    pub text: Option<String>,
    /// New day (YYYY-MM-DD)
    #[arg(long, short = 'd')]
    pub date: Option<String>,
    /// New start time (HH:MM); an empty value removes it
    #[arg(long, short = 't')]
    pub time: Option<String>,
    /// New priority: high, medium or low
    #[arg(long, short = 'p')]
    pub priority: Option<String>,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Task ID (or unique prefix)
    pub id: String,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task ID (or unique prefix)
    pub id: String,
}

// ---------------------------------------------------------------------------
// Alarm args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AlarmCmd {
    #[command(subcommand)]
    pub action: AlarmAction,
}

#[derive(Subcommand)]
pub enum AlarmAction {
    /// List alarms (pending only unless --all)
    List(AlarmListArgs),
    /// Schedule an alarm for a task
    Set(AlarmSetArgs),
    /// Cancel an alarm, or every alarm of a task
    Cancel(AlarmCancelArgs),
}

#[derive(Args)]
pub struct AlarmListArgs {
    /// Include alarms that already rang
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct AlarmSetArgs {
    /// Task ID (or unique prefix)
    pub task: String,
    /// When to ring: "YYYY-MM-DD HH:MM"
    pub when: String,
    /// Alarm title (default: task text)
    #[arg(long)]
    pub title: Option<String>,
    /// Alarm message
    #[arg(long)]
    pub message: Option<String>,
}

#[derive(Args)]
pub struct AlarmCancelArgs {
    /// Alarm ID
    #[arg(required_unless_present = "task")]
    pub id: Option<String>,
    /// Cancel every alarm of this task instead
    #[arg(long, conflicts_with = "id")]
    pub task: Option<String>,
}

// ---------------------------------------------------------------------------
// Other args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NotebookArgs {
    /// Replace the notebook text
    #[arg(long, conflicts_with = "append")]
    pub set: Option<String>,
    /// Append a line to the notebook
    #[arg(long)]
    pub append: Option<String>,
}

#[derive(Args)]
pub struct ThemeArgs {
    /// light or dark
    pub theme: Option<String>,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Export file to read
    pub file: String,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Confirm deleting everything
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a value, e.g. `alarm.snooze_minutes`
    Get { key: String },
    /// Set a value, keeping the file's comments and layout
    Set { key: String, value: String },
}
