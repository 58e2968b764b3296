mod init;
mod run;
pub use init::cmd_init;
pub use run::cmd_run;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::warn;

use crate::alarm::clock::{Clock, SystemClock};
use crate::alarm::scheduler::AlarmScheduler;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, load_config};
use crate::io::json_store::{JsonStore, atomic_write};
use crate::io::paths::resolve_data_dir;
use crate::io::store::{ExportBundle, Store};
use crate::model::achievement::default_achievements;
use crate::model::alarm::Alarm;
use crate::model::config::AppConfig;
use crate::model::task::{Priority, Task};
use crate::ops::task_ops::{self, AlarmRequest, TASK_ALARM_MESSAGE, TaskEdit, TaskFilter};
use crate::ops::{achievements, stats};
use crate::util::time::{
    DATE_FORMAT, format_local, local_naive, parse_local_datetime, rfc3339_from_millis,
};

/// Setting key for the color theme
pub const THEME_SETTING: &str = "theme";

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// What every command needs: where the data lives and how to print
pub struct Context {
    pub data_dir: PathBuf,
    pub json: bool,
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn load(data_dir: PathBuf, json: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let config = load_config(&data_dir)?;
        Ok(Context {
            data_dir,
            json,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    fn open_store(&self) -> Result<JsonStore, Box<dyn std::error::Error>> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| format!("could not create {}: {}", self.data_dir.display(), e))?;
        Ok(JsonStore::open(&self.data_dir)?)
    }

    fn scheduler(&self) -> AlarmScheduler {
        AlarmScheduler::new(self.clock.clone(), self.config.alarm.poll_interval_ms)
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn stamp(&self) -> String {
        rfc3339_from_millis(self.now_ms())
    }

    fn now_local(&self) -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
        local_naive(self.now_ms()).ok_or_else(|| "could not determine local time".into())
    }

    fn today(&self) -> Result<String, Box<dyn std::error::Error>> {
        Ok(self.now_local()?.format(DATE_FORMAT).to_string())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let data_dir = resolve_data_dir(cli.data_dir.as_deref())?;
    let load = || Context::load(data_dir.clone(), json);

    match cli.command {
        // These work even when the config file is broken
        Commands::Init(args) => cmd_init(&data_dir, args, json),
        Commands::Config(cmd) => cmd_config(&data_dir, cmd),

        // Tasks
        Commands::Add(args) => cmd_add(&load()?, args),
        Commands::List(args) => cmd_list(&load()?, args),
        Commands::Show(args) => cmd_show(&load()?, args),
        Commands::Edit(args) => cmd_edit(&load()?, args),
        Commands::Done(args) => cmd_done(&load()?, args),
        Commands::Rm(args) => cmd_rm(&load()?, args),

        // Alarms
        Commands::Alarm(cmd) => match cmd.action {
            AlarmAction::List(args) => cmd_alarm_list(&load()?, args),
            AlarmAction::Set(args) => cmd_alarm_set(&load()?, args),
            AlarmAction::Cancel(args) => cmd_alarm_cancel(&load()?, args),
        },
        Commands::Run => cmd_run(&load()?),

        // Everything else
        Commands::Stats => cmd_stats(&load()?),
        Commands::Achievements => cmd_achievements(&load()?),
        Commands::Notebook(args) => cmd_notebook(&load()?, args),
        Commands::Theme(args) => cmd_theme(&load()?, args),
        Commands::Export(args) => cmd_export(&load()?, args),
        Commands::Report(args) => cmd_report(&load()?, args),
        Commands::Import(args) => cmd_import(&load()?, args),
        Commands::Clear(args) => cmd_clear(&load()?, args),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_when(when: &str) -> Result<i64, Box<dyn std::error::Error>> {
    parse_local_datetime(when)
        .ok_or_else(|| format!("invalid time '{}' (expected \"YYYY-MM-DD HH:MM\")", when).into())
}

fn parse_priority(raw: &str) -> Result<Priority, Box<dyn std::error::Error>> {
    Priority::parse(raw)
        .ok_or_else(|| format!("invalid priority '{}' (expected high, medium or low)", raw).into())
}

fn task_alarms(store: &dyn Store, task_id: &str) -> Result<Vec<Alarm>, Box<dyn std::error::Error>> {
    let mut alarms: Vec<Alarm> = store
        .all_alarms()?
        .into_iter()
        .filter(|a| a.task_id == task_id)
        .collect();
    alarms.sort_by_key(|a| a.alarm_time);
    Ok(alarms)
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let mut store = ctx.open_store()?;
    let mut scheduler = ctx.scheduler();

    let date = match args.date {
        Some(date) => date,
        None => ctx.today()?,
    };
    let priority = parse_priority(&args.priority)?;
    let task = Task::new(
        date,
        args.time.unwrap_or_default(),
        args.text,
        priority,
        ctx.stamp(),
    );
    let request = match (args.alarm.as_deref(), args.remind) {
        (Some(when), _) => Some(AlarmRequest::At(parse_when(when)?)),
        (None, Some(minutes)) => Some(AlarmRequest::MinutesBefore(
            minutes.unwrap_or(ctx.config.alarm.auto_minutes_before),
        )),
        (None, None) => None,
    };

    let alarm = task_ops::save_task_with_alarm(&mut store, &mut scheduler, &task, request)?;
    let unlocked = match achievements::check(&mut store, ctx.now_local()?, &ctx.stamp()) {
        Ok(unlocked) => unlocked,
        Err(e) => {
            warn!(error = %e, "could not update achievements");
            Vec::new()
        }
    };

    if ctx.json {
        return print_json(&AddedJson {
            task: &task,
            alarm: alarm.as_ref(),
            unlocked: unlocked.iter().map(|a| a.id.as_str()).collect(),
        });
    }
    println!("{}", format_task_line(&task));
    match (&alarm, request) {
        (Some(alarm), _) => println!("⏰ alarm set for {}", format_local(alarm.alarm_time)),
        (None, Some(_)) => println!("no alarm set: the time has passed or the task has no start time"),
        (None, None) => {}
    }
    for achievement in &unlocked {
        println!("🏆 achievement unlocked: {} {}", achievement.icon, achievement.name);
    }
    Ok(())
}

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let date = if args.today {
        Some(ctx.today()?)
    } else {
        args.date
    };
    let filter = if args.pending {
        TaskFilter::Pending
    } else if args.completed {
        TaskFilter::Completed
    } else {
        TaskFilter::All
    };
    let mut tasks = task_ops::list_tasks(&store, date.as_deref(), filter)?;
    if let Some(ref raw) = args.priority {
        let priority = parse_priority(raw)?;
        tasks.retain(|t| TaskFilter::Priority(priority).matches(t));
    }

    if ctx.json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    for task in &tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

fn cmd_show(ctx: &Context, args: ShowArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let task = task_ops::find_task(&store, &args.id)?;
    let alarms = task_alarms(&store, &task.id)?;
    if ctx.json {
        return print_json(&TaskDetailJson {
            task: &task,
            alarms: &alarms,
        });
    }
    for line in format_task_detail(&task, &alarms) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_edit(ctx: &Context, args: EditArgs) -> CmdResult {
    let edit = TaskEdit {
        text: args.text,
        date: args.date,
        time: args.time,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
    };
    if edit.is_empty() {
        return Err("nothing to change (pass --text, --date, --time or --priority)".into());
    }
    let mut store = ctx.open_store()?;
    let mut scheduler = ctx.scheduler();
    let edited = task_ops::edit_task(&mut store, &mut scheduler, &args.id, &edit)?;

    if ctx.json {
        return print_json(&EditedJson {
            task: &edited.task,
            moved: &edited.moved,
            dropped: edited.dropped,
        });
    }
    println!("{}", format_task_line(&edited.task));
    for alarm in &edited.moved {
        println!("⏰ alarm moved to {}", format_local(alarm.alarm_time));
    }
    if edited.dropped > 0 {
        println!(
            "cancelled {} alarm(s): the task has no start time or the new time has passed",
            edited.dropped
        );
    }
    Ok(())
}

fn cmd_done(ctx: &Context, args: DoneArgs) -> CmdResult {
    let mut store = ctx.open_store()?;
    let task = task_ops::toggle_complete(&mut store, &args.id, ctx.now_ms())?;
    if ctx.json {
        return print_json(&task);
    }
    if task.completed {
        println!("✓ completed: {}", task.text);
    } else {
        println!("reopened: {}", task.text);
    }
    Ok(())
}

fn cmd_rm(ctx: &Context, args: RmArgs) -> CmdResult {
    let mut store = ctx.open_store()?;
    let mut scheduler = ctx.scheduler();
    let task = task_ops::delete_task_with_alarm(&mut store, &mut scheduler, &args.id)?;
    if ctx.json {
        return print_json(&task);
    }
    println!("deleted: {}", task.text);
    Ok(())
}

// ---------------------------------------------------------------------------
// Alarm commands
// ---------------------------------------------------------------------------

fn cmd_alarm_list(ctx: &Context, args: AlarmListArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let mut alarms = if args.all {
        store.all_alarms()?
    } else {
        store.active_alarms()?
    };
    alarms.sort_by_key(|a| a.alarm_time);

    if ctx.json {
        return print_json(&alarms);
    }
    if alarms.is_empty() {
        println!("no alarms");
        return Ok(());
    }
    for alarm in &alarms {
        println!("{}", format_alarm_line(alarm));
    }
    Ok(())
}

fn cmd_alarm_set(ctx: &Context, args: AlarmSetArgs) -> CmdResult {
    let mut store = ctx.open_store()?;
    let mut scheduler = ctx.scheduler();
    let task = task_ops::find_task(&store, &args.task)?;
    let at = parse_when(&args.when)?;
    let title = args.title.unwrap_or_else(|| format!("📋 {}", task.text));
    let message = args
        .message
        .unwrap_or_else(|| TASK_ALARM_MESSAGE.to_string());

    let alarm = scheduler
        .schedule(&mut store, &task.id, at, &title, &message)
        .ok_or("could not schedule alarm (see log for details)")?;

    if ctx.json {
        return print_json(&alarm);
    }
    println!("⏰ {}", format_alarm_line(&alarm));
    if at <= ctx.now_ms() {
        println!("this time has passed; the alarm rings as soon as `tf run` is running");
    }
    Ok(())
}

fn cmd_alarm_cancel(ctx: &Context, args: AlarmCancelArgs) -> CmdResult {
    let mut store = ctx.open_store()?;
    let mut scheduler = ctx.scheduler();

    let cancelled = match (args.id, args.task) {
        (_, Some(task)) => {
            // The task may already be gone while its alarms linger
            let task_id = match task_ops::find_task(&store, &task) {
                Ok(t) => t.id,
                Err(task_ops::TaskError::NotFound(_)) => task,
                Err(e) => return Err(e.into()),
            };
            let ids: Vec<String> = task_alarms(&store, &task_id)?
                .into_iter()
                .map(|a| a.id)
                .collect();
            if !scheduler.cancel_all_for_task(&mut store, &task_id) {
                return Err(format!("could not cancel every alarm of {}", task_id).into());
            }
            ids
        }
        (Some(id), None) => {
            if !store.all_alarms()?.iter().any(|a| a.id == id) {
                return Err(format!("alarm not found: {}", id).into());
            }
            if !scheduler.cancel(&mut store, &id) {
                return Err(format!("could not cancel alarm {}", id).into());
            }
            vec![id]
        }
        (None, None) => return Err("pass an alarm ID or --task".into()),
    };

    if ctx.json {
        return print_json(&cancelled);
    }
    match cancelled.len() {
        0 => println!("no alarms to cancel"),
        1 => println!("cancelled {}", cancelled[0]),
        n => println!("cancelled {} alarms", n),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Stats, achievements, notebook, theme
// ---------------------------------------------------------------------------

fn cmd_stats(ctx: &Context) -> CmdResult {
    let store = ctx.open_store()?;
    let stats = stats::calculate(&store.all_tasks()?, &ctx.today()?);
    if ctx.json {
        return print_json(&stats_to_json(&stats));
    }
    for line in format_stats(&stats) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_achievements(ctx: &Context) -> CmdResult {
    let store = ctx.open_store()?;
    let mut list = store.achievements()?;
    if list.is_empty() {
        list = default_achievements();
    }
    if ctx.json {
        return print_json(&list);
    }
    for achievement in &list {
        println!("{}", format_achievement_line(achievement));
    }
    Ok(())
}

fn cmd_notebook(ctx: &Context, args: NotebookArgs) -> CmdResult {
    let mut store = ctx.open_store()?;
    let content = match (args.set, args.append) {
        (Some(text), _) => Some(text),
        (None, Some(line)) => {
            let mut content = store.notebook()?.content;
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(&line);
            Some(content)
        }
        (None, None) => None,
    };
    if let Some(content) = content {
        store.save_notebook(&content, &ctx.stamp())?;
    }

    let notebook = store.notebook()?;
    if ctx.json {
        return print_json(&notebook);
    }
    if notebook.content.is_empty() {
        println!("(notebook is empty)");
    } else {
        println!("{}", notebook.content);
    }
    Ok(())
}

fn cmd_theme(ctx: &Context, args: ThemeArgs) -> CmdResult {
    let mut store = ctx.open_store()?;
    if let Some(theme) = args.theme {
        let theme = theme.to_ascii_lowercase();
        if theme != "light" && theme != "dark" {
            return Err(format!("invalid theme '{}' (expected light or dark)", theme).into());
        }
        store.save_setting(THEME_SETTING, theme.into())?;
    }
    let theme = store
        .setting(THEME_SETTING)?
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "light".to_string());
    if ctx.json {
        return print_json(&serde_json::json!({ "theme": theme }));
    }
    println!("{}", theme);
    Ok(())
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

fn cmd_export(ctx: &Context, args: ExportArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let bundle = store.export(&ctx.stamp())?;
    let text = serde_json::to_string_pretty(&bundle)?;
    match args.output {
        Some(path) => {
            atomic_write(Path::new(&path), text.as_bytes())
                .map_err(|e| format!("could not write {}: {}", path, e))?;
            if !ctx.json {
                println!(
                    "exported {} tasks and {} alarms to {}",
                    bundle.tasks.len(),
                    bundle.alarms.len(),
                    path
                );
            }
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn cmd_report(ctx: &Context, args: ReportArgs) -> CmdResult {
    let store = ctx.open_store()?;
    let tasks = task_ops::list_tasks(&store, None, TaskFilter::All)?;
    if tasks.is_empty() {
        println!("no tasks to report");
        return Ok(());
    }
    let mut text = format_report(&tasks, &format_local(ctx.now_ms())).join("\n");
    text.push('\n');
    match args.output {
        Some(path) => {
            atomic_write(Path::new(&path), text.as_bytes())
                .map_err(|e| format!("could not write {}: {}", path, e))?;
            println!("wrote report of {} tasks to {}", tasks.len(), path);
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn cmd_import(ctx: &Context, args: ImportArgs) -> CmdResult {
    let mut store = ctx.open_store()?;
    let text = fs::read_to_string(&args.file)
        .map_err(|e| format!("could not read {}: {}", args.file, e))?;
    let bundle: ExportBundle = serde_json::from_str(&text)
        .map_err(|e| format!("{} is not a TaskFlow export: {}", args.file, e))?;
    store.import(&bundle, &ctx.stamp())?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "tasks": bundle.tasks.len(),
            "alarms": bundle.alarms.len(),
            "achievements": bundle.achievements.len(),
        }));
    }
    println!(
        "imported {} tasks and {} alarms",
        bundle.tasks.len(),
        bundle.alarms.len()
    );
    Ok(())
}

fn cmd_clear(ctx: &Context, args: ClearArgs) -> CmdResult {
    if !args.yes {
        return Err("this deletes every task, alarm and note; rerun with --yes".into());
    }
    let mut store = ctx.open_store()?;
    store.clear_all()?;
    achievements::seed_defaults(&mut store)?;
    if !ctx.json {
        println!("all data cleared");
    }
    Ok(())
}

fn cmd_config(data_dir: &Path, cmd: ConfigCmd) -> CmdResult {
    match cmd.action {
        ConfigAction::Get { key } => {
            let (_, doc) = config_io::read_config(data_dir)?;
            let value = config_io::get_value(&doc, &key)
                .ok_or_else(|| format!("{} is not set", key))?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let (_, mut doc) = config_io::read_config(data_dir)?;
            config_io::set_value(&mut doc, &key, &value)?;
            // Refuse edits that would leave an unloadable config behind
            toml::from_str::<AppConfig>(&doc.to_string())
                .map_err(|e| format!("invalid value for {}: {}", key, e))?;
            fs::create_dir_all(data_dir)?;
            config_io::write_config(data_dir, &doc)?;
        }
    }
    Ok(())
}
