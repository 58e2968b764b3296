use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::Context;
use crate::alarm::service::AlarmService;
use crate::io::paths::default_sound_path;
use crate::io::watcher::DatabaseWatcher;
use crate::notification::{
    AudioChannel, DesktopChannel, NotificationDispatcher, NotifySendBackend, RodioOutput,
    TerminalSurface, VisualChannel,
};
use crate::util::time::format_local;

/// Upper bound on one wait, so file changes are noticed promptly
const MAX_WAIT_MS: i64 = 1_000;

/// A line typed into the running daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonCommand {
    Stop,
    Snooze(Option<u32>),
    Sound,
    Status,
    Quit,
}

pub fn parse_daemon_command(line: &str) -> Result<DaemonCommand, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Err("empty command".into());
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "stop" | "s" => DaemonCommand::Stop,
        "snooze" | "z" => match words.next() {
            Some(n) => match n.parse::<u32>() {
                Ok(minutes) if minutes > 0 => DaemonCommand::Snooze(Some(minutes)),
                _ => return Err(format!("invalid snooze minutes: {}", n)),
            },
            None => DaemonCommand::Snooze(None),
        },
        "sound" => DaemonCommand::Sound,
        "status" => DaemonCommand::Status,
        "quit" | "q" | "exit" => DaemonCommand::Quit,
        other => return Err(format!("unknown command: {}", other)),
    };
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument: {}", extra));
    }
    Ok(command)
}

fn build_service(ctx: &Context) -> Result<AlarmService, Box<dyn std::error::Error>> {
    let config = &ctx.config;
    let store = ctx.open_store()?;
    let sound = config
        .alarm
        .sound
        .clone()
        .unwrap_or_else(|| default_sound_path(&ctx.data_dir));

    let dispatcher = NotificationDispatcher::new(
        VisualChannel::new(
            Box::new(TerminalSurface::stdout()),
            config.ui.window_title.clone(),
            config.alarm.title_blink_secs,
        ),
        AudioChannel::new(
            Box::new(RodioOutput::new(sound)),
            config.alarm.fade_step,
            config.alarm.fade_interval_ms,
        ),
        DesktopChannel::new(
            Box::new(NotifySendBackend::detect(config.notifications.desktop)),
            config.notifications.tag.clone(),
        ),
        ctx.clock.clone(),
        config.alarm.snooze_minutes,
    );
    Ok(AlarmService::new(
        Box::new(store),
        ctx.clock.clone(),
        dispatcher,
        &config.alarm,
    ))
}

/// Forward stdin lines to the loop. The loop keeps its own sender, so EOF
/// on stdin does not end the daemon.
fn spawn_stdin_reader(tx: mpsc::Sender<String>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

fn print_status(service: &AlarmService) {
    let active = service.active();
    if active.is_empty() {
        println!("no pending alarms");
        return;
    }
    for alarm in active {
        println!("⏰ {}  {}", format_local(alarm.alarm_time), alarm.title);
    }
}

/// Returns false when the loop should end
fn handle_command(service: &mut AlarmService, command: DaemonCommand) -> bool {
    match command {
        DaemonCommand::Stop => service.stop_alarm(),
        DaemonCommand::Snooze(minutes) => match service.snooze_alarm(minutes) {
            Some(alarm) => println!("😴 snoozed until {}", format_local(alarm.alarm_time)),
            None => println!("could not snooze (see log for details)"),
        },
        DaemonCommand::Sound => {
            if !service.enable_sound() {
                println!("sound is still unavailable");
            }
        }
        DaemonCommand::Status => print_status(service),
        DaemonCommand::Quit => return false,
    }
    true
}

pub fn cmd_run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = build_service(ctx)?;
    service.init();

    let watcher = match DatabaseWatcher::start(&ctx.data_dir) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "could not watch the data directory; external changes need a restart");
            None
        }
    };

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone());

    println!(
        "TaskFlow alarm daemon: {} pending alarm(s). Commands: stop, snooze [min], sound, status, quit",
        service.active().len()
    );

    loop {
        let now = service.now_ms();
        let wait = service
            .next_deadline()
            .map_or(MAX_WAIT_MS, |deadline| deadline - now)
            .clamp(0, MAX_WAIT_MS);

        match rx.recv_timeout(Duration::from_millis(wait.unsigned_abs())) {
            Ok(line) => match parse_daemon_command(&line) {
                Ok(command) => {
                    if !handle_command(&mut service, command) {
                        break;
                    }
                }
                Err(msg) => println!("{}", msg),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if watcher.as_ref().is_some_and(DatabaseWatcher::changed) {
            service.resync();
        }
        service.advance();
    }

    service.shutdown();
    drop(tx);
    info!("daemon stopped");
    Ok(())
}
