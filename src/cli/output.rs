use serde::Serialize;

use crate::model::achievement::Achievement;
use crate::model::alarm::Alarm;
use crate::model::task::{Priority, Task};
use crate::ops::stats::Statistics;
use crate::util::time::format_local;

/// Characters of the id shown in listings
const SHORT_ID_LEN: usize = 8;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskDetailJson<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub alarms: &'a [Alarm],
}

#[derive(Serialize)]
pub struct AddedJson<'a> {
    pub task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm: Option<&'a Alarm>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unlocked: Vec<&'a str>,
}

#[derive(Serialize)]
pub struct EditedJson<'a> {
    pub task: &'a Task,
    pub moved: &'a [Alarm],
    pub dropped: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsJson<'a> {
    #[serde(flatten)]
    pub stats: &'a Statistics,
    pub high_percent: u32,
    pub medium_percent: u32,
    pub low_percent: u32,
}

pub fn stats_to_json(stats: &Statistics) -> StatsJson<'_> {
    StatsJson {
        stats,
        high_percent: stats.priority_percent(Priority::High),
        medium_percent: stats.priority_percent(Priority::Medium),
        low_percent: stats.priority_percent(Priority::Low),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

pub fn short_id(id: &str) -> &str {
    let rest = id.strip_prefix("task_").unwrap_or(id);
    rest.get(..SHORT_ID_LEN).unwrap_or(rest)
}

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "!!!",
        Priority::Medium => "!! ",
        Priority::Low => "!  ",
    }
}

/// One-line task summary
pub fn format_task_line(task: &Task) -> String {
    let check = if task.completed { 'x' } else { ' ' };
    let when = if task.time.is_empty() {
        task.date.clone()
    } else {
        format!("{} {}", task.date, task.time)
    };
    format!(
        "[{}] {} {:<16} {} {}",
        check,
        short_id(&task.id),
        when,
        priority_marker(task.priority),
        task.text
    )
}

pub fn format_task_detail(task: &Task, alarms: &[Alarm]) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", if task.completed { "[x]" } else { "[ ]" }, task.text),
        format!("id: {}", task.id),
        format!("date: {}", task.date),
    ];
    if !task.time.is_empty() {
        lines.push(format!("time: {}", task.time));
    }
    lines.push(format!("priority: {}", task.priority));
    if !task.created_at.is_empty() {
        lines.push(format!("created: {}", task.created_at));
    }
    if let Some(ref done) = task.completed_at {
        lines.push(format!("completed: {}", done));
    }
    if !alarms.is_empty() {
        lines.push("alarms:".to_string());
        for alarm in alarms {
            lines.push(format!("  {}", format_alarm_line(alarm)));
        }
    }
    lines
}

pub fn format_alarm_line(alarm: &Alarm) -> String {
    let status = if alarm.triggered { "rang" } else { "pending" };
    format!(
        "{}  {}  {:<7}  {}",
        alarm.id,
        format_local(alarm.alarm_time),
        status,
        alarm.title
    )
}

pub fn format_achievement_line(achievement: &Achievement) -> String {
    let mark = if achievement.unlocked { "✓" } else { "·" };
    format!(
        "{} {} {} - {}",
        mark, achievement.icon, achievement.name, achievement.description
    )
}

pub fn format_stats(stats: &Statistics) -> Vec<String> {
    let mut lines = vec![
        format!(
            "tasks: {}  completed: {}  pending: {}",
            stats.total, stats.completed, stats.pending
        ),
        format!("completion rate: {}%", stats.completion_rate),
        format!("average per day: {:.1}", stats.avg_tasks_per_day),
        format!("streak: {} days", stats.streak),
        format!(
            "priority: high {} ({}%)  medium {} ({}%)  low {} ({}%)",
            stats.high,
            stats.priority_percent(Priority::High),
            stats.medium,
            stats.priority_percent(Priority::Medium),
            stats.low,
            stats.priority_percent(Priority::Low)
        ),
    ];
    if let Some(ref day) = stats.most_productive_day {
        lines.push(format!("most productive day: {}", day));
    }
    if !stats.by_month.is_empty() {
        lines.push("by month:".to_string());
        for (month, bucket) in &stats.by_month {
            lines.push(format!("  {}  {}/{}", month, bucket.completed, bucket.total));
        }
    }
    lines
}

/// Plain-text report of `tasks` (already sorted), grouped by day
pub fn format_report(tasks: &[Task], generated: &str) -> Vec<String> {
    let completed = tasks.iter().filter(|t| t.completed).count();
    let mut lines = vec![
        "TaskFlow task report".to_string(),
        format!("generated: {}", generated),
        format!("tasks: {}  completed: {}", tasks.len(), completed),
    ];
    let mut day: Option<&str> = None;
    for task in tasks {
        if day != Some(task.date.as_str()) {
            lines.push(String::new());
            lines.push(task.date.clone());
            day = Some(&task.date);
        }
        let check = if task.completed { "[x]" } else { "[ ]" };
        lines.push(format!(
            "  {} {:<5} {:<6} {}",
            check,
            task.time,
            task.priority.as_str(),
            task.text
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::stats;

    fn task() -> Task {
        let mut t = Task::new("2025-05-14", "09:00", "Standup", Priority::High, "");
        t.id = "task_0123456789abcdef".into();
        t
    }

    #[test]
    fn short_id_strips_prefix() {
        assert_eq!(short_id("task_0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn task_line_layout() {
        insta::assert_snapshot!(format_task_line(&task()), @"[ ] 01234567 2025-05-14 09:00 !!! Standup");
    }

    #[test]
    fn detail_lists_alarms() {
        let t = task();
        let alarm = Alarm::new(&t.id, 0, "📋 Standup", "Task reminder!", 0);
        let lines = format_task_detail(&t, std::slice::from_ref(&alarm));
        assert_eq!(lines[0], "[ ] Standup");
        assert!(lines.contains(&"alarms:".to_string()));
        assert!(lines.last().unwrap().contains(&alarm.id));
    }

    #[test]
    fn stats_json_includes_percentages() {
        let s = stats::calculate(&[task()], "2025-05-14");
        let json = serde_json::to_value(stats_to_json(&s)).unwrap();
        assert_eq!(json["highPercent"], 100);
        assert_eq!(json["total"], 1);
        assert_eq!(json["completionRate"], 0);
    }

    #[test]
    fn report_groups_by_day() {
        let mut done = Task::new("2025-05-15", "", "Ship it", Priority::Low, "");
        done.completed = true;
        let lines = format_report(&[task(), done], "2025-05-16 10:00");
        assert_eq!(
            lines,
            vec![
                "TaskFlow task report",
                "generated: 2025-05-16 10:00",
                "tasks: 2  completed: 1",
                "",
                "2025-05-14",
                "  [ ] 09:00 high   Standup",
                "",
                "2025-05-15",
                "  [x]       low    Ship it",
            ]
        );
    }
}
