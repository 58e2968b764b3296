use tracing::{debug, info, warn};

use crate::alarm::scheduler::AlarmScheduler;
use crate::io::store::{Store, StoreError};
use crate::model::alarm::Alarm;
use crate::model::task::{Priority, Task};
use crate::util::time::{parse_date, parse_time, rfc3339_from_millis};

pub const TASK_ALARM_MESSAGE: &str = "Task reminder!";

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("'{0}' matches more than one task")]
    Ambiguous(String),
    #[error("task text cannot be empty")]
    EmptyText,
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Alarm to attach when saving a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmRequest {
    /// Ring at this epoch-ms instant
    At(i64),
    /// Ring a fixed number of minutes before the task starts
    MinutesBefore(u32),
}

/// Which tasks a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
    Priority(Priority),
}

impl TaskFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Pending => !task.completed,
            TaskFilter::Completed => task.completed,
            TaskFilter::Priority(p) => task.priority == p,
        }
    }
}

pub fn validate(task: &Task) -> Result<(), TaskError> {
    if task.text.trim().is_empty() {
        return Err(TaskError::EmptyText);
    }
    if parse_date(&task.date).is_none() {
        return Err(TaskError::InvalidDate(task.date.clone()));
    }
    if !task.time.is_empty() && parse_time(&task.time).is_none() {
        return Err(TaskError::InvalidTime(task.time.clone()));
    }
    Ok(())
}

/// Look a task up by full id or unique id prefix
pub fn find_task(store: &dyn Store, id: &str) -> Result<Task, TaskError> {
    if let Some(task) = store.task(id)? {
        return Ok(task);
    }
    let mut matches = store.all_tasks()?.into_iter().filter(|t| {
        t.id.starts_with(id)
            || t.id
                .strip_prefix("task_")
                .is_some_and(|rest| rest.starts_with(id))
    });
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task),
        (Some(_), Some(_)) => Err(TaskError::Ambiguous(id.to_string())),
        _ => Err(TaskError::NotFound(id.to_string())),
    }
}

/// Insert or update a task, then schedule the requested alarm.
///
/// An explicit alarm time that is not in the future is ignored, as is an
/// offset reminder whose time already passed. The task is saved either way.
pub fn save_task_with_alarm(
    store: &mut dyn Store,
    scheduler: &mut AlarmScheduler,
    task: &Task,
    alarm: Option<AlarmRequest>,
) -> Result<Option<Alarm>, TaskError> {
    validate(task)?;
    if store.task(&task.id)?.is_some() {
        store.update_task(task)?;
        debug!(task = %task.id, "task updated");
    } else {
        store.add_task(task)?;
        info!(task = %task.id, "task added");
    }

    let alarm = match alarm {
        Some(AlarmRequest::At(at)) if at > scheduler.now_ms() => scheduler.schedule(
            store,
            &task.id,
            at,
            &format!("📋 {}", task.text),
            TASK_ALARM_MESSAGE,
        ),
        Some(AlarmRequest::At(at)) => {
            warn!(task = %task.id, at, "alarm time is in the past; not scheduling");
            None
        }
        Some(AlarmRequest::MinutesBefore(minutes)) => {
            scheduler.schedule_auto(store, task, minutes)
        }
        None => None,
    };
    Ok(alarm)
}

/// Fields to change on an existing task; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub text: Option<String>,
    pub date: Option<String>,
    /// An empty string removes the start time
    pub time: Option<String>,
    pub priority: Option<Priority>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.date.is_none() && self.time.is_none() && self.priority.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditedTask {
    pub task: Task,
    /// Pending alarms re-created at the same distance from the new start
    pub moved: Vec<Alarm>,
    /// Pending alarms cancelled without a replacement: the task lost its
    /// start time, or the shifted time has already passed
    pub dropped: usize,
}

/// Apply `edit` to a task. When its start moves, every pending alarm keeps
/// its offset from the start: it is cancelled and scheduled again.
pub fn edit_task(
    store: &mut dyn Store,
    scheduler: &mut AlarmScheduler,
    id: &str,
    edit: &TaskEdit,
) -> Result<EditedTask, TaskError> {
    let before = find_task(store, id)?;
    let mut task = before.clone();
    if let Some(text) = &edit.text {
        task.text = text.clone();
    }
    if let Some(date) = &edit.date {
        task.date = date.clone();
    }
    if let Some(time) = &edit.time {
        task.time = time.clone();
    }
    if let Some(priority) = edit.priority {
        task.priority = priority;
    }
    save_task_with_alarm(store, scheduler, &task, None)?;

    let mut edited = EditedTask {
        task,
        moved: Vec::new(),
        dropped: 0,
    };
    if before.date == edited.task.date && before.time == edited.task.time {
        return Ok(edited);
    }

    let shift = before
        .starts_at_millis()
        .zip(edited.task.starts_at_millis())
        .map(|(old, new)| new - old);
    let pending: Vec<Alarm> = store
        .all_alarms()?
        .into_iter()
        .filter(|a| a.task_id == edited.task.id && !a.triggered)
        .collect();
    let now = scheduler.now_ms();
    for alarm in pending {
        if !scheduler.cancel(store, &alarm.id) {
            warn!(alarm = %alarm.id, "could not cancel alarm of moved task; leaving it");
            continue;
        }
        let replacement = shift
            .map(|shift| alarm.alarm_time + shift)
            .filter(|at| *at > now)
            .and_then(|at| {
                scheduler.schedule(store, &edited.task.id, at, &alarm.title, &alarm.message)
            });
        match replacement {
            Some(moved) => edited.moved.push(moved),
            None => {
                debug!(alarm = %alarm.id, "alarm dropped after the task moved");
                edited.dropped += 1;
            }
        }
    }
    Ok(edited)
}

/// Delete a task and every alarm that belongs to it
pub fn delete_task_with_alarm(
    store: &mut dyn Store,
    scheduler: &mut AlarmScheduler,
    id: &str,
) -> Result<Task, TaskError> {
    let task = find_task(store, id)?;
    if !scheduler.cancel_all_for_task(store, &task.id) {
        warn!(task = %task.id, "some alarms could not be cancelled");
    }
    store.delete_task(&task.id)?;
    info!(task = %task.id, "task deleted");
    Ok(task)
}

/// Flip the completed flag, stamping or clearing `completedAt`
pub fn toggle_complete(store: &mut dyn Store, id: &str, now_ms: i64) -> Result<Task, TaskError> {
    let mut task = find_task(store, id)?;
    task.completed = !task.completed;
    task.completed_at = task.completed.then(|| rfc3339_from_millis(now_ms));
    store.update_task(&task)?;
    Ok(task)
}

/// Tasks matching `filter` (and `date`, if given), ordered by date then time
pub fn list_tasks(
    store: &dyn Store,
    date: Option<&str>,
    filter: TaskFilter,
) -> Result<Vec<Task>, TaskError> {
    let tasks = match date {
        Some(date) => store.tasks_by_date(date)?,
        None => store.all_tasks()?,
    };
    let mut tasks: Vec<Task> = tasks.into_iter().filter(|t| filter.matches(t)).collect();
    tasks.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::alarm::clock::ManualClock;
    use crate::io::store::MemoryStore;
    use crate::util::time::{local_naive, parse_local_datetime};

    const START: i64 = 1_700_000_000_000;

    fn setup() -> (MemoryStore, AlarmScheduler) {
        let clock = Arc::new(ManualClock::new(START));
        (MemoryStore::new(), AlarmScheduler::new(clock, 1_000))
    }

    fn task(text: &str) -> Task {
        Task::new("2025-05-14", "09:00", text, Priority::Medium, "")
    }

    #[test]
    fn save_rejects_invalid_input() {
        let (mut store, mut scheduler) = setup();
        let mut t = task("  ");
        assert!(matches!(
            save_task_with_alarm(&mut store, &mut scheduler, &t, None),
            Err(TaskError::EmptyText)
        ));
        t.text = "ok".into();
        t.date = "14/05/2025".into();
        assert!(matches!(
            save_task_with_alarm(&mut store, &mut scheduler, &t, None),
            Err(TaskError::InvalidDate(_))
        ));
        t.date = "2025-05-14".into();
        t.time = "9am".into();
        assert!(matches!(
            save_task_with_alarm(&mut store, &mut scheduler, &t, None),
            Err(TaskError::InvalidTime(_))
        ));
        assert!(store.all_tasks().unwrap().is_empty());
    }

    #[test]
    fn save_with_future_alarm_schedules_it() {
        let (mut store, mut scheduler) = setup();
        let t = task("Call the bank");
        let alarm = save_task_with_alarm(
            &mut store,
            &mut scheduler,
            &t,
            Some(AlarmRequest::At(START + 60_000)),
        )
        .unwrap()
        .unwrap();
        assert_eq!(alarm.title, "📋 Call the bank");
        assert_eq!(alarm.message, TASK_ALARM_MESSAGE);
        assert_eq!(alarm.task_id, t.id);
        assert_eq!(scheduler.task_alarms(&t.id).len(), 1);
    }

    #[test]
    fn save_with_past_alarm_keeps_task_only() {
        let (mut store, mut scheduler) = setup();
        let t = task("Too late");
        let alarm =
            save_task_with_alarm(&mut store, &mut scheduler, &t, Some(AlarmRequest::At(START)))
                .unwrap();
        assert!(alarm.is_none());
        assert!(store.task(&t.id).unwrap().is_some());
        assert!(store.all_alarms().unwrap().is_empty());
    }

    #[test]
    fn save_with_offset_reminder() {
        let (mut store, mut scheduler) = setup();
        let start = local_naive(START + 3_600_000).unwrap();
        let t = Task::new(
            start.format("%Y-%m-%d").to_string(),
            start.format("%H:%M").to_string(),
            "Meeting",
            Priority::High,
            "",
        );
        let alarm = save_task_with_alarm(
            &mut store,
            &mut scheduler,
            &t,
            Some(AlarmRequest::MinutesBefore(10)),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            alarm.alarm_time,
            parse_local_datetime(&format!("{} {}", t.date, t.time)).unwrap() - 600_000
        );
    }

    #[test]
    fn saving_twice_updates() {
        let (mut store, mut scheduler) = setup();
        let mut t = task("Draft");
        save_task_with_alarm(&mut store, &mut scheduler, &t, None).unwrap();
        t.text = "Final".into();
        save_task_with_alarm(&mut store, &mut scheduler, &t, None).unwrap();
        let all = store.all_tasks().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "Final");
    }

    #[test]
    fn delete_cascades_to_alarms() {
        let (mut store, mut scheduler) = setup();
        let t = task("Doomed");
        for i in 1..=3 {
            save_task_with_alarm(
                &mut store,
                &mut scheduler,
                &t,
                Some(AlarmRequest::At(START + i * 60_000)),
            )
            .unwrap();
        }
        assert_eq!(store.all_alarms().unwrap().len(), 3);

        let deleted = delete_task_with_alarm(&mut store, &mut scheduler, &t.id).unwrap();
        assert_eq!(deleted.id, t.id);
        assert!(scheduler.task_alarms(&t.id).is_empty());
        assert!(store.all_alarms().unwrap().is_empty());
        assert!(store.all_tasks().unwrap().is_empty());

        assert!(matches!(
            delete_task_with_alarm(&mut store, &mut scheduler, &t.id),
            Err(TaskError::NotFound(_))
        ));
    }

    #[test]
    fn find_by_prefix() {
        let (mut store, _) = setup();
        let mut a = task("a");
        a.id = "task_abc123".into();
        let mut b = task("b");
        b.id = "task_abd456".into();
        store.add_task(&a).unwrap();
        store.add_task(&b).unwrap();

        assert_eq!(find_task(&store, "abc").unwrap().id, "task_abc123");
        assert_eq!(find_task(&store, "task_abd").unwrap().id, "task_abd456");
        assert!(matches!(find_task(&store, "ab"), Err(TaskError::Ambiguous(_))));
        assert!(matches!(find_task(&store, "zzz"), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn toggle_sets_and_clears_completed_at() {
        let (mut store, _) = setup();
        let t = task("Finish");
        store.add_task(&t).unwrap();

        let done = toggle_complete(&mut store, &t.id, START).unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        let undone = toggle_complete(&mut store, &t.id, START).unwrap();
        assert!(!undone.completed);
        assert!(undone.completed_at.is_none());
    }

    #[test]
    fn list_filters_and_sorts() {
        let (mut store, _) = setup();
        let mut late = Task::new("2025-05-14", "18:00", "late", Priority::Low, "");
        late.completed = true;
        let early = Task::new("2025-05-14", "08:00", "early", Priority::High, "");
        let other_day = Task::new("2025-05-13", "12:00", "yesterday", Priority::High, "");
        for t in [&late, &early, &other_day] {
            store.add_task(t).unwrap();
        }

        let texts = |tasks: Vec<Task>| tasks.into_iter().map(|t| t.text).collect::<Vec<_>>();
        assert_eq!(
            texts(list_tasks(&store, None, TaskFilter::All).unwrap()),
            vec!["yesterday", "early", "late"]
        );
        assert_eq!(
            texts(list_tasks(&store, Some("2025-05-14"), TaskFilter::Pending).unwrap()),
            vec!["early"]
        );
        assert_eq!(
            texts(list_tasks(&store, None, TaskFilter::Priority(Priority::High)).unwrap()),
            vec!["yesterday", "early"]
        );
    }

    #[test]
    fn edit_changes_only_given_fields() {
        let (mut store, mut scheduler) = setup();
        let t = task("Draft");
        store.add_task(&t).unwrap();
        let edit = TaskEdit {
            text: Some("Final".into()),
            priority: Some(Priority::High),
            ..TaskEdit::default()
        };
        let edited = edit_task(&mut store, &mut scheduler, &t.id, &edit).unwrap();
        assert_eq!(edited.task.text, "Final");
        assert_eq!(edited.task.priority, Priority::High);
        assert_eq!(edited.task.date, t.date);
        assert_eq!(store.task(&t.id).unwrap(), Some(edited.task));
    }

    #[test]
    fn edit_rejects_invalid_fields_without_saving() {
        let (mut store, mut scheduler) = setup();
        let t = task("Keep");
        store.add_task(&t).unwrap();
        let edit = TaskEdit {
            time: Some("25:99".into()),
            ..TaskEdit::default()
        };
        assert!(matches!(
            edit_task(&mut store, &mut scheduler, &t.id, &edit),
            Err(TaskError::InvalidTime(_))
        ));
        assert_eq!(store.task(&t.id).unwrap(), Some(t));
    }

    #[test]
    fn moving_a_task_moves_its_pending_alarms() {
        let (mut store, mut scheduler) = setup();
        let start = local_naive(START + 3_600_000).unwrap();
        let t = Task::new(
            start.format("%Y-%m-%d").to_string(),
            start.format("%H:%M").to_string(),
            "Meeting",
            Priority::Medium,
            "",
        );
        let old = save_task_with_alarm(
            &mut store,
            &mut scheduler,
            &t,
            Some(AlarmRequest::MinutesBefore(15)),
        )
        .unwrap()
        .unwrap();

        let later = start + chrono::Duration::hours(2);
        let edit = TaskEdit {
            time: Some(later.format("%H:%M").to_string()),
            date: Some(later.format("%Y-%m-%d").to_string()),
            ..TaskEdit::default()
        };
        let edited = edit_task(&mut store, &mut scheduler, &t.id, &edit).unwrap();
        assert_eq!(edited.dropped, 0);
        assert_eq!(edited.moved.len(), 1);
        let moved = &edited.moved[0];
        assert_eq!(moved.alarm_time, old.alarm_time + 2 * 3_600_000);
        assert_eq!(moved.title, old.title);

        let stored = store.all_alarms().unwrap();
        assert_eq!(stored, vec![moved.clone()]);
        assert_eq!(scheduler.task_alarms(&t.id), vec![moved]);
    }

    #[test]
    fn clearing_the_time_drops_pending_alarms() {
        let (mut store, mut scheduler) = setup();
        let start = local_naive(START + 3_600_000).unwrap();
        let t = Task::new(
            start.format("%Y-%m-%d").to_string(),
            start.format("%H:%M").to_string(),
            "Call",
            Priority::Low,
            "",
        );
        save_task_with_alarm(
            &mut store,
            &mut scheduler,
            &t,
            Some(AlarmRequest::MinutesBefore(5)),
        )
        .unwrap();
        let edit = TaskEdit {
            time: Some(String::new()),
            ..TaskEdit::default()
        };
        let edited = edit_task(&mut store, &mut scheduler, &t.id, &edit).unwrap();
        assert_eq!(edited.dropped, 1);
        assert!(edited.moved.is_empty());
        assert!(store.all_alarms().unwrap().is_empty());
    }
}
