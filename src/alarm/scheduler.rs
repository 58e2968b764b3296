use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::alarm::clock::Clock;
use crate::alarm::interval::Interval;
use crate::io::store::{Store, StoreError};
use crate::model::alarm::{Alarm, snooze_task_id};
use crate::model::task::Task;
use crate::notification::Notifier;

/// Message used when neither the alarm nor the task provides one
pub const DEFAULT_MESSAGE: &str = "Task reminder!";
pub const SNOOZE_TITLE: &str = "Snooze over";
pub const SNOOZE_MESSAGE: &str = "Time to get back to work!";

/// What happened to one due alarm during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Marked triggered and handed to the notifier
    Delivered,
    /// Marked triggered, but its task is gone so nothing was shown
    TaskMissing,
    /// The triggered flag could not be persisted; nothing was shown
    PersistFailed,
    /// Deleted from the store by someone else before it rang
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired {
    pub alarm_id: String,
    pub outcome: FireOutcome,
}

/// Owns the active (untriggered) alarms and fires each at most once.
///
/// The scheduler never holds the store; every operation borrows it, so the
/// service object that owns both decides the ordering.
pub struct AlarmScheduler {
    active: Vec<Alarm>,
    clock: Arc<dyn Clock>,
    poll_period_ms: i64,
    poll: Option<Interval>,
}

impl AlarmScheduler {
    pub fn new(clock: Arc<dyn Clock>, poll_period_ms: u64) -> Self {
        AlarmScheduler {
            active: Vec::new(),
            clock,
            poll_period_ms: i64::try_from(poll_period_ms).unwrap_or(i64::MAX),
            poll: None,
        }
    }

    /// Load untriggered alarms and start polling. A failed load starts empty.
    pub fn init(&mut self, store: &dyn Store) {
        self.load(store);
        self.start();
        info!(count = self.active.len(), "alarm scheduler started");
    }

    /// Replace the active set with what the store holds. Returns false (and
    /// keeps the previous set) if the store cannot be read.
    pub fn resync(&mut self, store: &mut dyn Store) -> bool {
        if let Err(e) = store.reload() {
            warn!(error = %e, "could not reload alarms; keeping the current set");
            return false;
        }
        match store.active_alarms() {
            Ok(alarms) => {
                self.active = alarms;
                debug!(count = self.active.len(), "active alarms resynced");
                true
            }
            Err(e) => {
                warn!(error = %e, "could not reload alarms; keeping the current set");
                false
            }
        }
    }

    fn load(&mut self, store: &dyn Store) {
        self.active = match store.active_alarms() {
            Ok(alarms) => alarms,
            Err(e) => {
                error!(error = %e, "could not load alarms; starting with none");
                Vec::new()
            }
        };
    }

    /// Start (or restart) the poll timer
    pub fn start(&mut self) {
        self.poll = Some(Interval::starting_at(
            self.clock.now_ms(),
            self.poll_period_ms,
        ));
    }

    /// Cancel the poll timer. The active set is kept.
    pub fn shutdown(&mut self) {
        self.poll = None;
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    /// When the next poll is due, if polling
    pub fn next_deadline(&self) -> Option<i64> {
        self.poll.as_ref().map(Interval::next_due)
    }

    /// Alarms not yet triggered, in insertion order
    pub fn active(&self) -> &[Alarm] {
        &self.active
    }

    /// Active alarms belonging to `task_id`
    pub fn task_alarms(&self, task_id: &str) -> Vec<&Alarm> {
        self.active.iter().filter(|a| a.task_id == task_id).collect()
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Persist and activate a new alarm. Past times are accepted and fire on
    /// the next poll. Returns `None` if the store rejects the write.
    pub fn schedule(
        &mut self,
        store: &mut dyn Store,
        task_id: &str,
        alarm_time: i64,
        title: &str,
        message: &str,
    ) -> Option<Alarm> {
        let alarm = Alarm::new(task_id, alarm_time, title, message, self.clock.now_ms());
        match store.add_alarm(&alarm) {
            Ok(()) => {
                info!(alarm = %alarm.id, task = %task_id, at = alarm_time, "alarm scheduled");
                self.active.push(alarm.clone());
                Some(alarm)
            }
            Err(e) => {
                error!(task = %task_id, error = %e, "could not schedule alarm");
                None
            }
        }
    }

    /// Schedule a reminder `minutes_before` the task starts. Skipped (`None`)
    /// when the task has no date/time or the reminder time already passed.
    pub fn schedule_auto(
        &mut self,
        store: &mut dyn Store,
        task: &Task,
        minutes_before: u32,
    ) -> Option<Alarm> {
        let starts_at = task.starts_at_millis()?;
        let alarm_time = starts_at - i64::from(minutes_before) * 60_000;
        if alarm_time < self.clock.now_ms() {
            debug!(task = %task.id, "reminder time already passed; not scheduling");
            return None;
        }
        self.schedule(
            store,
            &task.id,
            alarm_time,
            &format!("Reminder: {}", task.text),
            &format!("Your task starts in {} minutes!", minutes_before),
        )
    }

    /// Schedule an independent follow-up alarm `minutes` from now
    pub fn snooze(&mut self, store: &mut dyn Store, minutes: u32) -> Option<Alarm> {
        let now = self.clock.now_ms();
        let alarm = self.schedule(
            store,
            &snooze_task_id(now),
            now + i64::from(minutes) * 60_000,
            SNOOZE_TITLE,
            SNOOZE_MESSAGE,
        );
        if alarm.is_some() {
            info!(minutes, "alarm snoozed");
        }
        alarm
    }

    /// Remove an alarm from the store and the active set. Unknown ids succeed.
    pub fn cancel(&mut self, store: &mut dyn Store, alarm_id: &str) -> bool {
        match store.delete_alarm(alarm_id) {
            Ok(()) => {
                self.active.retain(|a| a.id != alarm_id);
                info!(alarm = %alarm_id, "alarm cancelled");
                true
            }
            Err(e) => {
                error!(alarm = %alarm_id, error = %e, "could not cancel alarm");
                false
            }
        }
    }

    /// Cancel every alarm of a task, active or already fired. True only if
    /// every cancellation succeeded.
    pub fn cancel_all_for_task(&mut self, store: &mut dyn Store, task_id: &str) -> bool {
        let mut ids: Vec<String> = self
            .active
            .iter()
            .filter(|a| a.task_id == task_id)
            .map(|a| a.id.clone())
            .collect();
        match store.all_alarms() {
            Ok(stored) => {
                for alarm in stored.into_iter().filter(|a| a.task_id == task_id) {
                    if !ids.contains(&alarm.id) {
                        ids.push(alarm.id);
                    }
                }
            }
            Err(e) => warn!(task = %task_id, error = %e, "could not list stored alarms"),
        }

        let mut all_ok = true;
        for id in ids {
            all_ok &= self.cancel(store, &id);
        }
        all_ok
    }

    // -----------------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------------

    /// Run one poll if the poll timer is due
    pub fn tick(&mut self, store: &mut dyn Store, notifier: &mut dyn Notifier) -> Vec<Fired> {
        let now = self.clock.now_ms();
        let due = self.poll.as_mut().is_some_and(|poll| poll.fire(now));
        if due {
            self.fire_due(store, notifier, now)
        } else {
            Vec::new()
        }
    }

    /// Fire every alarm due at `now`, one after another in insertion order
    pub fn fire_due(
        &mut self,
        store: &mut dyn Store,
        notifier: &mut dyn Notifier,
        now: i64,
    ) -> Vec<Fired> {
        let due: Vec<Alarm> = self
            .active
            .iter()
            .filter(|a| a.is_due(now))
            .cloned()
            .collect();
        due.into_iter()
            .map(|alarm| self.fire(store, notifier, alarm, now))
            .collect()
    }

    /// The triggered flag is committed before anything is shown: a failed
    /// write means a missed alarm, never a repeated one.
    fn fire(
        &mut self,
        store: &mut dyn Store,
        notifier: &mut dyn Notifier,
        mut alarm: Alarm,
        now: i64,
    ) -> Fired {
        alarm.mark_triggered(now);
        let persisted = store.mark_alarm_triggered(&alarm);
        self.active.retain(|a| a.id != alarm.id);

        let outcome = match persisted {
            Err(StoreError::NotFound(_)) => {
                info!(alarm = %alarm.id, "alarm was cancelled elsewhere; not ringing");
                FireOutcome::Cancelled
            }
            Err(e) => {
                error!(alarm = %alarm.id, error = %e, "could not mark alarm triggered; skipping notification");
                FireOutcome::PersistFailed
            }
            Ok(()) => match resolve_text(store, &alarm) {
                Some((title, message)) => {
                    info!(alarm = %alarm.id, title = %title, "alarm fired");
                    notifier.deliver(&title, &message);
                    FireOutcome::Delivered
                }
                None => {
                    warn!(alarm = %alarm.id, task = %alarm.task_id, "task for alarm not found; not notifying");
                    FireOutcome::TaskMissing
                }
            },
        };
        Fired {
            alarm_id: alarm.id,
            outcome,
        }
    }
}

/// Title and message to show for a fired alarm, or `None` when its task is gone
fn resolve_text(store: &dyn Store, alarm: &Alarm) -> Option<(String, String)> {
    if alarm.is_snooze() {
        return Some((
            non_empty_or(&alarm.title, SNOOZE_TITLE),
            non_empty_or(&alarm.message, SNOOZE_MESSAGE),
        ));
    }
    let task = match store.task(&alarm.task_id) {
        Ok(task) => task?,
        Err(e) => {
            warn!(task = %alarm.task_id, error = %e, "could not look up task");
            return None;
        }
    };
    Some((
        non_empty_or(&alarm.title, &task.text),
        non_empty_or(&alarm.message, DEFAULT_MESSAGE),
    ))
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
