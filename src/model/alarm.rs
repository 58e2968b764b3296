use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::time::rfc3339_from_millis;

/// Task id prefix carried by alarms created through snooze
pub const SNOOZE_TASK_PREFIX: &str = "snooze_";

/// A scheduled point-in-time reminder tied to a task.
///
/// Serialized in camelCase to match the persisted record layout
/// (`taskId`, `alarmTime`, `triggeredAt`, `createdAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: String,
    /// Owning task. Weak: the task may already be gone when the alarm fires.
    pub task_id: String,
    /// Due instant in epoch milliseconds
    pub alarm_time: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// Flips false → true exactly once
    #[serde(default)]
    pub triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<String>,
    pub created_at: String,
}

impl Alarm {
    /// Build a fresh, untriggered alarm with a generated id
    pub fn new(
        task_id: impl Into<String>,
        alarm_time: i64,
        title: impl Into<String>,
        message: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Alarm {
            id: new_alarm_id(),
            task_id: task_id.into(),
            alarm_time,
            title: title.into(),
            message: message.into(),
            triggered: false,
            triggered_at: None,
            created_at: rfc3339_from_millis(now_ms),
        }
    }

    /// True when the alarm has not fired yet and its time has come
    pub fn is_due(&self, now_ms: i64) -> bool {
        !self.triggered && now_ms >= self.alarm_time
    }

    /// Record the firing transition. A second call keeps the first stamp.
    pub fn mark_triggered(&mut self, now_ms: i64) {
        if self.triggered {
            return;
        }
        self.triggered = true;
        self.triggered_at = Some(rfc3339_from_millis(now_ms));
    }

    /// Whether this alarm continues a snoozed alarm rather than belonging to a task
    pub fn is_snooze(&self) -> bool {
        self.task_id.starts_with(SNOOZE_TASK_PREFIX)
    }
}

pub fn new_alarm_id() -> String {
    format!("alarm_{}", Uuid::new_v4().simple())
}

/// Synthetic task id for a snooze follow-up created at `now_ms`
pub fn snooze_task_id(now_ms: i64) -> String {
    format!("{}{}", SNOOZE_TASK_PREFIX, now_ms)
}
