use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::time::{local_millis, parse_date, parse_time};

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Some(Priority::High),
            "medium" | "med" | "m" => Some(Priority::Medium),
            "low" | "l" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task on a calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    /// Start time, `HH:MM` (may be empty for legacy records)
    #[serde(default)]
    pub time: String,
    pub text: String,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Task {
    /// Create a new, open task with a generated id
    pub fn new(
        date: impl Into<String>,
        time: impl Into<String>,
        text: impl Into<String>,
        priority: Priority,
        created_at: impl Into<String>,
    ) -> Self {
        Task {
            id: new_task_id(),
            date: date.into(),
            time: time.into(),
            text: text.into(),
            priority,
            completed: false,
            created_at: created_at.into(),
            completed_at: None,
        }
    }

    /// Local start instant in epoch milliseconds, if date and time are both set
    pub fn starts_at_millis(&self) -> Option<i64> {
        let date = parse_date(&self.date)?;
        let time = parse_time(&self.time)?;
        local_millis(date, time)
    }
}

pub fn new_task_id() -> String {
    format!("task_{}", Uuid::new_v4().simple())
}
