use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::task::{Priority, Task};

/// Total and completed tasks in one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub total: usize,
    pub completed: usize,
}

impl Bucket {
    fn add(&mut self, task: &Task) {
        self.total += 1;
        if task.completed {
            self.completed += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Keyed by `YYYY-MM-DD`
    pub by_day: BTreeMap<String, Bucket>,
    /// Keyed by `YYYY-MM`
    pub by_month: BTreeMap<String, Bucket>,
    /// Rounded percentage
    pub completion_rate: u32,
    /// One decimal place
    pub avg_tasks_per_day: f64,
    pub most_productive_day: Option<String>,
    pub streak: u32,
}

impl Statistics {
    /// Rounded share of tasks with `priority`
    pub fn priority_percent(&self, priority: Priority) -> u32 {
        let count = match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        };
        percent(count, self.total)
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

pub fn calculate(tasks: &[Task], today: &str) -> Statistics {
    let mut stats = Statistics {
        total: tasks.len(),
        ..Statistics::default()
    };

    for task in tasks {
        if task.completed {
            stats.completed += 1;
        } else {
            stats.pending += 1;
        }
        match task.priority {
            Priority::High => stats.high += 1,
            Priority::Medium => stats.medium += 1,
            Priority::Low => stats.low += 1,
        }
        stats.by_day.entry(task.date.clone()).or_default().add(task);
        let month = task.date.get(..7).unwrap_or(&task.date).to_string();
        stats.by_month.entry(month).or_default().add(task);
    }

    stats.completion_rate = percent(stats.completed, stats.total);
    if !stats.by_day.is_empty() {
        let avg = stats.total as f64 / stats.by_day.len() as f64;
        stats.avg_tasks_per_day = (avg * 10.0).round() / 10.0;
    }

    // Earliest day wins a tie
    let mut best = 0;
    for (date, bucket) in &stats.by_day {
        if bucket.completed > best {
            best = bucket.completed;
            stats.most_productive_day = Some(date.clone());
        }
    }

    stats.streak = streak(&stats.by_day, today);
    stats
}

/// Days with completions counted newest first, stopping at the first day
/// without any. Today may still be empty without breaking the streak.
pub fn streak(by_day: &BTreeMap<String, Bucket>, today: &str) -> u32 {
    let mut streak = 0;
    for (date, bucket) in by_day.iter().rev() {
        if bucket.completed > 0 {
            streak += 1;
        } else if date != today {
            break;
        }
    }
    streak
}
