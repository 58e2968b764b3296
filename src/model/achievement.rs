use serde::{Deserialize, Serialize};

pub const FIRST_TASK: &str = "first_task";
pub const WEEK_STREAK: &str = "week_streak";
pub const TASK_MASTER: &str = "task_master";
pub const EARLY_BIRD: &str = "early_bird";
pub const NIGHT_OWL: &str = "night_owl";
pub const PRODUCTIVE_DAY: &str = "productive_day";

/// An unlockable milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<String>,
}

impl Achievement {
    fn locked(id: &str, name: &str, description: &str, icon: &str) -> Self {
        Achievement {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            unlocked: false,
            unlocked_at: None,
        }
    }
}

/// The achievements seeded into a new database
pub fn default_achievements() -> Vec<Achievement> {
    vec![
        Achievement::locked(FIRST_TASK, "First Task", "Created your first task", "🎯"),
        Achievement::locked(
            WEEK_STREAK,
            "Productive Week",
            "Completed tasks 7 days in a row",
            "🔥",
        ),
        Achievement::locked(TASK_MASTER, "Task Master", "Created 100 tasks", "👑"),
        Achievement::locked(EARLY_BIRD, "Early Bird", "Created a task before 6am", "🌅"),
        Achievement::locked(NIGHT_OWL, "Night Owl", "Created a task after 11pm", "🦉"),
        Achievement::locked(
            PRODUCTIVE_DAY,
            "Productive Day",
            "Scheduled 10 tasks for today",
            "⚡",
        ),
    ]
}
