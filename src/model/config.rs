use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration from taskflow.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// How often the scheduler scans for due alarms
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    /// Offset used by `tf add --remind`
    #[serde(default = "default_auto_minutes_before")]
    pub auto_minutes_before: u32,
    /// Alarm sound file. Defaults to `sounds/alarm.mp3` in the data directory.
    #[serde(default)]
    pub sound: Option<PathBuf>,
    /// Volume added per fade-in step (0.0 - 1.0)
    #[serde(default = "default_fade_step")]
    pub fade_step: f32,
    #[serde(default = "default_fade_interval_ms")]
    pub fade_interval_ms: u64,
    /// How long the window title blinks before it is restored
    #[serde(default = "default_title_blink_secs")]
    pub title_blink_secs: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        AlarmConfig {
            poll_interval_ms: default_poll_interval_ms(),
            snooze_minutes: default_snooze_minutes(),
            auto_minutes_before: default_auto_minutes_before(),
            sound: None,
            fade_step: default_fade_step(),
            fade_interval_ms: default_fade_interval_ms(),
            title_blink_secs: default_title_blink_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Desktop notifications. `false` behaves like a denied permission.
    #[serde(default = "default_true")]
    pub desktop: bool,
    /// Replacement tag shared by every alarm notification
    #[serde(default = "default_tag")]
    pub tag: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            desktop: true,
            tag: default_tag(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Terminal title restored after an alarm stops blinking it
    #[serde(default = "default_window_title")]
    pub window_title: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            window_title: default_window_title(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_snooze_minutes() -> u32 {
    5
}

fn default_auto_minutes_before() -> u32 {
    15
}

fn default_fade_step() -> f32 {
    0.02
}

fn default_fade_interval_ms() -> u64 {
    60
}

fn default_title_blink_secs() -> u64 {
    30
}

fn default_tag() -> String {
    "taskflow-alarm".to_string()
}

fn default_window_title() -> String {
    "TaskFlow - Organize your tasks".to_string()
}
