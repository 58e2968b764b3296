use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::json_store::atomic_write;
use crate::model::config::AppConfig;

/// File name of the configuration inside the data directory
pub const CONFIG_FILE: &str = "taskflow.toml";

/// Written by `tf init`
pub const CONFIG_TEMPLATE: &str = r#"# TaskFlow configuration

[alarm]
poll_interval_ms = 1000
snooze_minutes = 5
auto_minutes_before = 15
# sound = "/path/to/alarm.mp3"
fade_step = 0.02
fade_interval_ms = 60
title_blink_secs = 30

[notifications]
desktop = true
tag = "taskflow-alarm"

[ui]
window_title = "TaskFlow - Organize your tasks"
"#;

/// Error type for configuration I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not parse taskflow.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not edit taskflow.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("invalid config key: {0}")]
    InvalidKey(String),
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing. A missing file yields
/// defaults and an empty document.
pub fn read_config(data_dir: &Path) -> Result<(AppConfig, toml_edit::DocumentMut), ConfigError> {
    let path = config_path(data_dir);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    let config: AppConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Load just the parsed config
pub fn load_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    read_config(data_dir).map(|(config, _)| config)
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(data_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = config_path(data_dir);
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|e| ConfigError::WriteError { path, source: e })
}

/// Look up a dotted key (`alarm.snooze_minutes`) and render its value
pub fn get_value(doc: &toml_edit::DocumentMut, key: &str) -> Option<String> {
    let mut item = doc.as_item();
    for part in key.split('.') {
        item = item.get(part)?;
    }
    match item {
        toml_edit::Item::Value(toml_edit::Value::String(s)) => Some(s.value().clone()),
        toml_edit::Item::Value(v) => Some(v.to_string().trim().to_string()),
        toml_edit::Item::Table(t) => Some(t.to_string()),
        _ => None,
    }
}

/// Set a dotted key, creating intermediate tables. The raw value is parsed as
/// a TOML value when possible (`true`, `10`, `0.5`) and stored as a string otherwise.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidKey(key.to_string()));
    }
    let (last, tables) = parts
        .split_last()
        .ok_or_else(|| ConfigError::InvalidKey(key.to_string()))?;

    let mut table = doc.as_table_mut();
    for name in tables {
        if !table.contains_key(name) {
            table.insert(name, toml_edit::Item::Table(toml_edit::Table::new()));
        }
        table = table[*name]
            .as_table_mut()
            .ok_or_else(|| ConfigError::InvalidKey(key.to_string()))?;
    }
    table[*last] = toml_edit::value(parse_raw_value(raw));
    Ok(())
}

fn parse_raw_value(raw: &str) -> toml_edit::Value {
    match raw.parse::<toml_edit::Value>() {
        Ok(v) if !matches!(v, toml_edit::Value::InlineTable(_)) => v.decorated("", ""),
        _ => toml_edit::Value::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let (config, doc) = read_config(tmp.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(doc.to_string().is_empty());
    }

    #[test]
    fn template_parses_to_defaults() {
        let config: AppConfig = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn round_trip_preserves_formatting() {
        let tmp = TempDir::new().unwrap();
        fs::write(config_path(tmp.path()), CONFIG_TEMPLATE).unwrap();
        let (_, doc) = read_config(tmp.path()).unwrap();
        write_config(tmp.path(), &doc).unwrap();
        let written = fs::read_to_string(config_path(tmp.path())).unwrap();
        assert_eq!(written, CONFIG_TEMPLATE);
    }

    #[test]
    fn set_value_typed_and_string() {
        let mut doc: toml_edit::DocumentMut = CONFIG_TEMPLATE.parse().unwrap();
        set_value(&mut doc, "alarm.snooze_minutes", "10").unwrap();
        set_value(&mut doc, "notifications.desktop", "false").unwrap();
        set_value(&mut doc, "alarm.sound", "/tmp/bell.mp3").unwrap();

        let config: AppConfig = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.alarm.snooze_minutes, 10);
        assert!(!config.notifications.desktop);
        assert_eq!(
            config.alarm.sound,
            Some(std::path::PathBuf::from("/tmp/bell.mp3"))
        );
        // Comments elsewhere survive the edit
        assert!(doc.to_string().contains("# TaskFlow configuration"));
    }

    #[test]
    fn set_value_creates_missing_tables() {
        let mut doc = toml_edit::DocumentMut::new();
        set_value(&mut doc, "ui.window_title", "My Tasks").unwrap();
        assert_eq!(get_value(&doc, "ui.window_title"), Some("My Tasks".into()));
    }

    #[test]
    fn get_value_renders_scalars() {
        let doc: toml_edit::DocumentMut = CONFIG_TEMPLATE.parse().unwrap();
        assert_eq!(get_value(&doc, "alarm.snooze_minutes"), Some("5".into()));
        assert_eq!(get_value(&doc, "notifications.desktop"), Some("true".into()));
        assert_eq!(get_value(&doc, "alarm.missing"), None);
    }

    #[test]
    fn empty_key_segment_is_rejected() {
        let mut doc = toml_edit::DocumentMut::new();
        assert!(matches!(
            set_value(&mut doc, "alarm..x", "1"),
            Err(ConfigError::InvalidKey(_))
        ));
    }
}
