use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{CONFIG_TEMPLATE, config_path};
use crate::io::json_store::{JsonStore, atomic_write};
use crate::io::paths::default_sound_path;
use crate::ops::achievements;

#[derive(Serialize)]
struct InitJson {
    data_dir: String,
    config_written: bool,
    achievements_seeded: usize,
}

pub fn cmd_init(
    data_dir: &Path,
    args: InitArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(data_dir)
        .map_err(|e| format!("could not create {}: {}", data_dir.display(), e))?;
    if let Some(sounds) = default_sound_path(data_dir).parent() {
        fs::create_dir_all(sounds)?;
    }

    let config_file = config_path(data_dir);
    let config_written = args.force || !config_file.exists();
    if config_written {
        atomic_write(&config_file, CONFIG_TEMPLATE.as_bytes())?;
    }

    let mut store = JsonStore::open(data_dir)?;
    if !store.exists() {
        store.flush()?;
    }
    let seeded = achievements::seed_defaults(&mut store)?;

    if json {
        let out = InitJson {
            data_dir: data_dir.display().to_string(),
            config_written,
            achievements_seeded: seeded,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Initialized TaskFlow in {}", data_dir.display());
        if !config_written {
            println!("  kept existing {} (use --force to rewrite)", config_file.display());
        }
        println!(
            "  put an alarm sound at {}",
            default_sound_path(data_dir).display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config_io::load_config;
    use crate::io::store::Store;
    use crate::model::config::AppConfig;

    #[test]
    fn init_creates_everything_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("data");
        cmd_init(&dir, InitArgs { force: false }, true).unwrap();

        assert!(dir.join("taskflow.json").exists());
        assert!(dir.join("sounds").is_dir());
        assert_eq!(load_config(&dir).unwrap(), AppConfig::default());
        assert_eq!(JsonStore::open(&dir).unwrap().achievements().unwrap().len(), 6);

        fs::write(config_path(&dir), "[alarm]\nsnooze_minutes = 9\n").unwrap();
        cmd_init(&dir, InitArgs { force: false }, true).unwrap();
        assert_eq!(load_config(&dir).unwrap().alarm.snooze_minutes, 9);
        assert_eq!(JsonStore::open(&dir).unwrap().achievements().unwrap().len(), 6);

        cmd_init(&dir, InitArgs { force: true }, true).unwrap();
        assert_eq!(load_config(&dir).unwrap().alarm.snooze_minutes, 5);
    }
}
