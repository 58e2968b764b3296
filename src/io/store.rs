use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::io::database::Database;
use crate::io::lock::LockError;
use crate::model::{Achievement, Alarm, Notebook, Task};

/// Error type for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("database {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize database: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error("record already exists: {0}")]
    Duplicate(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Portable dump of the whole database (`tf export` / `tf import`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub notebook: String,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    #[serde(default)]
    pub export_date: String,
    #[serde(default)]
    pub version: u32,
}

/// Key-value persistence for tasks, alarms, notebook, settings and achievements.
///
/// Implementors provide a read view and a transactional `apply`; the record
/// operations are built on those two. A change passed to `apply` must be
/// discarded when it cannot be persisted, so callers can treat every `Err`
/// as "nothing happened".
pub trait Store {
    /// Current contents
    fn snapshot(&self) -> Result<&Database, StoreError>;

    /// Apply `change` and persist the result
    fn apply(
        &mut self,
        change: &mut dyn FnMut(&mut Database) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;

    /// Pick up changes written by other processes
    fn reload(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    // --- Alarms ---

    /// Alarms with `triggered = false`
    fn active_alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(self.snapshot()?.active_alarms())
    }

    fn all_alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(self.snapshot()?.alarms.iter().cloned().collect())
    }

    /// Insert a new alarm; fails with `Duplicate` if the id exists
    fn add_alarm(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| db.alarms.insert_new(alarm.clone()))
    }

    /// Upsert by id
    fn update_alarm(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.alarms.upsert(alarm.clone());
            Ok(())
        })
    }

    /// Store the fired state of an alarm that still exists. A deleted alarm
    /// stays deleted and yields `NotFound`.
    fn mark_alarm_triggered(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            if db.alarms.get(&alarm.id).is_none() {
                return Err(StoreError::NotFound(alarm.id.clone()));
            }
            db.alarms.upsert(alarm.clone());
            Ok(())
        })
    }

    /// Delete by id; deleting an unknown id succeeds
    fn delete_alarm(&mut self, id: &str) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.alarms.remove(id);
            Ok(())
        })
    }

    // --- Tasks ---

    fn task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.snapshot()?.tasks.get(id).cloned())
    }

    fn all_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.snapshot()?.tasks.iter().cloned().collect())
    }

    fn tasks_by_date(&self, date: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self.snapshot()?.tasks_by_date(date))
    }

    fn add_task(&mut self, task: &Task) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| db.tasks.insert_new(task.clone()))
    }

    fn update_task(&mut self, task: &Task) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.tasks.upsert(task.clone());
            Ok(())
        })
    }

    fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.tasks.remove(id);
            Ok(())
        })
    }

    // --- Settings ---

    fn setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.snapshot()?.settings.get(key).cloned())
    }

    fn save_setting(&mut self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.settings.insert(key.to_string(), value.clone());
            Ok(())
        })
    }

    // --- Notebook ---

    fn notebook(&self) -> Result<Notebook, StoreError> {
        Ok(self.snapshot()?.notebook.clone())
    }

    fn save_notebook(&mut self, content: &str, modified: &str) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.notebook = Notebook {
                content: content.to_string(),
                last_modified: Some(modified.to_string()),
            };
            Ok(())
        })
    }

    // --- Achievements ---

    fn achievements(&self) -> Result<Vec<Achievement>, StoreError> {
        Ok(self.snapshot()?.achievements.iter().cloned().collect())
    }

    fn save_achievement(&mut self, achievement: &Achievement) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.achievements.upsert(achievement.clone());
            Ok(())
        })
    }

    // --- Maintenance ---

    fn clear_all(&mut self) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.clear();
            Ok(())
        })
    }

    fn export(&self, export_date: &str) -> Result<ExportBundle, StoreError> {
        Ok(self.snapshot()?.export(export_date.to_string()))
    }

    fn import(&mut self, bundle: &ExportBundle, modified: &str) -> Result<(), StoreError> {
        self.apply(&mut |db: &mut Database| {
            db.import(bundle, modified.to_string());
            Ok(())
        })
    }
}

/// Volatile store, used by tests and as a fallback when no data directory is usable
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    db: Database,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(db: Database) -> Self {
        MemoryStore { db }
    }
}

impl Store for MemoryStore {
    fn snapshot(&self) -> Result<&Database, StoreError> {
        Ok(&self.db)
    }

    fn apply(
        &mut self,
        change: &mut dyn FnMut(&mut Database) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut next = self.db.clone();
        change(&mut next)?;
        self.db = next;
        Ok(())
    }
}
