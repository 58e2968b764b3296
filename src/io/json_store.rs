use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::io::database::Database;
use crate::io::lock::StoreLock;
use crate::io::store::{Store, StoreError};

/// File name of the database document inside the data directory
pub const DB_FILE: &str = "taskflow.json";

/// Store backed by a single JSON document.
///
/// Every change re-reads the file under the directory lock, applies the
/// change, and replaces the file atomically, so concurrent `tf` processes
/// never lose each other's writes. Reads are served from the copy loaded
/// at open time (or the last write / `reload`).
#[derive(Debug)]
pub struct JsonStore {
    data_dir: PathBuf,
    path: PathBuf,
    db: Database,
}

impl JsonStore {
    /// Open the database in `data_dir`. A missing file is an empty database.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let path = data_dir.join(DB_FILE);
        let db = read_database(&path)?;
        Ok(JsonStore {
            data_dir: data_dir.to_path_buf(),
            path,
            db,
        })
    }

    /// Whether the database file exists on disk yet
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the current contents, creating the file if needed
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let _lock = StoreLock::acquire_default(&self.data_dir)?;
        write_database(&self.path, &self.db)
    }
}

impl Store for JsonStore {
    fn snapshot(&self) -> Result<&Database, StoreError> {
        Ok(&self.db)
    }

    fn apply(
        &mut self,
        change: &mut dyn FnMut(&mut Database) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let _lock = StoreLock::acquire_default(&self.data_dir)?;
        let current = read_database(&self.path)?;
        let mut next = current.clone();
        if let Err(e) = change(&mut next) {
            // Rejected against the file's contents; keep those as the view
            self.db = current;
            return Err(e);
        }
        write_database(&self.path, &next)?;
        self.db = next;
        Ok(())
    }

    fn reload(&mut self) -> Result<(), StoreError> {
        self.db = read_database(&self.path)?;
        debug!(path = %self.path.display(), "database reloaded");
        Ok(())
    }
}

fn read_database(path: &Path) -> Result<Database, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Database::default()),
        Err(e) => {
            return Err(StoreError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    if text.trim().is_empty() {
        return Ok(Database::default());
    }
    serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_database(path: &Path, db: &Database) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(db)?;
    atomic_write(path, json.as_bytes()).map_err(|e| StoreError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alarm, Priority, Task};
    use tempfile::TempDir;

    #[test]
    fn open_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::open(tmp.path()).unwrap();
        assert!(!store.exists());
        assert!(store.all_tasks().unwrap().is_empty());
    }

    #[test]
    fn writes_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonStore::open(tmp.path()).unwrap();
        let task = Task::new("2025-05-14", "09:00", "Write report", Priority::High, "");
        store.add_task(&task).unwrap();
        let alarm = Alarm::new(&task.id, 1_000, "t", "m", 0);
        store.add_alarm(&alarm).unwrap();

        let reopened = JsonStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.task(&task.id).unwrap(), Some(task));
        assert_eq!(reopened.active_alarms().unwrap(), vec![alarm]);
    }

    #[test]
    fn writes_from_two_handles_do_not_clobber() {
        let tmp = TempDir::new().unwrap();
        let mut first = JsonStore::open(tmp.path()).unwrap();
        let mut second = JsonStore::open(tmp.path()).unwrap();

        first
            .add_task(&Task::new("2025-05-14", "09:00", "a", Priority::Low, ""))
            .unwrap();
        second
            .add_task(&Task::new("2025-05-14", "10:00", "b", Priority::Low, ""))
            .unwrap();

        let reopened = JsonStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.all_tasks().unwrap().len(), 2);

        // `first` only sees the other write after reloading
        assert_eq!(first.all_tasks().unwrap().len(), 1);
        first.reload().unwrap();
        assert_eq!(first.all_tasks().unwrap().len(), 2);
    }

    #[test]
    fn concurrent_writers_keep_every_acknowledged_write() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let dir = dir.clone();
                std::thread::spawn(move || {
                    let mut store = JsonStore::open(&dir).unwrap();
                    for n in 0..15 {
                        let text = format!("writer {} task {}", writer, n);
                        let task = Task::new("2025-05-14", "09:00", text, Priority::Low, "");
                        store.add_task(&task).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = JsonStore::open(&dir).unwrap();
        assert_eq!(reopened.all_tasks().unwrap().len(), 8 * 15);
    }

    #[test]
    fn delete_from_one_handle_wins_over_stale_fire_in_another() {
        let tmp = TempDir::new().unwrap();
        let mut daemon = JsonStore::open(tmp.path()).unwrap();
        let mut alarm = Alarm::new("task_1", 1_000, "t", "m", 0);
        daemon.add_alarm(&alarm).unwrap();

        let mut cli = JsonStore::open(tmp.path()).unwrap();
        cli.delete_alarm(&alarm.id).unwrap();

        // The daemon's cached copy still lists the alarm
        assert_eq!(daemon.active_alarms().unwrap().len(), 1);
        alarm.mark_triggered(1_000);
        assert!(matches!(
            daemon.mark_alarm_triggered(&alarm),
            Err(StoreError::NotFound(_))
        ));
        assert!(daemon.all_alarms().unwrap().is_empty());
        assert!(JsonStore::open(tmp.path()).unwrap().all_alarms().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(DB_FILE), "not json {{{").unwrap();
        let err = JsonStore::open(tmp.path()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn write_into_missing_directory_fails_without_changing_cache() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("data");
        fs::create_dir_all(&dir).unwrap();
        let mut store = JsonStore::open(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let task = Task::new("2025-05-14", "09:00", "x", Priority::Low, "");
        assert!(store.add_task(&task).is_err());
        assert!(store.all_tasks().unwrap().is_empty());
    }
}
