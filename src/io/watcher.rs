use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::json_store::DB_FILE;

/// Watches the data directory for database writes made by other processes.
pub struct DatabaseWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<PathBuf>,
}

impl DatabaseWatcher {
    /// Start watching `data_dir`. Call `changed()` each loop iteration.
    pub fn start(data_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                // Atomic writes land as a rename onto taskflow.json; temp files and
                // the lock file are noise.
                for path in event.paths {
                    if path.file_name().and_then(|n| n.to_str()) == Some(DB_FILE) {
                        let _ = tx.send(path);
                    }
                }
            },
            Config::default(),
        )?;

        watcher.watch(data_dir, RecursiveMode::NonRecursive)?;
        Ok(DatabaseWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain pending events; true if the database changed since the last call
    pub fn changed(&self) -> bool {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}
