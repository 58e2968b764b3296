use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::io::store::{ExportBundle, StoreError};
use crate::model::{Achievement, Alarm, Notebook, Task};

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Records that are addressed by a string key
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Task {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Alarm {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Achievement {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Insertion-ordered record table, serialized as a plain list of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "Vec<V>",
    into = "Vec<V>",
    bound(
        serialize = "V: Serialize + Clone + Keyed",
        deserialize = "V: DeserializeOwned + Keyed"
    )
)]
pub struct Table<V> {
    rows: IndexMap<String, V>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Table {
            rows: IndexMap::new(),
        }
    }
}

impl<V: Keyed> Table<V> {
    /// Insert a new record; fails if the key is taken
    pub fn insert_new(&mut self, row: V) -> Result<(), StoreError> {
        if self.rows.contains_key(row.key()) {
            return Err(StoreError::Duplicate(row.key().to_string()));
        }
        self.rows.insert(row.key().to_string(), row);
        Ok(())
    }

    /// Insert or replace, keeping the original position of a replaced record
    pub fn upsert(&mut self, row: V) {
        self.rows.insert(row.key().to_string(), row);
    }

    /// Remove by key, preserving the order of the remaining records
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.rows.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.rows.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<V: Keyed> From<Vec<V>> for Table<V> {
    fn from(rows: Vec<V>) -> Self {
        let mut table = Table::default();
        for row in rows {
            table.upsert(row);
        }
        table
    }
}

impl<V> From<Table<V>> for Vec<V> {
    fn from(table: Table<V>) -> Self {
        table.rows.into_values().collect()
    }
}

/// Everything TaskFlow persists, as one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default = "schema_version")]
    pub version: u32,
    #[serde(default)]
    pub tasks: Table<Task>,
    #[serde(default)]
    pub alarms: Table<Alarm>,
    #[serde(default)]
    pub notebook: Notebook,
    #[serde(default)]
    pub achievements: Table<Achievement>,
    #[serde(default)]
    pub settings: IndexMap<String, serde_json::Value>,
}

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Database {
    fn default() -> Self {
        Database {
            version: SCHEMA_VERSION,
            tasks: Table::default(),
            alarms: Table::default(),
            notebook: Notebook::default(),
            achievements: Table::default(),
            settings: IndexMap::new(),
        }
    }
}

impl Database {
    /// Alarms that have not fired, in insertion order
    pub fn active_alarms(&self) -> Vec<Alarm> {
        self.alarms.iter().filter(|a| !a.triggered).cloned().collect()
    }

    pub fn tasks_by_date(&self, date: &str) -> Vec<Task> {
        self.tasks.iter().filter(|t| t.date == date).cloned().collect()
    }

    /// Wipe every table, keeping the schema version
    pub fn clear(&mut self) {
        *self = Database::default();
    }

    pub fn export(&self, export_date: String) -> ExportBundle {
        ExportBundle {
            tasks: self.tasks.iter().cloned().collect(),
            notebook: self.notebook.content.clone(),
            achievements: self.achievements.iter().cloned().collect(),
            alarms: self.alarms.iter().cloned().collect(),
            export_date,
            version: self.version,
        }
    }

    /// Merge a bundle: every record is upserted; an empty notebook leaves ours alone
    pub fn import(&mut self, bundle: &ExportBundle, modified: String) {
        for task in &bundle.tasks {
            self.tasks.upsert(task.clone());
        }
        if !bundle.notebook.is_empty() {
            self.notebook = Notebook {
                content: bundle.notebook.clone(),
                last_modified: Some(modified),
            };
        }
        for achievement in &bundle.achievements {
            self.achievements.upsert(achievement.clone());
        }
        for alarm in &bundle.alarms {
            self.alarms.upsert(alarm.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use pretty_assertions::assert_eq;

    fn alarm(id: &str, task: &str, triggered: bool) -> Alarm {
        let mut a = Alarm::new(task, 1_000, "t", "m", 0);
        a.id = id.to_string();
        a.triggered = triggered;
        a
    }

    #[test]
    fn insert_new_rejects_duplicate_keys() {
        let mut table = Table::default();
        table.insert_new(alarm("a1", "t1", false)).unwrap();
        let err = table.insert_new(alarm("a1", "t2", false)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref id) if id == "a1"));
        assert_eq!(table.get("a1").unwrap().task_id, "t1");
    }

    #[test]
    fn remove_preserves_order() {
        let mut table = Table::default();
        for id in ["a1", "a2", "a3"] {
            table.upsert(alarm(id, "t", false));
        }
        table.remove("a2");
        let ids: Vec<&str> = table.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a3"]);
    }

    #[test]
    fn active_alarms_filters_triggered_in_insertion_order() {
        let mut db = Database::default();
        db.alarms.upsert(alarm("a1", "t", false));
        db.alarms.upsert(alarm("a2", "t", true));
        db.alarms.upsert(alarm("a3", "t", false));
        let ids: Vec<String> = db.active_alarms().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a1".to_string(), "a3".to_string()]);
    }

    #[test]
    fn tables_serialize_as_lists() {
        let mut db = Database::default();
        db.alarms.upsert(alarm("a1", "t", false));
        let json = serde_json::to_value(&db).unwrap();
        assert!(json["alarms"].is_array());
        assert_eq!(json["alarms"][0]["id"], "a1");

        let back: Database = serde_json::from_value(json).unwrap();
        assert_eq!(back, db);
    }

    #[test]
    fn empty_document_is_default() {
        let db: Database = serde_json::from_str("{}").unwrap();
        assert_eq!(db, Database::default());
    }

    #[test]
    fn import_upserts_and_keeps_notebook_when_bundle_is_empty() {
        let mut db = Database::default();
        db.notebook.content = "keep me".into();
        let mut task = Task::new("2025-05-14", "09:00", "old", Priority::Low, "");
        task.id = "task_1".into();
        db.tasks.upsert(task.clone());

        let mut updated = task.clone();
        updated.text = "new".into();
        let bundle = ExportBundle {
            tasks: vec![updated],
            alarms: vec![alarm("a1", "task_1", false)],
            ..ExportBundle::default()
        };
        db.import(&bundle, "now".into());

        assert_eq!(db.tasks.len(), 1);
        assert_eq!(db.tasks.get("task_1").unwrap().text, "new");
        assert_eq!(db.alarms.len(), 1);
        assert_eq!(db.notebook.content, "keep me");
    }
}
