use chrono::{NaiveDateTime, Timelike};
use tracing::info;

use crate::io::store::{Store, StoreError};
use crate::model::achievement::{
    Achievement, EARLY_BIRD, FIRST_TASK, NIGHT_OWL, PRODUCTIVE_DAY, TASK_MASTER, WEEK_STREAK,
    default_achievements,
};
use crate::ops::stats;
use crate::util::time::DATE_FORMAT;

/// Add any default achievement the store does not know yet. Returns how many were added.
pub fn seed_defaults(store: &mut dyn Store) -> Result<usize, StoreError> {
    let existing = store.achievements()?;
    let mut added = 0;
    for achievement in default_achievements() {
        if !existing.iter().any(|a| a.id == achievement.id) {
            store.save_achievement(&achievement)?;
            added += 1;
        }
    }
    Ok(added)
}

/// Ids earned by the current task list, evaluated at local time `now`
pub fn earned(store: &dyn Store, now: NaiveDateTime) -> Result<Vec<&'static str>, StoreError> {
    let tasks = store.all_tasks()?;
    let today = now.format(DATE_FORMAT).to_string();
    let mut ids = Vec::new();

    if tasks.len() == 1 {
        ids.push(FIRST_TASK);
    }
    if tasks.len() >= 100 {
        ids.push(TASK_MASTER);
    }
    if now.hour() < 6 {
        ids.push(EARLY_BIRD);
    }
    if now.hour() >= 23 {
        ids.push(NIGHT_OWL);
    }
    if tasks.iter().filter(|t| t.date == today).count() >= 10 {
        ids.push(PRODUCTIVE_DAY);
    }
    if stats::calculate(&tasks, &today).streak >= 7 {
        ids.push(WEEK_STREAK);
    }
    Ok(ids)
}

/// Unlock whatever was earned and not unlocked before. Returns the new unlocks.
pub fn check(
    store: &mut dyn Store,
    now: NaiveDateTime,
    stamp: &str,
) -> Result<Vec<Achievement>, StoreError> {
    let earned = earned(store, now)?;
    let known = store.achievements()?;
    let mut unlocked = Vec::new();

    for id in earned {
        let mut achievement = match known.iter().find(|a| a.id == id) {
            Some(a) => a.clone(),
            None => match default_achievements().into_iter().find(|a| a.id == id) {
                Some(a) => a,
                None => continue,
            },
        };
        if achievement.unlocked {
            continue;
        }
        achievement.unlocked = true;
        achievement.unlocked_at = Some(stamp.to_string());
        store.save_achievement(&achievement)?;
        info!(achievement = %achievement.id, "achievement unlocked");
        unlocked.push(achievement);
    }
    Ok(unlocked)
}
