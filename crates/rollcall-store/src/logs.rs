//! Append-only audit log. The surrounding application records every
//! state-changing operation here (login, enrollment, attendance batches).

use crate::{Cohort, Store, StoreError};
use chrono::NaiveDateTime;
use rusqlite::Connection;

impl Store {
    /// Record one audit entry with the current wall-clock time.
    pub fn log_event(&self, actor: &str, action: &str, cohort: &Cohort) -> Result<(), StoreError> {
        log_event_at(&self.conn, actor, action, cohort, chrono::Local::now().naive_local())
    }
}

pub(crate) fn log_event_at(
    conn: &Connection,
    actor: &str,
    action: &str,
    cohort: &Cohort,
    now: NaiveDateTime,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO logs (actor, action, date, time, grade, section) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            actor,
            action,
            now.format("%Y-%m-%d").to_string(),
            now.format("%H:%M:%S").to_string(),
            cohort.grade,
            cohort.section,
        ],
    )?;
    tracing::debug!(actor, action, "audit entry written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_writes_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory(&dir.path().join("mirror.csv")).unwrap();
        store
            .log_event("teacher", "signed in", &Cohort::new("5", "A"))
            .unwrap();

        let (actor, action): (String, String) = store
            .conn
            .query_row("SELECT actor, action FROM logs", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(actor, "teacher");
        assert_eq!(action, "signed in");
    }
}
