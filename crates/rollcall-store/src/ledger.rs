//! Attendance ledger — at most one record per identity per calendar day,
//! written to the relational table and the flat mirror as one logical unit.

use crate::logs;
use crate::mirror::MirrorRow;
use crate::{Cohort, Store, StoreError};
use chrono::NaiveDateTime;
use std::collections::BTreeSet;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";
const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Audit action recorded once per batch with new writes.
pub const ACTION_ATTENDANCE_TAKEN: &str = "attendance taken";

/// Outcome of one `submit` batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Identities recorded by this call.
    pub written: BTreeSet<String>,
    /// Identities that already had a record for the day.
    pub skipped: BTreeSet<String>,
}

impl Store {
    /// Record attendance for a batch of matched identities.
    ///
    /// Identities are processed in set order. Per identity: if a
    /// relational row for (identity, day) exists it is skipped; otherwise
    /// a row is appended to the attendance table and mirrored to the flat
    /// file. A mirror failure after a successful relational insert
    /// surfaces as [`StoreError::PartialWriteDivergence`] so the caller
    /// can reconcile via [`Store::rebuild_mirror`].
    ///
    /// Exactly one audit log entry is written per batch that produced new
    /// rows — never one per identity. Safe to retry: a repeat call on the
    /// same day skips everything and logs nothing.
    pub fn submit(
        &mut self,
        identities: &BTreeSet<String>,
        actor: &str,
        cohort: &Cohort,
        now: NaiveDateTime,
    ) -> Result<SubmitOutcome, StoreError> {
        let date = now.format(DATE_FMT).to_string();
        let time = now.format(TIME_FMT).to_string();
        let timestamp = now.format(TIMESTAMP_FMT).to_string();

        let mut outcome = SubmitOutcome::default();

        for identity in identities {
            if self.has_record_for_day(identity, &date)? {
                tracing::debug!(identity = %identity, date = %date, "already recorded today");
                outcome.skipped.insert(identity.clone());
                continue;
            }

            // Cohort comes from the enrollment row when we have one; a
            // probe matched against an unenrolled reference image falls
            // back to the submitting actor's cohort.
            let row_cohort = self
                .student_cohort(identity)?
                .unwrap_or_else(|| cohort.clone());

            self.conn.execute(
                "INSERT INTO attendance (identity, grade, section, timestamp) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![identity, row_cohort.grade, row_cohort.section, timestamp],
            )?;

            self.mirror
                .append(MirrorRow {
                    identity: identity.clone(),
                    date: date.clone(),
                    time: time.clone(),
                })
                .map_err(|err| StoreError::PartialWriteDivergence {
                    identity: identity.clone(),
                    detail: format!("relational row written, mirror append failed: {err}"),
                })?;

            tracing::info!(identity = %identity, date = %date, "attendance recorded");
            outcome.written.insert(identity.clone());
        }

        if !outcome.written.is_empty() {
            logs::log_event_at(&self.conn, actor, ACTION_ATTENDANCE_TAKEN, cohort, now)?;
        }

        tracing::info!(
            written = outcome.written.len(),
            skipped = outcome.skipped.len(),
            "submit batch complete"
        );
        Ok(outcome)
    }

    /// Regenerate the mirror rows for one calendar day from the relational
    /// table. Reconciliation path after a detected divergence; the
    /// relational table is ground truth.
    pub fn rebuild_mirror(&self, date: chrono::NaiveDate) -> Result<usize, StoreError> {
        let date_str = date.format(DATE_FMT).to_string();
        let mut stmt = self.conn.prepare(
            "SELECT identity, timestamp FROM attendance
             WHERE date(timestamp) = ?1
             ORDER BY timestamp ASC",
        )?;
        let rows: Vec<MirrorRow> = stmt
            .query_map([&date_str], |row| {
                let identity: String = row.get(0)?;
                let timestamp: String = row.get(1)?;
                Ok((identity, timestamp))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(identity, timestamp)| {
                let time = timestamp
                    .split_once(' ')
                    .map(|(_, t)| t.to_string())
                    .unwrap_or_default();
                MirrorRow {
                    identity,
                    date: date_str.clone(),
                    time,
                }
            })
            .collect();

        let count = rows.len();
        self.mirror
            .replace_day(&date_str, rows)
            .map_err(|source| StoreError::Mirror {
                path: self.mirror.path().to_path_buf(),
                source,
            })?;

        tracing::info!(date = %date_str, rows = count, "mirror rebuilt from relational table");
        Ok(count)
    }

    fn has_record_for_day(&self, identity: &str, date: &str) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM attendance WHERE identity = ?1 AND date(timestamp) = ?2",
            rusqlite::params![identity, date],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::students::Student;
    use chrono::NaiveDate;

    fn day(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn ids(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn test_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory(&dir.path().join("mirror.csv")).unwrap();
        (store, dir)
    }

    fn attendance_rows(store: &Store, identity: &str, date: &str) -> i64 {
        store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM attendance WHERE identity = ?1 AND date(timestamp) = ?2",
                rusqlite::params![identity, date],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn log_rows(store: &Store) -> i64 {
        store
            .conn
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_submit_writes_then_skips() {
        let (mut store, _dir) = test_store();
        let cohort = Cohort::new("5", "A");
        let batch = ids(&["S001", "S002"]);

        let first = store.submit(&batch, "teacher", &cohort, day(8, 0, 0)).unwrap();
        assert_eq!(first.written, batch);
        assert!(first.skipped.is_empty());

        let second = store.submit(&batch, "teacher", &cohort, day(9, 30, 0)).unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.skipped, batch);
    }

    #[test]
    fn test_no_duplicate_rows_per_identity_and_day() {
        let (mut store, _dir) = test_store();
        let cohort = Cohort::new("5", "A");

        store.submit(&ids(&["S001"]), "teacher", &cohort, day(8, 0, 0)).unwrap();
        store.submit(&ids(&["S001"]), "teacher", &cohort, day(10, 0, 0)).unwrap();
        store.submit(&ids(&["S001", "S003"]), "teacher", &cohort, day(11, 0, 0)).unwrap();

        assert_eq!(attendance_rows(&store, "S001", "2024-03-01"), 1);
        assert_eq!(attendance_rows(&store, "S003", "2024-03-01"), 1);
    }

    #[test]
    fn test_one_log_entry_per_batch_with_writes() {
        let (mut store, _dir) = test_store();
        let cohort = Cohort::new("5", "A");

        store
            .submit(&ids(&["S001", "S002", "S003"]), "teacher", &cohort, day(8, 0, 0))
            .unwrap();
        assert_eq!(log_rows(&store), 1);

        // All-skipped batch logs nothing.
        store
            .submit(&ids(&["S001", "S002"]), "teacher", &cohort, day(9, 0, 0))
            .unwrap();
        assert_eq!(log_rows(&store), 1);
    }

    #[test]
    fn test_cohort_resolved_from_enrollment() {
        let (mut store, _dir) = test_store();
        store
            .add_student(&Student {
                identity: "S001".into(),
                name: "Ana".into(),
                cohort: Cohort::new("6", "B"),
                photo: None,
            })
            .unwrap();

        store
            .submit(&ids(&["S001"]), "teacher", &Cohort::new("5", "A"), day(8, 0, 0))
            .unwrap();

        let (grade, section): (String, String) = store
            .conn
            .query_row(
                "SELECT grade, section FROM attendance WHERE identity = 'S001'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!((grade.as_str(), section.as_str()), ("6", "B"));
    }

    #[test]
    fn test_mirror_stays_in_step_with_table() {
        let (mut store, _dir) = test_store();
        let cohort = Cohort::new("5", "A");
        store
            .submit(&ids(&["S001", "S002"]), "teacher", &cohort, day(8, 0, 0))
            .unwrap();

        let rows = store.mirror().read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.date == "2024-03-01"));
    }

    #[test]
    fn test_mirror_failure_surfaces_divergence() {
        let dir = tempfile::tempdir().unwrap();
        // Pointing the mirror at a directory makes every write fail.
        let mut store = Store::open_in_memory(dir.path()).unwrap();
        let cohort = Cohort::new("5", "A");

        let err = store
            .submit(&ids(&["S001"]), "teacher", &cohort, day(8, 0, 0))
            .unwrap_err();
        assert!(matches!(err, StoreError::PartialWriteDivergence { ref identity, .. } if identity == "S001"));

        // The relational row exists — exactly the divergence reconciliation fixes.
        assert_eq!(attendance_rows(&store, "S001", "2024-03-01"), 1);
    }

    #[test]
    fn test_rebuild_mirror_from_relational_table() {
        let (mut store, dir) = test_store();
        let cohort = Cohort::new("5", "A");
        store
            .submit(&ids(&["S001", "S002"]), "teacher", &cohort, day(8, 0, 5))
            .unwrap();

        // Lose the mirror, then regenerate the day.
        std::fs::remove_file(dir.path().join("mirror.csv")).unwrap();
        let count = store
            .rebuild_mirror(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .unwrap();
        assert_eq!(count, 2);

        let rows = store.mirror().read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.identity == "S001" && r.time == "08:00:05"));
    }

    #[test]
    fn test_next_day_writes_again() {
        let (mut store, _dir) = test_store();
        let cohort = Cohort::new("5", "A");
        store.submit(&ids(&["S001"]), "teacher", &cohort, day(8, 0, 0)).unwrap();

        let next_day = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let outcome = store.submit(&ids(&["S001"]), "teacher", &cohort, next_day).unwrap();
        assert_eq!(outcome.written, ids(&["S001"]));
        assert_eq!(attendance_rows(&store, "S001", "2024-03-02"), 1);
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let (mut store, _dir) = test_store();
        let outcome = store
            .submit(&BTreeSet::new(), "teacher", &Cohort::new("5", "A"), day(8, 0, 0))
            .unwrap();
        assert!(outcome.written.is_empty());
        assert!(outcome.skipped.is_empty());
        assert_eq!(log_rows(&store), 0);
    }

    #[test]
    fn test_mirror_path_accessor() {
        let (store, dir) = test_store();
        assert_eq!(store.mirror().path(), dir.path().join("mirror.csv"));
    }
}
