//! Per-day, per-cohort report extract, sourced solely from the relational
//! table (never the mirror).

use crate::{Cohort, Store, StoreError};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportRow {
    pub identity: String,
    pub grade: String,
    pub section: String,
    /// Full `YYYY-MM-DD HH:MM:SS` timestamp of the attendance row.
    pub timestamp: String,
}

impl Store {
    /// Attendance rows for exactly this cohort and calendar day, ordered
    /// by timestamp ascending. Zero rows is a normal outcome.
    pub fn export_rows(
        &self,
        cohort: &Cohort,
        date: NaiveDate,
    ) -> Result<Vec<ExportRow>, StoreError> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT identity, grade, section, timestamp FROM attendance
             WHERE date(timestamp) = ?1 AND grade = ?2 AND section = ?3
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt
            .query_map(
                rusqlite::params![date_str, cohort.grade, cohort.section],
                |row| {
                    Ok(ExportRow {
                        identity: row.get(0)?,
                        grade: row.get(1)?,
                        section: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Deterministic export file name for one (cohort, date, actor) extract.
pub fn export_file_name(actor: &str, cohort: &Cohort, date: NaiveDate) -> String {
    format!(
        "attendance_{}_{}_{}_{}.csv",
        cohort.grade,
        cohort.section,
        actor.replace(' ', "_"),
        date.format("%Y-%m-%d"),
    )
}

/// Write an extract to `dir` and return its path.
pub fn write_export_file(
    dir: &Path,
    actor: &str,
    cohort: &Cohort,
    date: NaiveDate,
    rows: &[ExportRow],
) -> Result<PathBuf, StoreError> {
    let path = dir.join(export_file_name(actor, cohort, date));
    let mut out = String::from("identity,grade,section,time\n");
    for row in rows {
        // Rows carry the full timestamp; the extract's column is the
        // time of day (the date is already in the file name).
        let time = row
            .timestamp
            .split_once(' ')
            .map(|(_, t)| t)
            .unwrap_or(&row.timestamp);
        out.push_str(&format!(
            "{},{},{},{}\n",
            row.identity, row.grade, row.section, time
        ));
    }
    std::fs::write(&path, out).map_err(|source| StoreError::Export {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = rows.len(), "export written");
    Ok(path)
}
