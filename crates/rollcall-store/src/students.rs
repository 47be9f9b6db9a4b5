//! Enrollment rows. The ledger uses this table to resolve the cohort for
//! a bare identity code.

use crate::{Cohort, Store, StoreError};
use rusqlite::OptionalExtension;

#[derive(Debug, Clone)]
pub struct Student {
    pub identity: String,
    pub name: String,
    pub cohort: Cohort,
    /// Reference photo bytes as captured at enrollment.
    pub photo: Option<Vec<u8>>,
}

impl Store {
    /// Insert or replace an enrollment row.
    pub fn add_student(&self, student: &Student) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO students (identity, name, grade, section, photo)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                student.identity,
                student.name,
                student.cohort.grade,
                student.cohort.section,
                student.photo,
            ],
        )?;
        tracing::info!(identity = %student.identity, "student enrolled");
        Ok(())
    }

    /// Cohort for an enrolled identity, `None` when unknown.
    pub fn student_cohort(&self, identity: &str) -> Result<Option<Cohort>, StoreError> {
        let cohort = self
            .conn
            .query_row(
                "SELECT grade, section FROM students WHERE identity = ?1",
                [identity],
                |row| {
                    Ok(Cohort {
                        grade: row.get(0)?,
                        section: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(cohort)
    }
}
