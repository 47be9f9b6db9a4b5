//! rollcall-store — Persistent attendance stores.
//!
//! One session-scoped [`Store`] handle owns the SQLite connection and the
//! path of the flat mirror file. The ledger in this crate is the only
//! writer path for attendance rows; the relational table is ground truth
//! and the mirror can be regenerated from it.
//!
//! Module layout:
//!   schema   — idempotent table creation
//!   ledger   — per-day dedup and the coordinated dual write
//!   mirror   — flat-file mirror (read-modify-write of the whole file)
//!   export   — per-day, per-cohort report extract
//!   students — enrollment rows, cohort resolution
//!   logs     — append-only audit entries

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod export;
pub mod ledger;
pub mod logs;
pub mod mirror;
mod schema;
pub mod students;

pub use export::ExportRow;
pub use ledger::SubmitOutcome;
pub use mirror::{MirrorFile, MirrorRow};
pub use students::Student;

/// The (grade, section) grouping that scopes attendance queries and exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub grade: String,
    pub section: String,
}

impl Cohort {
    pub fn new(grade: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            grade: grade.into(),
            section: section.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("mirror file {path}: {source}")]
    Mirror {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("export file {path}: {source}")]
    Export {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The relational write for `identity` succeeded but the mirror write
    /// failed. The stores have diverged; run [`Store::rebuild_mirror`].
    #[error("dual-write divergence for {identity}: {detail}")]
    PartialWriteDivergence { identity: String, detail: String },
}

/// Session-scoped handle over the relational store and the mirror file.
///
/// Acquired once per engine session and released on shutdown; never opened
/// and closed per operation.
pub struct Store {
    pub(crate) conn: Connection,
    pub(crate) mirror: MirrorFile,
}

impl Store {
    /// Open (or create) the attendance database and initialize tables.
    pub fn open(db_path: &Path, mirror_path: &Path) -> Result<Self, StoreError> {
        tracing::info!(db = %db_path.display(), mirror = %mirror_path.display(), "opening attendance store");
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        schema::run_migrations(&conn)?;
        Ok(Self {
            conn,
            mirror: MirrorFile::new(mirror_path),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory(mirror_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self {
            conn,
            mirror: MirrorFile::new(mirror_path),
        })
    }

    pub fn mirror(&self) -> &MirrorFile {
        &self.mirror
    }
}
