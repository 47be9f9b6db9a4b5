//! Flat-file mirror of the attendance table.
//!
//! One `identity,date,time` row per written attendance event, kept for
//! audit and export convenience. Every write is a read-modify-write of the
//! whole file, not a true append stream; the relational table stays the
//! source of truth and the day's rows can be regenerated from it.

use std::io;
use std::path::{Path, PathBuf};

const HEADER: &str = "identity,date,time";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRow {
    pub identity: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone)]
pub struct MirrorFile {
    path: PathBuf,
}

impl MirrorFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all rows; a missing file is an empty mirror. Malformed lines
    /// are dropped with a diagnostic rather than failing the read.
    pub fn read_rows(&self) -> io::Result<Vec<MirrorRow>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut rows = Vec::new();
        for line in content.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.splitn(3, ',');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(identity), Some(date), Some(time)) => rows.push(MirrorRow {
                    identity: identity.to_string(),
                    date: date.to_string(),
                    time: time.to_string(),
                }),
                _ => tracing::warn!(path = %self.path.display(), line, "dropping malformed mirror line"),
            }
        }
        Ok(rows)
    }

    /// Add a row unless the mirror already holds one for the same
    /// (identity, date), then rewrite the file in full.
    pub fn append(&self, row: MirrorRow) -> io::Result<()> {
        let mut rows = self.read_rows()?;
        if rows
            .iter()
            .any(|r| r.identity == row.identity && r.date == row.date)
        {
            return Ok(());
        }
        rows.push(row);
        self.write_all(&rows)
    }

    /// Replace every row for `date` with `day_rows`, keeping other days
    /// untouched. Used when regenerating the mirror from the relational
    /// table after a detected divergence.
    pub fn replace_day(&self, date: &str, day_rows: Vec<MirrorRow>) -> io::Result<()> {
        let mut rows: Vec<MirrorRow> = self
            .read_rows()?
            .into_iter()
            .filter(|r| r.date != date)
            .collect();
        rows.extend(day_rows);
        self.write_all(&rows)
    }

    fn write_all(&self, rows: &[MirrorRow]) -> io::Result<()> {
        let mut out = String::with_capacity(rows.len() * 32 + HEADER.len() + 1);
        out.push_str(HEADER);
        out.push('\n');
        for row in rows {
            out.push_str(&row.identity);
            out.push(',');
            out.push_str(&row.date);
            out.push(',');
            out.push_str(&row.time);
            out.push('\n');
        }
        std::fs::write(&self.path, out)
    }
}
