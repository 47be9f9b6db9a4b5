//! Gallery loader — builds the in-memory reference set from a directory of
//! labeled images.
//!
//! One file per enrolled identity; the identity code is the file stem
//! (`S001.jpg` → `S001`). Files that fail to decode or yield no face are
//! skipped with a diagnostic. Only an unreadable directory is fatal.

use crate::encoder::FaceEncoder;
use crate::types::GalleryEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("reference directory unreadable: {path}: {source}")]
    DirUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

const REFERENCE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// The session's read-only reference set, ordered by load order.
///
/// Duplicate identities are kept as encountered; the matcher's
/// lowest-index tie-break makes the first-loaded entry win.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    /// Load reference images from `dir`, extracting one embedding per file.
    ///
    /// Files are visited in name order so load order (and therefore
    /// tie-breaking) is stable across runs. Reloading after a new
    /// enrollment is a fresh `load` call replacing the whole value.
    pub fn load(dir: &Path, encoder: &mut dyn FaceEncoder) -> Result<Self, GalleryError> {
        let read_dir = std::fs::read_dir(dir).map_err(|source| GalleryError::DirUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| REFERENCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in &paths {
            let Some(identity) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let img = match image::open(path) {
                Ok(img) => img.to_luma8(),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable reference image");
                    continue;
                }
            };

            let (width, height) = img.dimensions();
            let embeddings = match encoder.detect_and_encode(img.as_raw(), width, height) {
                Ok(embeddings) => embeddings,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping reference image: encoder failed");
                    continue;
                }
            };

            let Some(embedding) = embeddings.into_iter().next() else {
                tracing::warn!(path = %path.display(), "skipping reference image: no face found");
                continue;
            };

            if entries.iter().any(|e: &GalleryEntry| e.identity == identity) {
                tracing::debug!(identity, path = %path.display(), "duplicate identity in gallery; first-loaded entry wins ties");
            }

            entries.push(GalleryEntry {
                identity: identity.to_string(),
                embedding,
            });
        }

        tracing::info!(
            dir = %dir.display(),
            loaded = entries.len(),
            scanned = paths.len(),
            "gallery loaded"
        );

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
