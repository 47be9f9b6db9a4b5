//! Attendance engine session: frame source → encoder → matcher → ledger.
//!
//! Matching is per-frame, submission is per-batch: accepted identities are
//! unioned across every frame the source produces, then handed to the
//! ledger in one `submit` call covering the whole image, video or live
//! session.

use rollcall_capture::{FrameSource, SourceError};
use rollcall_core::{EuclideanMatcher, FaceEncoder, Gallery, GalleryError, Matcher};
use rollcall_store::ledger::SubmitOutcome;
use rollcall_store::{Cohort, Store, StoreError};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("gallery: {0}")]
    Gallery(#[from] GalleryError),
    #[error("frame source: {0}")]
    Source(#[from] SourceError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// One engine session: owns the gallery and the store handle for its
/// lifetime. The gallery is read-only between explicit reloads.
pub struct Engine {
    gallery: Gallery,
    gallery_dir: PathBuf,
    store: Store,
    matcher: EuclideanMatcher,
    tolerance: f32,
}

impl Engine {
    /// Open a session: load the gallery once, keep the store handle.
    pub fn new(
        store: Store,
        gallery_dir: PathBuf,
        tolerance: f32,
        encoder: &mut dyn FaceEncoder,
    ) -> Result<Self, EngineError> {
        let gallery = Gallery::load(&gallery_dir, encoder)?;
        Ok(Self {
            gallery,
            gallery_dir,
            store,
            matcher: EuclideanMatcher,
            tolerance,
        })
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Rebuild the reference set from disk, replacing it wholesale.
    /// For long-lived sessions that enroll mid-session; the CLI builds a
    /// fresh engine per invocation and loads at startup instead.
    #[allow(dead_code)]
    pub fn reload_gallery(&mut self, encoder: &mut dyn FaceEncoder) -> Result<(), EngineError> {
        self.gallery = Gallery::load(&self.gallery_dir, encoder)?;
        Ok(())
    }

    /// Drain the frame source and union the accepted identities.
    ///
    /// A frame may contain zero or several faces; every embedding is
    /// matched independently. Per-frame encoder failures are diagnostics,
    /// not session aborts; source failures propagate.
    pub fn collect_identities(
        &self,
        source: &mut dyn FrameSource,
        encoder: &mut dyn FaceEncoder,
    ) -> Result<BTreeSet<String>, EngineError> {
        let mut present = BTreeSet::new();
        let mut frames = 0usize;

        while let Some(frame) = source.next_frame()? {
            frames += 1;
            let embeddings =
                match encoder.detect_and_encode(&frame.data, frame.width, frame.height) {
                    Ok(embeddings) => embeddings,
                    Err(err) => {
                        tracing::warn!(sequence = frame.sequence, error = %err, "encoder failed on frame; continuing");
                        continue;
                    }
                };

            for embedding in &embeddings {
                let result = self
                    .matcher
                    .compare(embedding, self.gallery.entries(), self.tolerance);
                if let Some(identity) = result.identity {
                    tracing::debug!(identity = %identity, distance = result.distance, "face accepted");
                    present.insert(identity);
                }
            }
        }

        tracing::info!(frames, matched = present.len(), "capture session drained");
        Ok(present)
    }

    /// Run one full attendance session and record the result.
    pub fn run_session(
        &mut self,
        source: &mut dyn FrameSource,
        encoder: &mut dyn FaceEncoder,
        actor: &str,
        cohort: &Cohort,
    ) -> Result<SubmitOutcome, EngineError> {
        let present = self.collect_identities(source, encoder)?;
        let now = chrono::Local::now().naive_local();
        let outcome = self.store.submit(&present, actor, cohort, now)?;
        Ok(outcome)
    }
}
