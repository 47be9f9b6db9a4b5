//! Frame source adapters — static image, sampled video, live capture.

use crate::frame::Frame;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("frame feed failed: {0}")]
    Feed(String),
}

/// Raw decoded frames from an external collaborator (video container
/// decoder, camera device wrapper). Returns `None` at end of stream.
pub trait FrameFeed {
    fn next_raw(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// A sequence of probe frames for one attendance session.
///
/// The matcher and ledger are mode-agnostic consumers; only the adapter
/// knows whether frames come from a file, a video, or a device.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Exactly one frame: a still image loaded from disk.
pub struct StaticImage {
    frame: Option<Frame>,
}

impl StaticImage {
    /// Decode an image file to a grayscale frame. Decode failure is fatal
    /// for the session (there is nothing else to process).
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let img = image::open(path)
            .map_err(|source| SourceError::ImageDecode {
                path: path.to_path_buf(),
                source,
            })?
            .to_luma8();
        let (width, height) = img.dimensions();
        Ok(Self {
            frame: Some(Frame::new(img.into_raw(), width, height, 1)),
        })
    }

    /// Wrap an already-decoded frame (used when the caller captured the
    /// still itself).
    pub fn from_frame(frame: Frame) -> Self {
        Self { frame: Some(frame) }
    }
}

impl FrameSource for StaticImage {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.frame.take())
    }
}

/// Default sampling stride for video sources.
pub const DEFAULT_SAMPLE_EVERY: usize = 5;

/// Decoded video frames, keeping only every Nth frame.
///
/// With `sample_every = 5`, a 23-frame feed yields source frames
/// 5, 10, 15 and 20 — recall traded for throughput on long videos.
/// Replayable only by constructing a fresh feed; not seekable.
pub struct StreamedVideo {
    feed: Box<dyn FrameFeed>,
    sample_every: usize,
    pulled: usize,
}

impl StreamedVideo {
    pub fn new(feed: Box<dyn FrameFeed>, sample_every: usize) -> Self {
        Self {
            feed,
            sample_every: sample_every.max(1),
            pulled: 0,
        }
    }
}

impl FrameSource for StreamedVideo {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        loop {
            let Some(frame) = self.feed.next_raw()? else {
                return Ok(None);
            };
            self.pulled += 1;
            if self.pulled % self.sample_every == 0 {
                tracing::debug!(source_frame = self.pulled, "sampled video frame");
                return Ok(Some(frame));
            }
        }
    }
}

/// Default watchdog duration for live capture.
pub const DEFAULT_MAX_CAPTURE: Duration = Duration::from_secs(30);

/// Live device frames until cancellation or a deadline.
///
/// Both stop conditions are cooperative: checked once per produced frame,
/// never preemptively. Not restartable.
pub struct LiveCapture {
    feed: Box<dyn FrameFeed>,
    cancel: Arc<AtomicBool>,
    started: Instant,
    max_duration: Duration,
}

impl LiveCapture {
    pub fn new(feed: Box<dyn FrameFeed>, max_duration: Duration, cancel: Arc<AtomicBool>) -> Self {
        Self {
            feed,
            cancel,
            started: Instant::now(),
            max_duration,
        }
    }
}

impl FrameSource for LiveCapture {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.cancel.load(Ordering::Relaxed) {
            tracing::info!("live capture cancelled");
            return Ok(None);
        }
        if self.started.elapsed() >= self.max_duration {
            tracing::info!(max_secs = self.max_duration.as_secs(), "live capture deadline reached");
            return Ok(None);
        }
        self.feed.next_raw()
    }
}
