//! Frame feed over a directory of pre-decoded frame images.
//!
//! Container decoding happens outside the engine (e.g. `ffmpeg -i clip.mp4
//! frames/%04d.png`); this feed replays the extracted frames in name order.
//! Constructing a fresh feed over the same directory restarts the stream.

use crate::frame::Frame;
use crate::source::{FrameFeed, SourceError};
use std::path::{Path, PathBuf};

pub struct ImageDirFeed {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageDirFeed {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|err| SourceError::Feed(format!("cannot read frame dir {}: {err}", dir.display())))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("png") | Some("jpg") | Some("jpeg")
                )
            })
            .collect();
        paths.sort();
        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameFeed for ImageDirFeed {
    fn next_raw(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let img = image::open(path)
            .map_err(|source| SourceError::ImageDecode {
                path: path.clone(),
                source,
            })?
            .to_luma8();
        let (width, height) = img.dimensions();
        Ok(Some(Frame::new(
            img.into_raw(),
            width,
            height,
            self.next as u32,
        )))
    }
}
