//! rollcall-capture — Probe frame sources for the attendance engine.
//!
//! Three capture modes produce the frames handed to the matcher: a single
//! still image, a decoded video stream sampled every Nth frame, and a live
//! feed bounded by a cooperative watchdog. Device and container decoding
//! live behind the [`FrameFeed`] trait; this crate only decides which
//! frames reach the matcher.

pub mod feed;
pub mod frame;
pub mod source;

pub use feed::ImageDirFeed;
pub use frame::Frame;
pub use source::{FrameFeed, FrameSource, LiveCapture, SourceError, StaticImage, StreamedVideo};
