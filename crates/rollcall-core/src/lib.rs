//! rollcall-core — Face matching engine for attendance taking.
//!
//! Holds the gallery of enrolled reference embeddings, the distance-based
//! matcher that decides whether a probe face belongs to a known identity,
//! and the contract for the external embedding extractor.

pub mod encoder;
pub mod gallery;
pub mod types;

pub use encoder::{EncoderError, FaceEncoder};
pub use gallery::{Gallery, GalleryError};
pub use types::{Embedding, EuclideanMatcher, GalleryEntry, MatchResult, Matcher};
