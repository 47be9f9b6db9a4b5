//! Contract for the external embedding extractor.
//!
//! Detection and encoding run outside this crate (ONNX pipeline, OpenCV,
//! anything producing fixed-length vectors). The engine only needs "zero
//! or more embeddings per grayscale frame".

use crate::types::Embedding;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("frame buffer too short: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },
    #[error("encoder backend failed: {0}")]
    Backend(String),
}

/// Detect faces in a grayscale frame and return one embedding per face.
///
/// An empty vec is a normal outcome (no faces in frame), not an error.
pub trait FaceEncoder {
    fn detect_and_encode(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Embedding>, EncoderError>;
}
