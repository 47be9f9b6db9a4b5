//! Bridge to the external embedding extractor.
//!
//! The extractor is any command that reads one binary PGM (P5) frame on
//! stdin and prints a JSON array of embedding vectors on stdout, e.g.
//! `[[0.12, -0.03, …], …]` — one inner array per detected face, an empty
//! array when the frame has no faces.

use rollcall_core::{Embedding, EncoderError, FaceEncoder};
use std::io::Write;
use std::process::{Command, Stdio};

pub struct CommandEncoder {
    program: String,
    args: Vec<String>,
}

impl CommandEncoder {
    /// Split a command line on whitespace; the first token is the program.
    pub fn new(cmdline: &str) -> Result<Self, EncoderError> {
        let mut parts = cmdline.split_whitespace().map(String::from);
        let Some(program) = parts.next() else {
            return Err(EncoderError::Backend("empty encoder command".into()));
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Build from an explicit program and argument list (arguments with
    /// spaces cannot round-trip through [`new`](Self::new)).
    pub fn from_parts(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl FaceEncoder for CommandEncoder {
    fn detect_and_encode(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Embedding>, EncoderError> {
        let expected = (width * height) as usize;
        if gray.len() < expected {
            return Err(EncoderError::InvalidFrame {
                expected,
                actual: gray.len(),
            });
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|err| EncoderError::Backend(format!("spawn {}: {err}", self.program)))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| EncoderError::Backend("no stdin handle".into()))?;
            stdin
                .write_all(format!("P5\n{width} {height}\n255\n").as_bytes())
                .and_then(|_| stdin.write_all(&gray[..expected]))
                .map_err(|err| EncoderError::Backend(format!("write frame: {err}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| EncoderError::Backend(format!("wait: {err}")))?;
        if !output.status.success() {
            return Err(EncoderError::Backend(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let vectors: Vec<Vec<f32>> = serde_json::from_slice(&output.stdout)
            .map_err(|err| EncoderError::Backend(format!("bad encoder output: {err}")))?;
        Ok(vectors.into_iter().map(Embedding::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(CommandEncoder::new("   ").is_err());
    }

    fn shell(script: &str) -> CommandEncoder {
        CommandEncoder::from_parts("sh", vec!["-c".into(), script.into()])
    }

    #[test]
    fn test_parses_embeddings_from_stdout() {
        let mut encoder = shell("cat >/dev/null; echo '[[1.0,2.0],[3.0,4.0]]'");
        let embeddings = encoder.detect_and_encode(&[0u8; 4], 2, 2).unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_empty_array_means_no_faces() {
        let mut encoder = shell("cat >/dev/null; echo '[]'");
        let embeddings = encoder.detect_and_encode(&[0u8; 4], 2, 2).unwrap();
        assert!(embeddings.is_empty());
    }

    #[test]
    fn test_garbage_output_is_a_backend_error() {
        let mut encoder = shell("cat >/dev/null; echo not-json");
        let err = encoder.detect_and_encode(&[0u8; 4], 2, 2).unwrap_err();
        assert!(matches!(err, EncoderError::Backend(_)));
    }

    #[test]
    fn test_nonzero_exit_is_a_backend_error() {
        let mut encoder = shell("cat >/dev/null; exit 3");
        let err = encoder.detect_and_encode(&[0u8; 4], 2, 2).unwrap_err();
        assert!(matches!(err, EncoderError::Backend(_)));
    }

    #[test]
    fn test_short_frame_is_rejected() {
        let mut encoder = CommandEncoder::new("true").unwrap();
        let err = encoder.detect_and_encode(&[0u8; 2], 2, 2).unwrap_err();
        assert!(matches!(err, EncoderError::InvalidFrame { .. }));
    }
}
