use serde::{Deserialize, Serialize};

/// Face embedding vector (typically 128- or 512-dimensional, depending on
/// the encoder model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings on raw coordinates.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One enrolled reference: an identity code and the embedding extracted
/// from that identity's reference image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub identity: String,
    pub embedding: Embedding,
}

/// Result of matching a probe embedding against the gallery.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Identity of the best candidate, only set when the match was accepted.
    pub identity: Option<String>,
    /// Euclidean distance of the best candidate; `f32::INFINITY` when the
    /// gallery was empty.
    pub distance: f32,
    pub accepted: bool,
}

impl MatchResult {
    fn rejected(distance: f32) -> Self {
        Self {
            identity: None,
            distance,
            accepted: false,
        }
    }
}

/// Strategy for comparing a probe embedding against the gallery.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, gallery: &[GalleryEntry], tolerance: f32) -> MatchResult;
}

/// Nearest-neighbor matcher with a fixed acceptance radius.
///
/// The candidate is the gallery entry at minimal Euclidean distance (ties
/// broken by lowest index), accepted iff that distance is within
/// `tolerance`. This is deliberately an absolute-radius policy rather than
/// a top-1/top-2 margin test: simpler and tunable, but weaker against
/// look-alikes.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[GalleryEntry], tolerance: f32) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        // Full scan; strict `<` keeps the lowest index on ties.
        for (i, entry) in gallery.iter().enumerate() {
            let dist = probe.euclidean_distance(&entry.embedding);
            if dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist <= tolerance => MatchResult {
                identity: Some(gallery[idx].identity.clone()),
                distance: best_dist,
                accepted: true,
            },
            // Empty gallery rejects safely with an infinite distance.
            _ => MatchResult::rejected(best_dist),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identity: &str, values: Vec<f32>) -> GalleryEntry {
        GalleryEntry {
            identity: identity.into(),
            embedding: Embedding::new(values),
        }
    }

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(a.euclidean_distance(&a), 0.0);
    }

    #[test]
    fn test_euclidean_distance_unit_apart() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert!((a.euclidean_distance(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_gallery_always_rejects() {
        let probe = Embedding::new(vec![1.0, 0.0]);
        let result = EuclideanMatcher.compare(&probe, &[], 0.5);
        assert!(!result.accepted);
        assert!(result.identity.is_none());
        assert_eq!(result.distance, f32::INFINITY);
    }

    #[test]
    fn test_accept_within_tolerance() {
        // S002 sits at distance 1.2 from the probe, S001 at 0.
        let probe = Embedding::new(vec![1.0, 0.0]);
        let gallery = vec![
            entry("S001", vec![1.0, 0.0]),
            entry("S002", vec![1.0, 1.2]),
        ];
        let result = EuclideanMatcher.compare(&probe, &gallery, 0.5);
        assert!(result.accepted);
        assert_eq!(result.identity.as_deref(), Some("S001"));
        assert!(result.distance < 1e-6);
    }

    #[test]
    fn test_reject_beyond_tolerance() {
        // Min distance 0.9 > tolerance 0.5 → rejected, no identity.
        let probe = Embedding::new(vec![0.9, 0.0]);
        let gallery = vec![entry("S001", vec![0.0, 0.0])];
        let result = EuclideanMatcher.compare(&probe, &gallery, 0.5);
        assert!(!result.accepted);
        assert!(result.identity.is_none());
        assert!((result.distance - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_tie_breaks_to_lowest_index() {
        let probe = Embedding::new(vec![0.0, 0.0]);
        let gallery = vec![
            entry("first", vec![0.3, 0.0]),
            entry("second", vec![0.3, 0.0]),
        ];
        let result = EuclideanMatcher.compare(&probe, &gallery, 0.5);
        assert!(result.accepted);
        assert_eq!(result.identity.as_deref(), Some("first"));
    }

    #[test]
    fn test_boundary_distance_equal_to_tolerance_accepts() {
        let probe = Embedding::new(vec![0.5, 0.0]);
        let gallery = vec![entry("S001", vec![0.0, 0.0])];
        let result = EuclideanMatcher.compare(&probe, &gallery, 0.5);
        assert!(result.accepted);
    }

    #[test]
    fn test_best_match_can_be_last_entry() {
        let probe = Embedding::new(vec![1.0, 0.0, 0.0]);
        let gallery = vec![
            entry("decoy1", vec![0.0, 1.0, 0.0]),
            entry("decoy2", vec![0.0, 0.0, 1.0]),
            entry("match", vec![1.0, 0.0, 0.0]),
        ];
        let result = EuclideanMatcher.compare(&probe, &gallery, 0.5);
        assert!(result.accepted);
        assert_eq!(result.identity.as_deref(), Some("match"));
    }
}
