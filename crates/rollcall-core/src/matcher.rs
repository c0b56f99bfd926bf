//! Nearest-descriptor matching against the enrolled gallery.

use crate::types::{DetectionFrame, Embedding, Identity, KnownFace, MatchResult};
use std::collections::HashSet;

/// Default acceptance distance, the usual dlib-descriptor tolerance.
pub const DEFAULT_MATCH_TOLERANCE: f32 = 0.6;

/// Strategy for comparing a probe embedding against a gallery of enrolled faces.
pub trait Matcher {
    fn best_match(&self, probe: &Embedding, gallery: &[KnownFace]) -> MatchResult;
}

/// Euclidean nearest-neighbour matcher.
///
/// The minimum-distance entry wins; on exact ties the lowest gallery
/// index is kept. The nearest entry is accepted when its distance is
/// within `tolerance`. Gallery entries whose dimension differs from the
/// probe's are skipped, so an empty or truncated descriptor never matches.
pub struct DistanceMatcher {
    pub tolerance: f32,
}

impl Default for DistanceMatcher {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_MATCH_TOLERANCE,
        }
    }
}

impl Matcher for DistanceMatcher {
    fn best_match(&self, probe: &Embedding, gallery: &[KnownFace]) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;
        let mut skipped = 0usize;

        for (i, known) in gallery.iter().enumerate() {
            if probe.dim() == 0 || known.embedding.dim() != probe.dim() {
                skipped += 1;
                continue;
            }
            let dist = probe.euclidean_distance(&known.embedding);
            // Strict comparison keeps the earliest index on ties.
            if best_idx.is_none() || dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        if skipped > 0 {
            tracing::warn!(
                probe_dim = probe.dim(),
                skipped,
                "descriptor dimension does not match gallery"
            );
        }

        match best_idx {
            Some(idx) if best_dist <= self.tolerance => MatchResult {
                matched: true,
                distance: best_dist,
                identity: Some(gallery[idx].id.clone()),
                index: Some(idx),
            },
            _ => MatchResult {
                matched: false,
                distance: best_dist,
                identity: None,
                index: best_idx,
            },
        }
    }
}

/// Resolve every face in a frame to a known identity.
///
/// Unmatched faces are dropped and an identity seen twice in the same
/// frame is reported once, in first-seen order.
pub fn identify_frame(
    frame: &DetectionFrame,
    gallery: &[KnownFace],
    matcher: &dyn Matcher,
) -> Vec<Identity> {
    let mut seen = HashSet::new();
    let mut visible = Vec::new();

    for face in &frame.faces {
        let result = matcher.best_match(face, gallery);
        let Some(id) = result.identity else {
            tracing::trace!(distance = result.distance, "face did not match gallery");
            continue;
        };
        if seen.insert(id.clone()) {
            visible.push(id);
        }
    }

    visible
}
