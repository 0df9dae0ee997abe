//! Confidence filtering and greedy non-maximum suppression.

use crate::postprocess::rect::Candidate;

/// Keep only candidates whose final score reaches `conf`.
///
/// An empty result is the normal outcome for an object-free image, not
/// an error.
pub fn filter_by_confidence(candidates: Vec<Candidate>, conf: f32) -> Vec<Candidate> {
    candidates.into_iter().filter(|c| c.score >= conf).collect()
}

/// Greedy, class-agnostic non-maximum suppression.
///
/// Candidates are sorted by score descending (stable, so equal scores
/// keep their incoming order). The best remaining candidate is kept and
/// every remaining candidate overlapping it with IoU ≥ `iou_threshold`
/// is dropped, until the pool is empty or `max_det` boxes are kept.
/// Suppression ignores class ids: two overlapping boxes of different
/// classes still suppress each other.
pub fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_det: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept = Vec::new();
    while !candidates.is_empty() && kept.len() < max_det {
        // The best box is taken out first: a zero-area box has IoU 0 with
        // everything, itself included, and must not survive the retain.
        let best = candidates.remove(0);
        candidates.retain(|c| best.rect.iou(&c.rect) < iou_threshold);
        kept.push(best);
    }
    kept
}
