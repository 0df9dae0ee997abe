//! Error type for the post-processing pipeline.

use thiserror::Error;

/// Fatal failures while turning raw model outputs into detections.
///
/// Both variants are terminal for the request: post-processing is
/// deterministic, so retrying would fail identically. An empty detection
/// list is *not* an error and is returned as `Ok(vec![])`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostProcessError {
    /// None of the raw outputs is a 3-D tensor, so there is no detection
    /// head to decode. Usually a model/integration mismatch rather than a
    /// bad input image.
    #[error("no detection head found among {num_outputs} model outputs")]
    HeadNotFound { num_outputs: usize },

    /// The chosen head tensor cannot hold box + objectness fields: its
    /// batch axis is not 1, it does not reduce to two dimensions, or it
    /// has fewer than 5 fields per anchor.
    #[error("malformed detection head shape {shape:?}")]
    MalformedHead { shape: Vec<usize> },
}
