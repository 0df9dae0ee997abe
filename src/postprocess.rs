mod error;
mod head;
mod layout;
mod nms;
mod pipeline;
mod rect;

pub use error::PostProcessError;
pub use head::{DecodedAnchor, DetectionHead};
pub use layout::{HeadLayout, ResolvedOutputs, resolve_outputs};
pub use nms::{filter_by_confidence, non_max_suppression};
pub use pipeline::{Detection, PostProcessConfig, PostProcessor};
pub use rect::{Candidate, Rect, boxes_are_normalized, to_candidates};
