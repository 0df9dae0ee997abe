//! PostProcessor: the end-to-end pipeline from raw output tensors to
//! final detections.

use ndarray::ArrayD;
use tracing::debug;

use crate::postprocess::error::PostProcessError;
use crate::postprocess::head::DetectionHead;
use crate::postprocess::layout::resolve_outputs;
use crate::postprocess::nms::{filter_by_confidence, non_max_suppression};
use crate::postprocess::rect::to_candidates;

/// Configuration for the post-processing pipeline.
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Minimum final confidence for an anchor to become a candidate.
    pub conf_threshold: f32,
    /// Candidates overlapping a kept box at or above this IoU are dropped.
    pub iou_threshold: f32,
    /// Upper bound on the number of returned detections.
    pub max_detections: usize,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 50,
        }
    }
}

/// One final detection, in pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Detection {
    /// Bounding box `[x1, y1, x2, y2]`, clipped to the image.
    pub bbox: [f32; 4],
    /// Confidence in `[0, 1]`.
    pub score: f32,
    /// Class index; 0 for single-class heads. Mapping ids to names is the
    /// caller's concern.
    pub class_id: usize,
}

/// Stateless post-processing engine for YOLO-style detection heads.
///
/// Holds only thresholds, so a single instance can be shared freely
/// across threads and reused for any number of inference runs.
#[derive(Debug, Clone, Default)]
pub struct PostProcessor {
    config: PostProcessConfig,
}

impl PostProcessor {
    /// Create an engine with the given thresholds.
    pub fn new(config: PostProcessConfig) -> Self {
        Self { config }
    }

    /// Create an engine with the default thresholds (conf 0.25, IoU 0.45,
    /// at most 50 detections).
    pub fn with_default_config() -> Self {
        Self::default()
    }

    /// The active configuration.
    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    /// Turn one inference run's raw output tensors into detections.
    ///
    /// `image_width`/`image_height` are the dimensions the boxes should
    /// be expressed in. The returned detections are ordered by descending
    /// confidence and capped at `max_detections`; an empty vector means
    /// nothing cleared the confidence threshold.
    ///
    /// # Errors
    ///
    /// [`PostProcessError::HeadNotFound`] when no raw output is a 3-D
    /// tensor, and [`PostProcessError::MalformedHead`] when the chosen
    /// tensor cannot be decoded as box + objectness fields. Both indicate
    /// an incompatible model export; neither is retried.
    pub fn process(
        &self,
        outputs: &[ArrayD<f32>],
        image_width: u32,
        image_height: u32,
    ) -> Result<Vec<Detection>, PostProcessError> {
        let resolved = resolve_outputs(outputs)?;
        let head = DetectionHead::decode(resolved.head, resolved.has_proto)?;
        debug!(
            anchors = head.num_anchors(),
            fields = head.num_fields(),
            layout = ?head.layout(),
            has_proto = resolved.has_proto,
            "decoded detection head"
        );

        let anchors: Vec<_> = head.anchors().collect();
        let candidates = to_candidates(&anchors, image_width, image_height);
        let survivors = filter_by_confidence(candidates, self.config.conf_threshold);
        debug!(
            survivors = survivors.len(),
            conf = self.config.conf_threshold,
            "filtered candidates"
        );
        if survivors.is_empty() {
            return Ok(Vec::new());
        }

        let kept = non_max_suppression(
            survivors,
            self.config.iou_threshold,
            self.config.max_detections,
        );
        debug!(kept = kept.len(), "suppression done");

        Ok(kept
            .into_iter()
            .map(|c| Detection {
                bbox: [c.rect.x1, c.rect.y1, c.rect.x2, c.rect.y2],
                score: c.score,
                class_id: c.class_id,
            })
            .collect())
    }
}
