//! Corner-form bounding boxes and the center/size → pixel-corner transform.

use crate::postprocess::head::DecodedAnchor;

/// Widths/heights at or below this are taken to mean the whole box block
/// is normalized to `[0, 1]`. Slightly above 1.0 to tolerate numerical
/// overshoot from the exporting model.
const NORMALIZED_MAX_EXTENT: f32 = 1.25;

/// Keeps the IoU denominator away from zero when both boxes are degenerate.
const IOU_EPS: f32 = 1e-9;

/// Axis-aligned bounding box in corner form.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Left x coordinate.
    pub x1: f32,
    /// Top y coordinate.
    pub y1: f32,
    /// Right x coordinate.
    pub x2: f32,
    /// Bottom y coordinate.
    pub y2: f32,
}

impl Rect {
    /// Create a Rect from corner coordinates.
    #[inline]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a Rect from center/size form (cx, cy, w, h).
    #[inline]
    pub fn from_cxcywh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    /// Area of the box, floored at zero for degenerate corners.
    #[inline]
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Clamp both x corners to `[0, width-1]` and both y corners to
    /// `[0, height-1]`, independently. A box entirely outside the image
    /// collapses to zero area; it is not rejected here.
    #[inline]
    pub fn clip(&self, width: u32, height: u32) -> Self {
        let max_x = (width - 1) as f32;
        let max_y = (height - 1) as f32;
        Self {
            x1: self.x1.clamp(0.0, max_x),
            y1: self.y1.clamp(0.0, max_y),
            x2: self.x2.clamp(0.0, max_x),
            y2: self.y2.clamp(0.0, max_y),
        }
    }

    /// Intersection over union with another box.
    ///
    /// Degenerate boxes contribute zero intersection and zero area; the
    /// epsilon in the denominator keeps two zero-area boxes at IoU 0
    /// instead of dividing by zero.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter + IOU_EPS;
        inter / union
    }
}

/// A scored, transformed box headed into suppression.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Box in pixel-space corner form, clipped to the image.
    pub rect: Rect,
    /// Final confidence inherited from the decoded anchor.
    pub score: f32,
    /// Class id inherited from the decoded anchor.
    pub class_id: usize,
}

/// Whether the anchors' box coordinates look normalized to `[0, 1]`.
///
/// True iff the maximum width/height across all anchors is ≤ 1.25. NaN
/// values are skipped by the max. Best-effort inference — a pixel-space
/// model whose boxes are all genuinely tiny would be misread, and no
/// guard exists for that.
pub fn boxes_are_normalized(anchors: &[DecodedAnchor]) -> bool {
    let max_extent = anchors
        .iter()
        .flat_map(|a| [a.w, a.h])
        .fold(f32::NEG_INFINITY, f32::max);
    max_extent <= NORMALIZED_MAX_EXTENT
}

/// Transform decoded anchors into pixel-space corner-box candidates.
///
/// Normalized coordinates are scaled by `(W, H, W, H)` first; pixel-space
/// coordinates pass through unscaled. Every box is clipped to the image.
pub fn to_candidates(anchors: &[DecodedAnchor], width: u32, height: u32) -> Vec<Candidate> {
    let (sx, sy) = if boxes_are_normalized(anchors) {
        (width as f32, height as f32)
    } else {
        (1.0, 1.0)
    };

    anchors
        .iter()
        .map(|a| Candidate {
            rect: Rect::from_cxcywh(a.cx * sx, a.cy * sy, a.w * sx, a.h * sy)
                .clip(width, height),
            score: a.score,
            class_id: a.class_id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(cx: f32, cy: f32, w: f32, h: f32, score: f32) -> DecodedAnchor {
        DecodedAnchor {
            cx,
            cy,
            w,
            h,
            objectness: score,
            score,
            class_id: 0,
            mask_coefficients: None,
        }
    }

    #[test]
    fn test_from_cxcywh() {
        let rect = Rect::from_cxcywh(50.0, 50.0, 20.0, 20.0);
        assert_eq!(rect, Rect::new(40.0, 40.0, 60.0, 60.0));
    }

    #[test]
    fn test_clip_bounds() {
        let rect = Rect::new(-10.0, -5.0, 150.0, 120.0).clip(100, 100);
        assert_eq!(rect, Rect::new(0.0, 0.0, 99.0, 99.0));
    }

    #[test]
    fn test_clip_keeps_inner_box_untouched() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.clip(100, 100), rect);
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 0.0, 15.0, 10.0);
        // inter 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_iou_zero_area_boxes() {
        let a = Rect::new(5.0, 5.0, 5.0, 5.0);
        let b = Rect::new(5.0, 5.0, 5.0, 5.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_normalized_detection() {
        let anchors = vec![anchor(0.5, 0.5, 0.2, 0.3, 0.9)];
        assert!(boxes_are_normalized(&anchors));

        let pixel = vec![anchor(50.0, 50.0, 20.0, 30.0, 0.9)];
        assert!(!boxes_are_normalized(&pixel));
    }

    #[test]
    fn test_normalized_tolerates_slight_overshoot() {
        let anchors = vec![anchor(0.5, 0.5, 1.2, 0.9, 0.9)];
        assert!(boxes_are_normalized(&anchors));
    }

    #[test]
    fn test_normalized_ignores_nan_extents() {
        let anchors = vec![anchor(0.5, 0.5, f32::NAN, 0.4, 0.9), anchor(0.5, 0.5, 0.2, 0.3, 0.8)];
        assert!(boxes_are_normalized(&anchors));
    }

    #[test]
    fn test_to_candidates_scales_normalized_boxes() {
        let anchors = vec![anchor(0.5, 0.5, 0.2, 0.2, 0.9)];
        let cands = to_candidates(&anchors, 100, 200);
        assert_eq!(cands[0].rect, Rect::new(40.0, 80.0, 60.0, 120.0));
    }

    #[test]
    fn test_to_candidates_passes_pixel_boxes_through() {
        let anchors = vec![anchor(50.0, 50.0, 20.0, 20.0, 0.9)];
        let cands = to_candidates(&anchors, 100, 100);
        assert_eq!(cands[0].rect, Rect::new(40.0, 40.0, 60.0, 60.0));
    }

    #[test]
    fn test_to_candidates_clips_out_of_bounds() {
        let anchors = vec![anchor(95.0, 95.0, 20.0, 20.0, 0.9)];
        let cands = to_candidates(&anchors, 100, 100);
        let r = cands[0].rect;
        assert_eq!(r.x1, 85.0);
        assert_eq!(r.y1, 85.0);
        assert_eq!(r.x2, 99.0);
        assert_eq!(r.y2, 99.0);
    }
}
