//! Layout resolution: picking the detection head out of the raw outputs
//! and classifying its field layout.

use ndarray::ArrayD;

use crate::postprocess::error::PostProcessError;

/// Number of mask coefficients a segmentation export appends per anchor,
/// matching the channel count of the shared mask-prototype tensor.
pub(crate) const MASK_COEF_LEN: usize = 32;

/// Fields every head carries before class scores: cx, cy, w, h, objectness.
pub(crate) const BOX_OBJ_FIELDS: usize = 5;

/// The raw outputs of one inference run, resolved to the tensor that holds
/// the detection head.
#[derive(Debug)]
pub struct ResolvedOutputs<'a> {
    /// The detection-head tensor, still in its exported shape.
    pub head: &'a ArrayD<f32>,
    /// Whether a mask-prototype tensor accompanies the head.
    pub has_proto: bool,
}

/// Field layout of a detection head, derived once per request from the
/// field count and the presence of a mask-prototype tensor. Downstream
/// stages match on this tag instead of re-deriving field offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadLayout {
    /// `[cx, cy, w, h, obj]` — objectness alone is the score.
    SingleClass,
    /// `[cx, cy, w, h, obj, cls...]`
    MultiClass { num_classes: usize },
    /// `[cx, cy, w, h, obj, mask32]`
    SingleClassWithMasks,
    /// `[cx, cy, w, h, obj, cls..., mask32]`
    MultiClassWithMasks { num_classes: usize },
}

impl HeadLayout {
    /// Classify a head with `fields` values per anchor.
    ///
    /// Mask coefficients are assumed only when a prototype tensor exists
    /// *and* the field count leaves room for all 32 of them; anything
    /// between box+objectness and the class block is otherwise treated as
    /// class scores.
    pub fn resolve(fields: usize, has_proto: bool) -> Result<Self, PostProcessError> {
        if fields < BOX_OBJ_FIELDS {
            return Err(PostProcessError::MalformedHead {
                shape: vec![fields],
            });
        }
        let mask_coef_len = if has_proto && fields >= BOX_OBJ_FIELDS + MASK_COEF_LEN {
            MASK_COEF_LEN
        } else {
            0
        };
        let num_classes = fields.saturating_sub(BOX_OBJ_FIELDS + mask_coef_len);

        Ok(match (num_classes, mask_coef_len) {
            (0, 0) => Self::SingleClass,
            (0, _) => Self::SingleClassWithMasks,
            (n, 0) => Self::MultiClass { num_classes: n },
            (n, _) => Self::MultiClassWithMasks { num_classes: n },
        })
    }

    /// Number of per-class scores, 0 for single-class heads.
    pub fn num_classes(&self) -> usize {
        match *self {
            Self::SingleClass | Self::SingleClassWithMasks => 0,
            Self::MultiClass { num_classes } | Self::MultiClassWithMasks { num_classes } => {
                num_classes
            }
        }
    }

    /// Number of trailing mask coefficients, 0 or 32.
    pub fn mask_coef_len(&self) -> usize {
        match self {
            Self::SingleClass | Self::MultiClass { .. } => 0,
            Self::SingleClassWithMasks | Self::MultiClassWithMasks { .. } => MASK_COEF_LEN,
        }
    }
}

/// Scan the raw outputs for the detection head and a mask prototype.
///
/// A 4-D tensor with 32 anywhere in its shape marks the mask prototype;
/// it is never the head itself. Among 3-D tensors the one whose larger of
/// its last two dimensions is greatest wins — the dense all-anchors head,
/// e.g. `[1, 37, 8400]`, beats any smaller auxiliary head. Ties keep the
/// earliest tensor.
pub fn resolve_outputs(outputs: &[ArrayD<f32>]) -> Result<ResolvedOutputs<'_>, PostProcessError> {
    let mut head: Option<&ArrayD<f32>> = None;
    let mut has_proto = false;

    for out in outputs {
        let shape = out.shape();
        if shape.len() == 4 && shape.contains(&MASK_COEF_LEN) {
            has_proto = true;
        }
        if shape.len() == 3 {
            match head {
                None => head = Some(out),
                Some(cur) => {
                    if anchor_extent(shape) > anchor_extent(cur.shape()) {
                        head = Some(out);
                    }
                }
            }
        }
    }

    let head = head.ok_or(PostProcessError::HeadNotFound {
        num_outputs: outputs.len(),
    })?;
    Ok(ResolvedOutputs { head, has_proto })
}

/// The larger of a 3-D shape's last two dimensions — a proxy for the
/// anchor count regardless of axis order.
fn anchor_extent(shape: &[usize]) -> usize {
    shape[shape.len() - 1].max(shape[shape.len() - 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn tensor(shape: &[usize]) -> ArrayD<f32> {
        ArrayD::zeros(IxDyn(shape))
    }

    #[test]
    fn test_resolve_picks_densest_head() {
        let outputs = vec![tensor(&[1, 5, 100]), tensor(&[1, 5, 8400])];
        let resolved = resolve_outputs(&outputs).unwrap();
        assert_eq!(resolved.head.shape(), &[1, 5, 8400]);
        assert!(!resolved.has_proto);
    }

    #[test]
    fn test_resolve_ties_keep_first_tensor() {
        let outputs = vec![tensor(&[1, 6, 8400]), tensor(&[1, 5, 8400])];
        let resolved = resolve_outputs(&outputs).unwrap();
        assert_eq!(resolved.head.shape(), &[1, 6, 8400]);
    }

    #[test]
    fn test_resolve_flags_mask_prototype() {
        let outputs = vec![tensor(&[1, 37, 8400]), tensor(&[1, 32, 160, 160])];
        let resolved = resolve_outputs(&outputs).unwrap();
        assert_eq!(resolved.head.shape(), &[1, 37, 8400]);
        assert!(resolved.has_proto);
    }

    #[test]
    fn test_resolve_proto_alone_is_not_a_head() {
        let outputs = vec![tensor(&[1, 32, 160, 160])];
        assert_eq!(
            resolve_outputs(&outputs).unwrap_err(),
            PostProcessError::HeadNotFound { num_outputs: 1 }
        );
    }

    #[test]
    fn test_resolve_no_outputs() {
        assert_eq!(
            resolve_outputs(&[]).unwrap_err(),
            PostProcessError::HeadNotFound { num_outputs: 0 }
        );
    }

    #[test]
    fn test_layout_single_class() {
        assert_eq!(HeadLayout::resolve(5, false).unwrap(), HeadLayout::SingleClass);
        // A prototype without room for coefficients changes nothing.
        assert_eq!(HeadLayout::resolve(5, true).unwrap(), HeadLayout::SingleClass);
    }

    #[test]
    fn test_layout_multi_class() {
        let layout = HeadLayout::resolve(85, false).unwrap();
        assert_eq!(layout, HeadLayout::MultiClass { num_classes: 80 });
        assert_eq!(layout.num_classes(), 80);
        assert_eq!(layout.mask_coef_len(), 0);
    }

    #[test]
    fn test_layout_single_class_with_masks() {
        let layout = HeadLayout::resolve(37, true).unwrap();
        assert_eq!(layout, HeadLayout::SingleClassWithMasks);
        assert_eq!(layout.num_classes(), 0);
        assert_eq!(layout.mask_coef_len(), 32);
    }

    #[test]
    fn test_layout_multi_class_with_masks() {
        let layout = HeadLayout::resolve(117, true).unwrap();
        assert_eq!(layout, HeadLayout::MultiClassWithMasks { num_classes: 80 });
    }

    #[test]
    fn test_layout_without_proto_treats_extra_fields_as_classes() {
        // Same 37 fields, but no prototype tensor: 32 classes, no masks.
        let layout = HeadLayout::resolve(37, false).unwrap();
        assert_eq!(layout, HeadLayout::MultiClass { num_classes: 32 });
    }

    #[test]
    fn test_layout_rejects_too_few_fields() {
        assert!(matches!(
            HeadLayout::resolve(4, false),
            Err(PostProcessError::MalformedHead { .. })
        ));
    }
}
