//! Head decoding: normalizing the raw head tensor to `[N, D]` and reading
//! per-anchor fields out of it.

use ndarray::{ArrayD, ArrayView1, ArrayView2, Axis, Ix2};

use crate::postprocess::error::PostProcessError;
use crate::postprocess::layout::{BOX_OBJ_FIELDS, HeadLayout};

/// Axis sizes at or below this are assumed to be the field axis when the
/// other axis is larger. This is a shape heuristic, not schema inference:
/// a model whose true anchor count is ≤ 256 (a very coarse grid) would be
/// transposed incorrectly, and nothing here guards against that.
const MAX_FIELD_AXIS: usize = 256;

/// A detection head normalized to anchors-first `[N, D]` order, with its
/// field layout resolved.
#[derive(Debug, Clone)]
pub struct DetectionHead {
    data: ndarray::Array2<f32>,
    layout: HeadLayout,
}

/// One anchor read out of a [`DetectionHead`].
#[derive(Debug, Clone)]
pub struct DecodedAnchor {
    /// Box center x.
    pub cx: f32,
    /// Box center y.
    pub cy: f32,
    /// Box width.
    pub w: f32,
    /// Box height.
    pub h: f32,
    /// Probability that this anchor contains any object.
    pub objectness: f32,
    /// Final confidence: objectness, times the best class score for
    /// multi-class heads.
    pub score: f32,
    /// Index of the best class score, 0 for single-class heads.
    pub class_id: usize,
    /// Mask coefficients (length 32) for segmentation exports. Extracted
    /// only; compositing against the prototype tensor is out of scope.
    pub mask_coefficients: Option<Vec<f32>>,
}

impl DetectionHead {
    /// Decode a raw head tensor into anchors-first `[N, D]` form.
    ///
    /// Accepts `[1, D, N]`, `[1, N, D]`, `[D, N]` or `[N, D]`. A 3-D
    /// tensor must have a batch axis of exactly 1. The axis order is
    /// disambiguated by a heuristic: a first axis that is ≤ 256 and
    /// strictly smaller than the second is taken to be the field axis
    /// and transposed away.
    pub fn decode(raw: &ArrayD<f32>, has_proto: bool) -> Result<Self, PostProcessError> {
        let malformed = || PostProcessError::MalformedHead {
            shape: raw.shape().to_vec(),
        };

        let view: ArrayView2<f32> = match raw.ndim() {
            3 => {
                if raw.shape()[0] != 1 {
                    return Err(malformed());
                }
                raw.index_axis(Axis(0), 0)
                    .into_dimensionality::<Ix2>()
                    .map_err(|_| malformed())?
            }
            2 => raw.view().into_dimensionality::<Ix2>().map_err(|_| malformed())?,
            _ => return Err(malformed()),
        };

        let data = if view.nrows() <= MAX_FIELD_AXIS && view.ncols() > view.nrows() {
            view.t().to_owned()
        } else {
            view.to_owned()
        };

        if data.ncols() < BOX_OBJ_FIELDS {
            return Err(malformed());
        }
        let layout = HeadLayout::resolve(data.ncols(), has_proto)?;

        Ok(Self { data, layout })
    }

    /// Number of anchors N.
    pub fn num_anchors(&self) -> usize {
        self.data.nrows()
    }

    /// Fields per anchor D.
    pub fn num_fields(&self) -> usize {
        self.data.ncols()
    }

    /// The resolved field layout.
    pub fn layout(&self) -> HeadLayout {
        self.layout
    }

    /// Iterate over all anchors in tensor order.
    pub fn anchors(&self) -> impl Iterator<Item = DecodedAnchor> + '_ {
        self.data
            .rows()
            .into_iter()
            .map(|row| decode_anchor(row, self.layout))
    }
}

fn decode_anchor(row: ArrayView1<f32>, layout: HeadLayout) -> DecodedAnchor {
    let objectness = row[4];

    let (score, class_id) = match layout.num_classes() {
        0 => (objectness, 0),
        num_classes => {
            let scores = row.slice(ndarray::s![BOX_OBJ_FIELDS..BOX_OBJ_FIELDS + num_classes]);
            let (class_id, best) = argmax(scores);
            (objectness * best, class_id)
        }
    };

    let mask_coefficients = match layout.mask_coef_len() {
        0 => None,
        len => {
            let start = BOX_OBJ_FIELDS + layout.num_classes();
            Some(row.slice(ndarray::s![start..start + len]).to_vec())
        }
    };

    DecodedAnchor {
        cx: row[0],
        cy: row[1],
        w: row[2],
        h: row[3],
        objectness,
        score,
        class_id,
        mask_coefficients,
    }
}

/// Index and value of the maximum score; ties go to the lowest index.
fn argmax(scores: ArrayView1<f32>) -> (usize, f32) {
    let mut best_idx = 0;
    let mut best = scores[0];
    for (i, &v) in scores.iter().enumerate().skip(1) {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    (best_idx, best)
}
