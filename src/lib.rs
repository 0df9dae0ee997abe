//! Post-processing for YOLO-style object-detection heads.
//!
//! Export pipelines disagree about what a detection head looks like: the
//! anchor axis may come first or last, a per-class score block may or may
//! not be present, and segmentation exports append mask coefficients next
//! to a shared mask-prototype tensor. This crate takes the raw output
//! tensors of one inference run — no schema, no model metadata — infers
//! the layout from shape alone, and turns them into a clean, deduplicated
//! list of [`Detection`]s.
//!
//! The whole pipeline is pure and stateless: build a [`PostProcessor`]
//! once and call [`PostProcessor::process`] from as many threads as you
//! like, once per inference run.
//!
//! # Example
//!
//! ```ignore
//! use ndarray::ArrayD;
//! use yolopost_rs::{PostProcessor, PostProcessConfig};
//!
//! let outputs: Vec<ArrayD<f32>> = run_model(image)?;
//! let engine = PostProcessor::with_default_config();
//! let detections = engine.process(&outputs, 640, 480)?;
//! for det in detections {
//!     println!("class {} at {:?} ({:.2})", det.class_id, det.bbox, det.score);
//! }
//! ```

pub mod postprocess;

pub use postprocess::{
    Candidate, DecodedAnchor, Detection, DetectionHead, HeadLayout, PostProcessConfig,
    PostProcessError, PostProcessor, Rect, ResolvedOutputs,
};
