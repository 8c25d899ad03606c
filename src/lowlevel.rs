//! Building blocks for custom matching pipelines.
//!
//! Most callers only need [`crate::GallerySearch`] or
//! [`crate::TemplateMatcher`]. These items expose the alignment vote and the
//! assignment solver on their own, for callers that score minutiae sets
//! produced outside the record decoder.

pub use crate::compare::{correspondence, Projected};
pub use crate::matcher::align::{estimate_alignment, AlignmentEstimate, MAX_ALIGNMENT_SEEDS};
pub use crate::matcher::assign::{max_weight_assignment, Assignment};
