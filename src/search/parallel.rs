//! Rayon-parallel gallery scans (feature-gated).
//!
//! Each worker decodes and scores its share of entries into a local
//! [`Tally`]; the partial tallies are then merged. The merge orders
//! candidates by (score desc, index asc), so the winner does not depend on
//! how rayon splits the work.

use rayon::prelude::*;

use crate::search::tally::{Tally, TopK};
use crate::search::{GallerySearch, GalleryRecord};
use crate::template::DecodedTemplate;

pub(crate) fn scan_par<T: GalleryRecord + Sync>(
    engine: &GallerySearch,
    probe: &DecodedTemplate,
    gallery: &[T],
) -> Tally {
    gallery
        .par_iter()
        .enumerate()
        .fold(Tally::default, |tally, (index, record)| {
            tally.push(engine.score_entry(probe, index, record))
        })
        .reduce(Tally::default, Tally::merge)
}

pub(crate) fn scan_top_k_par<T: GalleryRecord + Sync>(
    engine: &GallerySearch,
    probe: &DecodedTemplate,
    gallery: &[T],
    k: usize,
) -> (TopK, Tally) {
    gallery
        .par_iter()
        .enumerate()
        .fold(
            || (TopK::new(k), Tally::default()),
            |(mut top, tally), (index, record)| {
                let entry = engine.score_entry(probe, index, record);
                if let Some(scored) = entry {
                    top.push(scored);
                }
                (top, tally.push(entry))
            },
        )
        .reduce(
            || (TopK::new(k), Tally::default()),
            |(top_a, tally_a), (top_b, tally_b)| (top_a.merge(top_b), tally_a.merge(tally_b)),
        )
}
