//! One-to-many search of a probe against an enrolled gallery.
//!
//! [`GallerySearch`] is a plain value: it owns its configuration and nothing
//! else, so callers can build one per request or share one across threads.
//! The gallery is borrowed as an immutable slice for the whole call, and
//! the winning record is handed back by reference so callers keep their own
//! metadata.

#[cfg(feature = "rayon")]
pub(crate) mod parallel;
pub(crate) mod tally;

use std::time::{Duration, Instant};

use crate::compare::{Alignment, ComparatorParams};
use crate::matcher::{MatchOutcome, ScoreBand, TemplateMatcher, Threshold, MAX_SCORE};
use crate::search::tally::{Scored, Tally, TopK};
use crate::template::{decode_base64, DecodedTemplate};
use crate::trace::{trace_event, trace_reject, trace_span};
use crate::util::{ConfigError, FormatError, SearchError, SearchResult};

/// An enrolled entry: an identity key and a base64 encoded template.
///
/// Only these two fields are read. Any other data a record carries is
/// returned untouched through [`BestCandidate::record`].
pub trait GalleryRecord {
    fn identity_key(&self) -> &str;
    fn encoded_template(&self) -> &str;
}

impl<K: AsRef<str>, V: AsRef<str>> GalleryRecord for (K, V) {
    fn identity_key(&self) -> &str {
        self.0.as_ref()
    }

    fn encoded_template(&self) -> &str {
        self.1.as_ref()
    }
}

impl<R: GalleryRecord + ?Sized> GalleryRecord for &R {
    fn identity_key(&self) -> &str {
        (**self).identity_key()
    }

    fn encoded_template(&self) -> &str {
        (**self).encoded_template()
    }
}

/// Search configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    /// Minimum score reported as a match.
    pub threshold: Threshold,
    /// Only compare views whose finger positions are compatible.
    pub position_aware: bool,
    /// Searches over larger galleries are rejected.
    pub max_gallery_size: usize,
    /// Score gallery entries on the rayon pool (needs the `rayon` feature).
    pub parallel: bool,
    pub comparator: ComparatorParams,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::DEFAULT,
            position_aware: true,
            max_gallery_size: 10_000,
            parallel: false,
            comparator: ComparatorParams::default(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_gallery_size == 0 {
            return Err(ConfigError::ZeroGallerySize);
        }
        self.comparator.validate()
    }
}

/// The highest-scoring gallery entry.
#[derive(Debug)]
pub struct BestCandidate<'a, T> {
    /// Position in the gallery slice.
    pub index: usize,
    pub key: &'a str,
    /// The caller's own record.
    pub record: &'a T,
    pub matched_pairs: usize,
    pub alignment: Option<Alignment>,
}

impl<T> Clone for BestCandidate<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BestCandidate<'_, T> {}

/// Result of a successful gallery search.
#[derive(Debug)]
pub struct MatchReport<'a, T> {
    pub is_match: bool,
    /// Best-scoring entry, reported whether or not it passed the threshold.
    pub best: Option<BestCandidate<'a, T>>,
    pub score: u8,
    /// `score / 255 * 100`.
    pub percentage: f32,
    pub threshold: Threshold,
    pub band: ScoreBand,
    /// Entries that decoded and were scored.
    pub loaded_templates: usize,
    /// Entries skipped because they failed to decode.
    pub skipped_templates: usize,
    pub elapsed: Duration,
}

impl<'a, T> MatchReport<'a, T> {
    /// The matched record, only when the best score passed the threshold.
    pub fn matched(&self) -> Option<&'a T> {
        if self.is_match {
            self.best.map(|b| b.record)
        } else {
            None
        }
    }

    pub fn best_key(&self) -> Option<&'a str> {
        self.best.map(|b| b.key)
    }
}

/// One entry of a ranked result list.
#[derive(Debug)]
pub struct RankedCandidate<'a, T> {
    pub index: usize,
    pub key: &'a str,
    pub record: &'a T,
    pub score: u8,
    pub is_match: bool,
}

/// 1:1 comparison result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Verification {
    pub is_match: bool,
    pub outcome: MatchOutcome,
    pub threshold: Threshold,
    pub elapsed: Duration,
}

/// Score expressed as a percentage of the maximum.
pub fn score_percentage(score: u8) -> f32 {
    score as f32 / MAX_SCORE as f32 * 100.0
}

/// Stateless gallery search engine.
#[derive(Clone, Copy, Debug)]
pub struct GallerySearch {
    config: SearchConfig,
    matcher: TemplateMatcher,
}

impl GallerySearch {
    /// Builds an engine after validating the configuration.
    pub fn new(config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let matcher =
            TemplateMatcher::new(config.comparator).with_position_aware(config.position_aware);
        Ok(Self { config, matcher })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    /// Finds the best match for `probe` in `gallery`.
    ///
    /// Entries that fail to decode are skipped and counted. When several
    /// entries share the best score, the earliest one in the slice wins.
    pub fn search<'a, T>(&self, probe: &str, gallery: &'a [T]) -> SearchResult<MatchReport<'a, T>>
    where
        T: GalleryRecord + Sync,
    {
        let start = Instant::now();
        let _span = trace_span!("gallery_search", entries = gallery.len()).entered();

        self.check_gallery_size(gallery.len())?;
        let probe = self.decode_probe(probe)?;
        let tally = self.scan(&probe, gallery);
        self.report(tally, gallery, start)
    }

    /// Returns up to `k` entries ordered by descending score, earliest first on ties.
    pub fn rank<'a, T>(
        &self,
        probe: &str,
        gallery: &'a [T],
        k: usize,
    ) -> SearchResult<Vec<RankedCandidate<'a, T>>>
    where
        T: GalleryRecord + Sync,
    {
        let _span = trace_span!("gallery_rank", entries = gallery.len(), k = k).entered();

        self.check_gallery_size(gallery.len())?;
        let probe = self.decode_probe(probe)?;
        let (top, tally) = self.scan_top_k(&probe, gallery, k);
        if tally.loaded == 0 {
            return Err(SearchError::NoUsableTemplates {
                skipped: tally.skipped,
            });
        }
        Ok(self.ranked(top, gallery))
    }

    /// [`search`](Self::search) and [`rank`](Self::rank) from a single scan
    /// of the gallery. Both halves agree with the separate calls.
    pub fn search_ranked<'a, T>(
        &self,
        probe: &str,
        gallery: &'a [T],
        k: usize,
    ) -> SearchResult<(MatchReport<'a, T>, Vec<RankedCandidate<'a, T>>)>
    where
        T: GalleryRecord + Sync,
    {
        let start = Instant::now();
        let _span = trace_span!("gallery_search_ranked", entries = gallery.len(), k = k).entered();

        self.check_gallery_size(gallery.len())?;
        let probe = self.decode_probe(probe)?;
        let (top, tally) = self.scan_top_k(&probe, gallery, k);
        let report = self.report(tally, gallery, start)?;
        Ok((report, self.ranked(top, gallery)))
    }

    /// Compares two encoded templates directly.
    pub fn verify(&self, probe: &str, candidate: &str) -> Result<Verification, FormatError> {
        let start = Instant::now();
        let probe = decode_base64(probe)?;
        let candidate = decode_base64(candidate)?;
        let outcome = self.matcher.match_templates(&probe, &candidate);
        Ok(Verification {
            is_match: self.config.threshold.accepts(outcome.score),
            outcome,
            threshold: self.config.threshold,
            elapsed: start.elapsed(),
        })
    }

    fn report<'a, T: GalleryRecord>(
        &self,
        tally: Tally,
        gallery: &'a [T],
        start: Instant,
    ) -> SearchResult<MatchReport<'a, T>> {
        let Some(best) = tally.best else {
            return Err(SearchError::NoUsableTemplates {
                skipped: tally.skipped,
            });
        };

        let record = &gallery[best.index];
        let threshold = self.config.threshold;
        let report = MatchReport {
            is_match: threshold.accepts(best.score),
            best: Some(BestCandidate {
                index: best.index,
                key: record.identity_key(),
                record,
                matched_pairs: best.matched_pairs,
                alignment: best.alignment,
            }),
            score: best.score,
            percentage: score_percentage(best.score),
            threshold,
            band: ScoreBand::of(best.score),
            loaded_templates: tally.loaded,
            skipped_templates: tally.skipped,
            elapsed: start.elapsed(),
        };

        trace_event!(
            "gallery_search_done",
            score = report.score,
            best_index = best.index,
            loaded = report.loaded_templates,
            skipped = report.skipped_templates,
            is_match = report.is_match
        );
        Ok(report)
    }

    fn ranked<'a, T: GalleryRecord>(
        &self,
        top: TopK,
        gallery: &'a [T],
    ) -> Vec<RankedCandidate<'a, T>> {
        let threshold = self.config.threshold;
        top.into_sorted_desc()
            .into_iter()
            .map(|scored| {
                let record = &gallery[scored.index];
                RankedCandidate {
                    index: scored.index,
                    key: record.identity_key(),
                    record,
                    score: scored.score,
                    is_match: threshold.accepts(scored.score),
                }
            })
            .collect()
    }

    fn check_gallery_size(&self, len: usize) -> SearchResult<()> {
        if len > self.config.max_gallery_size {
            return Err(SearchError::GalleryTooLarge {
                len,
                max: self.config.max_gallery_size,
            });
        }
        Ok(())
    }

    fn decode_probe(&self, probe: &str) -> SearchResult<DecodedTemplate> {
        decode_base64(probe).map_err(|err| {
            trace_reject!("probe_rejected", err,);
            SearchError::Probe(err)
        })
    }

    /// Decodes and scores one entry; `None` when the entry is unusable.
    pub(crate) fn score_entry<T: GalleryRecord>(
        &self,
        probe: &DecodedTemplate,
        index: usize,
        record: &T,
    ) -> Option<Scored> {
        match decode_base64(record.encoded_template()) {
            Ok(candidate) => {
                let outcome = self.matcher.match_templates(probe, &candidate);
                Some(Scored {
                    index,
                    score: outcome.score,
                    matched_pairs: outcome.matched_pairs,
                    alignment: outcome.alignment,
                })
            }
            Err(err) => {
                trace_reject!("gallery_entry_skipped", err, index = index);
                None
            }
        }
    }

    fn scan<T: GalleryRecord + Sync>(&self, probe: &DecodedTemplate, gallery: &[T]) -> Tally {
        #[cfg(feature = "rayon")]
        {
            if self.config.parallel {
                return parallel::scan_par(self, probe, gallery);
            }
        }

        gallery
            .iter()
            .enumerate()
            .fold(Tally::default(), |tally, (index, record)| {
                tally.push(self.score_entry(probe, index, record))
            })
    }

    fn scan_top_k<T: GalleryRecord + Sync>(
        &self,
        probe: &DecodedTemplate,
        gallery: &[T],
        k: usize,
    ) -> (TopK, Tally) {
        #[cfg(feature = "rayon")]
        {
            if self.config.parallel {
                return parallel::scan_top_k_par(self, probe, gallery, k);
            }
        }

        let mut top = TopK::new(k);
        let mut tally = Tally::default();
        for (index, record) in gallery.iter().enumerate() {
            let entry = self.score_entry(probe, index, record);
            if let Some(scored) = entry {
                top.push(scored);
            }
            tally = tally.push(entry);
        }
        (top, tally)
    }
}

#[cfg(test)]
mod tests {
    use super::{score_percentage, GallerySearch, GalleryRecord, SearchConfig};
    use crate::util::ConfigError;

    #[test]
    fn percentage_spans_full_scale() {
        assert_eq!(score_percentage(0), 0.0);
        assert!((score_percentage(255) - 100.0).abs() < 1e-4);
        assert!((score_percentage(51) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn tuples_act_as_records() {
        let entry = ("alice", String::from("Rk1S"));
        assert_eq!(entry.identity_key(), "alice");
        assert_eq!(entry.encoded_template(), "Rk1S");
    }

    #[test]
    fn zero_gallery_bound_is_rejected() {
        let config = SearchConfig {
            max_gallery_size: 0,
            ..SearchConfig::default()
        };
        assert_eq!(
            GallerySearch::new(config).unwrap_err(),
            ConfigError::ZeroGallerySize
        );
    }
}
