//! Template-to-template similarity scoring.
//!
//! Scoring a pair of templates runs in three stages: pair up finger views,
//! estimate a rigid alignment for each view pair by voting, then solve an
//! optimal one-to-one assignment under that alignment. The result is an
//! integer on the 0..=255 scale shared with [`Threshold`].

pub(crate) mod align;
pub(crate) mod assign;

use std::cmp::Ordering;

use crate::compare::{correspondence, Alignment, ComparatorParams};
use crate::matcher::align::estimate_alignment;
use crate::matcher::assign::max_weight_assignment;
use crate::template::{DecodedTemplate, FingerView, Minutia};
use crate::trace::{trace_event, trace_span};
use crate::util::ConfigError;

/// Highest similarity score; a template compared with itself reaches it.
pub const MAX_SCORE: u8 = 255;

/// Usable minutiae scored per view. Larger views keep their highest-quality
/// minutiae.
pub const MAX_VIEW_MINUTIAE: usize = 128;

/// Compatible view pairs scored per template pair; later pairs are ignored.
pub const MAX_VIEW_PAIRS: usize = 32;

/// Minimum score accepted as a genuine match, on the 0..=255 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold(u8);

impl Threshold {
    pub const DEFAULT: Self = Self(120);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn accepts(self, score: u8) -> bool {
        score >= self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Threshold {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| ConfigError::ThresholdOutOfRange { value })
    }
}

/// Calibration band of a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScoreBand {
    /// Below 100: likely a different finger.
    Low,
    /// 100..=149: needs review.
    Medium,
    /// 150..=199.
    Good,
    /// 200 and above.
    Excellent,
}

impl ScoreBand {
    pub fn of(score: u8) -> Self {
        match score {
            0..=99 => Self::Low,
            100..=149 => Self::Medium,
            150..=199 => Self::Good,
            _ => Self::Excellent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

/// Outcome of matching one probe template against one candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchOutcome {
    /// Similarity on the 0..=255 scale.
    pub score: u8,
    /// Probe-to-candidate transform of the winning view pair.
    pub alignment: Option<Alignment>,
    /// (probe view, candidate view) indices of the winning pair.
    pub views: Option<(usize, usize)>,
    /// Assigned minutia pairs with non-zero correspondence.
    pub matched_pairs: usize,
}

impl MatchOutcome {
    const NONE: Self = Self {
        score: 0,
        alignment: None,
        views: None,
        matched_pairs: 0,
    };

    pub fn band(&self) -> ScoreBand {
        ScoreBand::of(self.score)
    }
}

#[derive(Clone, Copy, Debug)]
struct ViewScore {
    score: u8,
    alignment: Option<Alignment>,
    matched_pairs: usize,
}

/// Stateless pairwise matcher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateMatcher {
    params: ComparatorParams,
    position_aware: bool,
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(ComparatorParams::default())
    }
}

impl TemplateMatcher {
    /// Creates a position-aware matcher with the given comparator parameters.
    pub fn new(params: ComparatorParams) -> Self {
        Self {
            params,
            position_aware: true,
        }
    }

    /// When enabled, views whose known finger positions differ are never compared.
    pub fn with_position_aware(mut self, position_aware: bool) -> Self {
        self.position_aware = position_aware;
        self
    }

    pub fn params(&self) -> &ComparatorParams {
        &self.params
    }

    pub fn position_aware(&self) -> bool {
        self.position_aware
    }

    /// Scores `probe` against `candidate`.
    ///
    /// The best compatible view pair decides the score; ties keep the earliest
    /// pair. Templates without usable minutiae score 0.
    pub fn match_templates(
        &self,
        probe: &DecodedTemplate,
        candidate: &DecodedTemplate,
    ) -> MatchOutcome {
        let _span = trace_span!(
            "match_templates",
            probe_views = probe.views().len(),
            candidate_views = candidate.views().len()
        )
        .entered();

        let mut best = MatchOutcome::NONE;
        let mut scored_pairs = 0usize;
        'views: for (pi, pv) in probe.views().iter().enumerate() {
            for (ci, cv) in candidate.views().iter().enumerate() {
                if self.position_aware && !pv.position().is_compatible(cv.position()) {
                    continue;
                }
                if scored_pairs == MAX_VIEW_PAIRS {
                    trace_event!("view_pair_cap", limit = MAX_VIEW_PAIRS);
                    break 'views;
                }
                scored_pairs += 1;
                let scored = self.score_views(pv, cv);
                if best.views.is_none() || scored.score > best.score {
                    best = MatchOutcome {
                        score: scored.score,
                        alignment: scored.alignment,
                        views: Some((pi, ci)),
                        matched_pairs: scored.matched_pairs,
                    };
                }
            }
        }
        best
    }

    /// Scores one view pair. The pair is put in a canonical order first so the
    /// score does not depend on which side is the probe.
    fn score_views(&self, probe: &FingerView, candidate: &FingerView) -> ViewScore {
        let a = scoring_set(probe);
        let b = scoring_set(candidate);

        let swapped = a.cmp(&b) == Ordering::Greater;
        let (first, second) = if swapped { (&b, &a) } else { (&a, &b) };
        let scored = self.score_ordered(first, second);

        ViewScore {
            alignment: scored
                .alignment
                .map(|al| if swapped { al.inverse() } else { al }),
            ..scored
        }
    }

    fn score_ordered(&self, a: &[Minutia], b: &[Minutia]) -> ViewScore {
        let Some(estimate) = estimate_alignment(a, b, &self.params) else {
            return ViewScore {
                score: 0,
                alignment: None,
                matched_pairs: 0,
            };
        };

        let alignment = estimate.alignment;
        let cols = b.len();
        let mut weights = Vec::with_capacity(a.len() * cols);
        for ma in a {
            for mb in b {
                weights.push(correspondence(ma, mb, &alignment, &self.params));
            }
        }
        let assignment = max_weight_assignment(&weights, a.len(), cols);

        ViewScore {
            score: normalize(assignment.total, a.len(), b.len()),
            alignment: Some(alignment),
            matched_pairs: assignment.matched(&weights, cols),
        }
    }
}

/// Usable minutiae of a view in record order, cut down to the
/// [`MAX_VIEW_MINUTIAE`] of highest quality (ties keep record order).
fn scoring_set(view: &FingerView) -> Vec<Minutia> {
    let usable: Vec<Minutia> = view.usable_minutiae().copied().collect();
    if usable.len() <= MAX_VIEW_MINUTIAE {
        return usable;
    }
    let mut order: Vec<usize> = (0..usable.len()).collect();
    order.sort_by(|&i, &j| {
        let qi = usable[i].quality().unwrap_or(0);
        let qj = usable[j].quality().unwrap_or(0);
        qj.cmp(&qi).then(i.cmp(&j))
    });
    order.truncate(MAX_VIEW_MINUTIAE);
    order.sort_unstable();
    order.into_iter().map(|i| usable[i]).collect()
}

/// Maps a total correspondence onto 0..=255 relative to both minutia counts.
fn normalize(total: f32, n_a: usize, n_b: usize) -> u8 {
    let denom = (n_a + n_b) as f32;
    if denom == 0.0 || !total.is_finite() {
        return 0;
    }
    let ratio = (2.0 * total / denom).clamp(0.0, 1.0);
    (ratio * MAX_SCORE as f32).round() as u8
}
