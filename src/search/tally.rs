//! Merging per-entry results into a search outcome.
//!
//! Candidates are ordered by descending score, then ascending gallery index.
//! That order is total, so the merges below are associative and commutative
//! and a parallel reduction picks the same winner as a sequential scan.

use std::cmp::Ordering;

use crate::compare::Alignment;

/// Score of one successfully decoded gallery entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Scored {
    pub(crate) index: usize,
    pub(crate) score: u8,
    pub(crate) matched_pairs: usize,
    pub(crate) alignment: Option<Alignment>,
}

/// Descending score, then ascending index (earliest entry wins ties).
pub(crate) fn scored_cmp_desc(a: &Scored, b: &Scored) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.index.cmp(&b.index))
}

fn better(a: Scored, b: Scored) -> Scored {
    if scored_cmp_desc(&b, &a) == Ordering::Less {
        b
    } else {
        a
    }
}

/// Running totals of a gallery scan.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Tally {
    pub(crate) best: Option<Scored>,
    pub(crate) loaded: usize,
    pub(crate) skipped: usize,
}

impl Tally {
    pub(crate) fn push(mut self, entry: Option<Scored>) -> Self {
        match entry {
            Some(scored) => {
                self.loaded += 1;
                self.best = Some(match self.best {
                    Some(current) => better(current, scored),
                    None => scored,
                });
            }
            None => self.skipped += 1,
        }
        self
    }

    #[cfg(feature = "rayon")]
    pub(crate) fn merge(self, other: Self) -> Self {
        let best = match (self.best, other.best) {
            (Some(a), Some(b)) => Some(better(a, b)),
            (a, b) => a.or(b),
        };
        Self {
            best,
            loaded: self.loaded + other.loaded,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// Keeps the `k` best candidates seen so far.
pub(crate) struct TopK {
    k: usize,
    items: Vec<Scored>,
}

impl TopK {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k.min(64)),
        }
    }

    /// Pushes a candidate, evicting the worst one when full.
    pub(crate) fn push(&mut self, scored: Scored) {
        if self.k == 0 {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(scored);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if scored_cmp_desc(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }
        if scored_cmp_desc(&scored, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = scored;
        }
    }

    #[cfg(feature = "rayon")]
    pub(crate) fn merge(mut self, other: Self) -> Self {
        for scored in other.items {
            self.push(scored);
        }
        self
    }

    pub(crate) fn into_sorted_desc(mut self) -> Vec<Scored> {
        self.items.sort_by(scored_cmp_desc);
        self.items
    }
}
