//! Rigid alignment by seeded hypothesis voting.
//!
//! Each compatible (probe, candidate) minutia pair proposes the transform
//! that maps one onto the other. Pairs are ranked by how well the local
//! neighbourhoods of the two minutiae agree, and only the best
//! [`MAX_ALIGNMENT_SEEDS`] are voted on. A hypothesis collects one vote per
//! probe minutia that lands within full-credit tolerance of some candidate
//! minutia. Voting on a hypothesis stops as soon as it can no longer reach
//! the current best vote count.

use std::cmp::Ordering;

use crate::compare::{score_projected, Alignment, ComparatorParams};
use crate::template::{Minutia, MinutiaKind};
use crate::util::math::{circular_diff_deg, linear_falloff, units_to_deg, wrap_deg};

/// Upper bound on hypotheses voted on per call to [`estimate_alignment`].
pub const MAX_ALIGNMENT_SEEDS: usize = 48;

const NEIGHBOURS: usize = 4;
const NEIGHBOUR_DISTANCE_CUTOFF: f32 = 12.0;
const NEIGHBOUR_ANGLE_CUTOFF_DEG: f32 = 30.0;

/// The winning hypothesis and the evidence behind it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignmentEstimate {
    pub alignment: Alignment,
    /// Probe minutiae corroborating the alignment.
    pub votes: usize,
    /// Sum over probe minutiae of their best comparator score.
    pub support: f32,
    /// Sum of distances from corroborating minutiae to their nearest match.
    pub residual: f32,
    /// Indices of the minutia pair that proposed the alignment.
    pub seed: (usize, usize),
    /// Hypotheses voted on, never more than [`MAX_ALIGNMENT_SEEDS`].
    pub hypotheses: usize,
}

/// A neighbour seen from a minutia, in terms that survive rotation and
/// translation.
#[derive(Clone, Copy, Debug)]
struct Neighbour {
    distance: f32,
    relative_direction_deg: f32,
    bearing_deg: f32,
}

fn local_structures(set: &[Minutia]) -> Vec<Vec<Neighbour>> {
    set.iter()
        .enumerate()
        .map(|(i, m)| {
            let mut nearest: Vec<(f32, usize)> = set
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, o)| {
                    let dx = o.x() as f32 - m.x() as f32;
                    let dy = o.y() as f32 - m.y() as f32;
                    ((dx * dx + dy * dy).sqrt(), j)
                })
                .collect();
            nearest.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            nearest.truncate(NEIGHBOURS);

            let direction = units_to_deg(m.angle());
            nearest
                .into_iter()
                .map(|(distance, j)| {
                    let o = &set[j];
                    let dx = o.x() as f32 - m.x() as f32;
                    let dy = o.y() as f32 - m.y() as f32;
                    Neighbour {
                        distance,
                        relative_direction_deg: wrap_deg(units_to_deg(o.angle()) - direction),
                        // Image rotation turns the bearing one way and the
                        // minutia direction the other, so their sum is fixed.
                        bearing_deg: wrap_deg(dy.atan2(dx).to_degrees() + direction),
                    }
                })
                .collect()
        })
        .collect()
}

/// Sum over `a`'s neighbours of the best agreement with one of `b`'s.
fn neighbourhood_similarity(a: &[Neighbour], b: &[Neighbour]) -> f32 {
    a.iter()
        .map(|na| {
            b.iter()
                .map(|nb| {
                    linear_falloff(
                        (na.distance - nb.distance).abs(),
                        0.0,
                        NEIGHBOUR_DISTANCE_CUTOFF,
                    ) * linear_falloff(
                        circular_diff_deg(na.relative_direction_deg, nb.relative_direction_deg),
                        0.0,
                        NEIGHBOUR_ANGLE_CUTOFF_DEG,
                    ) * linear_falloff(
                        circular_diff_deg(na.bearing_deg, nb.bearing_deg),
                        0.0,
                        NEIGHBOUR_ANGLE_CUTOFF_DEG,
                    )
                })
                .fold(0.0f32, f32::max)
        })
        .sum()
}

fn kinds_compatible(a: MinutiaKind, b: MinutiaKind) -> bool {
    a == b || a == MinutiaKind::Unknown || b == MinutiaKind::Unknown
}

#[derive(Clone, Copy, Debug)]
struct Seed {
    similarity: f32,
    probe: usize,
    candidate: usize,
}

/// Compatible pairs ordered by neighbourhood similarity, best first.
fn ranked_seeds(
    probe: &[Minutia],
    candidate: &[Minutia],
    params: &ComparatorParams,
) -> Vec<Seed> {
    let probe_local = local_structures(probe);
    let candidate_local = local_structures(candidate);

    let mut seeds = Vec::new();
    for (i, a) in probe.iter().enumerate() {
        for (j, b) in candidate.iter().enumerate() {
            if !kinds_compatible(a.kind(), b.kind()) {
                continue;
            }
            let rotation =
                circular_diff_deg(units_to_deg(b.angle()), units_to_deg(a.angle()));
            if rotation > params.max_rotation_deg {
                continue;
            }
            seeds.push(Seed {
                similarity: neighbourhood_similarity(&probe_local[i], &candidate_local[j]),
                probe: i,
                candidate: j,
            });
        }
    }
    seeds.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then(a.probe.cmp(&b.probe))
            .then(a.candidate.cmp(&b.candidate))
    });
    seeds.truncate(MAX_ALIGNMENT_SEEDS);
    seeds
}

/// Ranks estimates: more votes, then more support, then less residual.
fn rank(a: &AlignmentEstimate, b: &AlignmentEstimate) -> Ordering {
    a.votes
        .cmp(&b.votes)
        .then_with(|| a.support.total_cmp(&b.support))
        .then_with(|| b.residual.total_cmp(&a.residual))
}

/// Votes on one hypothesis. Returns `None` once it cannot reach `to_beat` votes.
fn evaluate(
    alignment: Alignment,
    seed: (usize, usize),
    probe: &[Minutia],
    candidate: &[Minutia],
    params: &ComparatorParams,
    to_beat: usize,
) -> Option<AlignmentEstimate> {
    let mut votes = 0usize;
    let mut support = 0.0f32;
    let mut residual = 0.0f32;

    for (k, a) in probe.iter().enumerate() {
        if votes + (probe.len() - k) < to_beat {
            return None;
        }
        let projected = alignment.project(a);
        let mut best_score = 0.0f32;
        let mut nearest_hit: Option<f32> = None;
        for b in candidate {
            let (score, r) = score_projected(&projected, a.kind(), b, params);
            if score > best_score {
                best_score = score;
            }
            if r.within_tolerance(params) {
                nearest_hit = Some(nearest_hit.map_or(r.distance, |d| d.min(r.distance)));
            }
        }
        support += best_score;
        if let Some(distance) = nearest_hit {
            votes += 1;
            residual += distance;
        }
    }

    Some(AlignmentEstimate {
        alignment,
        votes,
        support,
        residual,
        seed,
        hypotheses: 0,
    })
}

/// Finds the best-corroborated rigid alignment from `probe` to `candidate`.
///
/// Seeds are voted on in ranked order and a later hypothesis replaces the
/// current best only when it ranks strictly higher, so the result is
/// deterministic. Returns `None` when either side is empty or no pair of
/// minutiae is compatible.
pub fn estimate_alignment(
    probe: &[Minutia],
    candidate: &[Minutia],
    params: &ComparatorParams,
) -> Option<AlignmentEstimate> {
    if probe.is_empty() || candidate.is_empty() {
        return None;
    }

    let seeds = ranked_seeds(probe, candidate, params);
    let mut best: Option<AlignmentEstimate> = None;
    for seed in &seeds {
        let (a, b) = (&probe[seed.probe], &candidate[seed.candidate]);
        let to_beat = best.map_or(0, |current| current.votes);
        let Some(estimate) = evaluate(
            Alignment::between(a, b),
            (seed.probe, seed.candidate),
            probe,
            candidate,
            params,
            to_beat,
        ) else {
            continue;
        };
        let replace = match &best {
            None => true,
            Some(current) => rank(&estimate, current) == Ordering::Greater,
        };
        if replace {
            best = Some(estimate);
        }
    }
    best.map(|estimate| AlignmentEstimate {
        hypotheses: seeds.len(),
        ..estimate
    })
}

#[cfg(test)]
mod tests {
    use super::{estimate_alignment, local_structures, neighbourhood_similarity, MAX_ALIGNMENT_SEEDS};
    use crate::compare::{Alignment, ComparatorParams};
    use crate::template::{Minutia, MinutiaKind};

    fn cloud() -> Vec<Minutia> {
        [
            (40, 50, 10),
            (120, 60, 80),
            (90, 150, 200),
            (200, 210, 30),
            (60, 260, 150),
            (170, 300, 100),
        ]
        .iter()
        .map(|&(x, y, a)| Minutia::new(x, y, a, MinutiaKind::RidgeEnding))
        .collect()
    }

    #[test]
    fn identical_sets_align_with_identity() {
        let params = ComparatorParams::default();
        let set = cloud();
        let est = estimate_alignment(&set, &set, &params).unwrap();
        assert_eq!(est.votes, set.len());
        assert_eq!(est.support, set.len() as f32);
        assert_eq!(est.residual, 0.0);
        assert_eq!(est.alignment.rotation_deg(), 0.0);
    }

    #[test]
    fn recovers_translation() {
        let params = ComparatorParams::default();
        let probe = cloud();
        let shift = Alignment::new(0.0, 15.0, -12.0);
        let candidate: Vec<Minutia> = probe
            .iter()
            .map(|m| {
                let p = shift.project(m);
                Minutia::new(p.x.round() as u16, p.y.round() as u16, m.angle(), m.kind())
            })
            .collect();
        let est = estimate_alignment(&probe, &candidate, &params).unwrap();
        assert_eq!(est.votes, probe.len());
        let (dx, dy) = est.alignment.translation();
        assert!((dx - 15.0).abs() < 1e-3 && (dy + 12.0).abs() < 1e-3);
    }

    #[test]
    fn empty_side_yields_none() {
        let params = ComparatorParams::default();
        assert!(estimate_alignment(&[], &cloud(), &params).is_none());
        assert!(estimate_alignment(&cloud(), &[], &params).is_none());
    }

    #[test]
    fn neighbourhoods_survive_rigid_motion() {
        let set = cloud();
        let motion = Alignment::new(30.0, 20.0, 10.0);
        let moved: Vec<Minutia> = set
            .iter()
            .map(|m| {
                let p = motion.project(m);
                let units = (p.angle_deg / 1.40625).round() as i32;
                Minutia::new(
                    p.x.round() as u16,
                    p.y.round() as u16,
                    units.rem_euclid(256) as u8,
                    m.kind(),
                )
            })
            .collect();
        let before = local_structures(&set);
        let after = local_structures(&moved);
        let same = neighbourhood_similarity(&before[2], &after[2]);
        let other = neighbourhood_similarity(&before[2], &after[4]);
        assert!(same > 3.0, "{same}");
        assert!(same > other);
    }

    #[test]
    fn incompatible_pairs_propose_nothing() {
        let params = ComparatorParams::default();
        let endings = cloud();
        let forks: Vec<Minutia> = endings
            .iter()
            .map(|m| Minutia::new(m.x(), m.y(), m.angle(), MinutiaKind::Bifurcation))
            .collect();
        assert!(estimate_alignment(&endings, &forks, &params).is_none());

        let turned: Vec<Minutia> = endings
            .iter()
            .map(|m| Minutia::new(m.x(), m.y(), m.angle().wrapping_add(128), m.kind()))
            .collect();
        assert!(estimate_alignment(&endings, &turned, &params).is_none());
    }

    #[test]
    fn hypotheses_are_capped_for_large_views() {
        let params = ComparatorParams::default();
        let grid: Vec<Minutia> = (0..255u16)
            .map(|i| {
                Minutia::new(
                    8 + 16 * (i % 16),
                    8 + 20 * (i / 16),
                    (i.wrapping_mul(73) % 256) as u8,
                    MinutiaKind::RidgeEnding,
                )
            })
            .collect();
        let est = estimate_alignment(&grid, &grid, &params).unwrap();
        assert_eq!(est.hypotheses, MAX_ALIGNMENT_SEEDS);
        assert_eq!(est.votes, grid.len());
        assert_eq!(est.alignment.rotation_deg(), 0.0);
    }
}
