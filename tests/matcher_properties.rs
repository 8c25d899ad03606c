mod common;

use fmrmatch::lowlevel::{estimate_alignment, MAX_ALIGNMENT_SEEDS};
use fmrmatch::{
    ComparatorParams, FingerPosition, FingerView, Minutia, MinutiaKind, ScoreBand,
    TemplateBuilder, TemplateMatcher, MAX_SCORE, MAX_VIEWS, MAX_VIEW_MINUTIAE,
};

use common::{about_center, random_minutiae, recapture, rng, single_view, HEIGHT, WIDTH};

#[test]
fn template_matches_itself_at_full_score() {
    let matcher = TemplateMatcher::default();
    for seed in 0..4 {
        let mut rng = rng(seed);
        let tpl = single_view(1, random_minutiae(&mut rng, 20 + seed as usize * 5));
        let outcome = matcher.match_templates(&tpl, &tpl);
        assert_eq!(outcome.score, MAX_SCORE, "seed {seed}");
        assert_eq!(outcome.band(), ScoreBand::Excellent);
        assert_eq!(outcome.views, Some((0, 0)));
    }
}

#[test]
fn score_is_symmetric() {
    let matcher = TemplateMatcher::default();
    for seed in 10..16 {
        let mut rng = rng(seed);
        let base = random_minutiae(&mut rng, 30);
        let genuine = recapture(&mut rng, &base, about_center(8.0, 10.0, 5.0), 2.0, 0.1, 3);
        let impostor = random_minutiae(&mut rng, 28);

        let a = single_view(2, base);
        let b = single_view(2, genuine);
        let c = single_view(2, impostor);

        assert_eq!(
            matcher.match_templates(&a, &b).score,
            matcher.match_templates(&b, &a).score,
            "seed {seed}"
        );
        assert_eq!(
            matcher.match_templates(&a, &c).score,
            matcher.match_templates(&c, &a).score,
            "seed {seed}"
        );
    }
}

#[test]
fn reversed_comparison_reports_inverse_alignment() {
    let matcher = TemplateMatcher::default();
    let mut rng = rng(21);
    let base = random_minutiae(&mut rng, 30);
    let moved = recapture(&mut rng, &base, about_center(6.0, 9.0, -4.0), 1.0, 0.0, 0);
    let a = single_view(1, base);
    let b = single_view(1, moved);

    let forward = matcher.match_templates(&a, &b).alignment.unwrap();
    let backward = matcher.match_templates(&b, &a).alignment.unwrap();
    let probe = a.views()[0].minutiae()[0];
    let there = forward.project(&probe);
    let back = backward.project(&Minutia::new(
        there.x.round().max(0.0) as u16,
        there.y.round().max(0.0) as u16,
        probe.angle(),
        probe.kind(),
    ));
    assert!((back.x - probe.x() as f32).abs() < 2.0);
    assert!((back.y - probe.y() as f32).abs() < 2.0);
}

#[test]
fn different_fingers_score_low() {
    let matcher = TemplateMatcher::default();
    for seed in 100..108 {
        let mut rng = rng(seed);
        let a = single_view(3, random_minutiae(&mut rng, 35));
        let b = single_view(3, random_minutiae(&mut rng, 32));
        let outcome = matcher.match_templates(&a, &b);
        assert!(outcome.score < 100, "seed {seed}: {}", outcome.score);
        assert_eq!(outcome.band(), ScoreBand::Low);
    }
}

#[test]
fn recapture_of_same_finger_scores_high() {
    let matcher = TemplateMatcher::default();
    for seed in 200..206 {
        let mut rng = rng(seed);
        let base = random_minutiae(&mut rng, 35);
        let motion = about_center(-10.0, 12.0, -8.0);
        let probe = single_view(4, recapture(&mut rng, &base, motion, 2.0, 0.1, 3));
        let candidate = single_view(4, base);
        let outcome = matcher.match_templates(&probe, &candidate);
        assert!(outcome.score >= 150, "seed {seed}: {}", outcome.score);
        assert!(outcome.matched_pairs >= 20);
    }
}

#[test]
fn recovered_alignment_maps_probe_onto_candidate() {
    let matcher = TemplateMatcher::default();
    let mut rng = rng(33);
    let base = random_minutiae(&mut rng, 30);
    let motion = about_center(12.0, -6.0, 10.0);
    let moved = recapture(&mut rng, &base, motion, 0.5, 0.0, 0);
    let outcome = matcher.match_templates(&single_view(1, base), &single_view(1, moved));
    let alignment = outcome.alignment.unwrap();
    assert!((alignment.rotation_deg() - 12.0).abs() < 6.0);
}

#[test]
fn empty_views_score_zero() {
    let matcher = TemplateMatcher::default();
    let mut rng = rng(1);
    let full = single_view(1, random_minutiae(&mut rng, 20));
    let empty = single_view(1, Vec::new());
    assert_eq!(matcher.match_templates(&full, &empty).score, 0);
    assert_eq!(matcher.match_templates(&empty, &full).score, 0);
    assert_eq!(matcher.match_templates(&empty, &empty).score, 0);
}

#[test]
fn flagged_minutiae_do_not_count() {
    let matcher = TemplateMatcher::default();
    let mut rng = rng(8);
    let mut minutiae = random_minutiae(&mut rng, 20);
    let clean = single_view(1, minutiae.clone());
    minutiae.push(Minutia::new(WIDTH + 40, 10, 0, MinutiaKind::RidgeEnding));
    minutiae.push(Minutia::new(10, HEIGHT + 3, 128, MinutiaKind::Bifurcation));
    let noisy = single_view(1, minutiae);
    assert_eq!(noisy.usable_minutiae_count(), 20);
    assert_eq!(matcher.match_templates(&clean, &noisy).score, MAX_SCORE);
}

#[test]
fn best_view_pair_decides_without_averaging() {
    let matcher = TemplateMatcher::default();
    let mut rng = rng(44);
    let index_finger = random_minutiae(&mut rng, 30);
    let thumb = random_minutiae(&mut rng, 30);

    let probe = TemplateBuilder::new(WIDTH, HEIGHT)
        .view(FingerView::new(FingerPosition(2), random_minutiae(&mut rng, 30)))
        .view(FingerView::new(FingerPosition(7), index_finger.clone()))
        .build()
        .unwrap();
    let candidate = TemplateBuilder::new(WIDTH, HEIGHT)
        .view(FingerView::new(FingerPosition(1), thumb))
        .view(FingerView::new(FingerPosition(7), index_finger))
        .build()
        .unwrap();

    let outcome = matcher.match_templates(&probe, &candidate);
    assert_eq!(outcome.score, MAX_SCORE);
    assert_eq!(outcome.views, Some((1, 1)));
}

#[test]
fn unknown_position_pairs_with_any_view() {
    let matcher = TemplateMatcher::default();
    let mut rng = rng(45);
    let minutiae = random_minutiae(&mut rng, 25);
    let probe = single_view(0, minutiae.clone());
    let candidate = TemplateBuilder::new(WIDTH, HEIGHT)
        .view(FingerView::new(FingerPosition(5), random_minutiae(&mut rng, 25)))
        .view(FingerView::new(FingerPosition(9), minutiae))
        .build()
        .unwrap();
    let outcome = matcher.match_templates(&probe, &candidate);
    assert_eq!(outcome.score, MAX_SCORE);
    assert_eq!(outcome.views, Some((0, 1)));
}

/// A full view: 255 minutiae on a 16 x 16 grid with scattered directions.
fn crowded_view(rotate: u8) -> Vec<Minutia> {
    (0..255u16)
        .map(|i| {
            let kind = if i % 5 == 0 {
                MinutiaKind::Bifurcation
            } else {
                MinutiaKind::RidgeEnding
            };
            let angle = (i.wrapping_mul(97) % 256) as u8;
            Minutia::new(8 + 15 * (i % 16), 10 + 21 * (i / 16), angle.wrapping_add(rotate), kind)
        })
        .collect()
}

#[test]
fn crowded_views_vote_on_bounded_hypotheses() {
    let params = ComparatorParams::default();
    let view = crowded_view(0);
    let estimate = estimate_alignment(&view, &view, &params).unwrap();
    assert_eq!(estimate.hypotheses, MAX_ALIGNMENT_SEEDS);
    assert_eq!(estimate.votes, view.len());

    let other = crowded_view(40);
    let estimate = estimate_alignment(&view, &other, &params).unwrap();
    assert!(estimate.hypotheses <= MAX_ALIGNMENT_SEEDS);
}

#[test]
fn largest_records_match_themselves() {
    let matcher = TemplateMatcher::default();
    let mut builder = TemplateBuilder::new(WIDTH, HEIGHT);
    for _ in 0..MAX_VIEWS {
        builder = builder.view(FingerView::new(FingerPosition(4), crowded_view(0)));
    }
    let record = builder.build().unwrap();
    assert!(record.views()[0].usable_count() > MAX_VIEW_MINUTIAE);

    let outcome = matcher.match_templates(&record, &record);
    assert_eq!(outcome.score, MAX_SCORE);
    assert_eq!(outcome.views, Some((0, 0)));
    assert_eq!(outcome.matched_pairs, MAX_VIEW_MINUTIAE);
}
