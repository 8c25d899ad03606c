#![cfg(feature = "rayon")]

mod common;

use fmrmatch::{GallerySearch, SearchConfig};

use common::{about_center, encoded, random_minutiae, recapture, rng};

fn gallery(seed: u64, count: usize) -> Vec<(String, String)> {
    let mut rng = rng(seed);
    (0..count)
        .map(|i| {
            let template = if i % 7 == 3 {
                "corrupt".to_string()
            } else {
                encoded(1, random_minutiae(&mut rng, 25))
            };
            (format!("template_{i}"), template)
        })
        .collect()
}

fn engines() -> (GallerySearch, GallerySearch) {
    let sequential = GallerySearch::new(SearchConfig::default()).unwrap();
    let parallel = GallerySearch::new(SearchConfig {
        parallel: true,
        ..SearchConfig::default()
    })
    .unwrap();
    (sequential, parallel)
}

#[test]
fn parallel_search_matches_sequential() {
    let mut entries = gallery(1, 40);
    // Two identical enrollments: the earlier one must win in both modes.
    entries[31].1 = entries[12].1.clone();
    let probe = entries[12].1.clone();
    let (sequential, parallel) = engines();

    let a = sequential.search(&probe, &entries).unwrap();
    let b = parallel.search(&probe, &entries).unwrap();
    assert_eq!(a.best.unwrap().index, 12);
    assert_eq!(b.best.unwrap().index, 12);
    assert_eq!(a.score, b.score);
    assert_eq!(
        (a.loaded_templates, a.skipped_templates),
        (b.loaded_templates, b.skipped_templates)
    );
}

#[test]
fn parallel_rank_matches_sequential() {
    let entries = gallery(2, 30);
    let mut rng = rng(77);
    let base: Vec<_> = fmrmatch::decode_base64(&entries[20].1).unwrap().views()[0]
        .minutiae()
        .to_vec();
    let probe = encoded(
        1,
        recapture(&mut rng, &base, about_center(5.0, 4.0, -3.0), 2.0, 0.1, 2),
    );
    let (sequential, parallel) = engines();

    let a = sequential.rank(&probe, &entries, 5).unwrap();
    let b = parallel.rank(&probe, &entries, 5).unwrap();
    let order_a: Vec<_> = a.iter().map(|c| (c.index, c.score)).collect();
    let order_b: Vec<_> = b.iter().map(|c| (c.index, c.score)).collect();
    assert_eq!(order_a, order_b);
    assert_eq!(order_a[0].0, 20);
}
