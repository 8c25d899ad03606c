#![allow(dead_code)]

use fmrmatch::{
    Alignment, DecodedTemplate, FingerPosition, FingerView, Minutia, MinutiaKind, TemplateBuilder,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const WIDTH: u16 = 256;
pub const HEIGHT: u16 = 360;
const MARGIN: u16 = 24;
const MIN_SPACING: f32 = 14.0;

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn spaced(existing: &[Minutia], x: u16, y: u16) -> bool {
    existing.iter().all(|m| {
        let dx = m.x() as f32 - x as f32;
        let dy = m.y() as f32 - y as f32;
        (dx * dx + dy * dy).sqrt() >= MIN_SPACING
    })
}

/// Random minutiae at least `MIN_SPACING` pixels apart.
pub fn random_minutiae(rng: &mut StdRng, count: usize) -> Vec<Minutia> {
    let mut out: Vec<Minutia> = Vec::with_capacity(count);
    while out.len() < count {
        let x = rng.random_range(MARGIN..WIDTH - MARGIN);
        let y = rng.random_range(MARGIN..HEIGHT - MARGIN);
        if !spaced(&out, x, y) {
            continue;
        }
        let kind = if rng.random_bool(0.5) {
            MinutiaKind::RidgeEnding
        } else {
            MinutiaKind::Bifurcation
        };
        out.push(Minutia::new(x, y, rng.random::<u8>(), kind).with_quality(60));
    }
    out
}

/// Rotation about the image centre followed by a shift.
pub fn about_center(rotation_deg: f32, shift_x: f32, shift_y: f32) -> Alignment {
    let (cx, cy) = (WIDTH / 2, HEIGHT / 2);
    let centre = Minutia::new(cx, cy, 0, MinutiaKind::Unknown);
    let p = Alignment::new(rotation_deg, 0.0, 0.0).project(&centre);
    Alignment::new(
        rotation_deg,
        cx as f32 - p.x + shift_x,
        cy as f32 - p.y + shift_y,
    )
}

/// Simulates a second capture of the same finger: moved, jittered, with some
/// minutiae missed and some spurious ones added.
pub fn recapture(
    rng: &mut StdRng,
    minutiae: &[Minutia],
    motion: Alignment,
    jitter: f32,
    drop_rate: f64,
    spurious: usize,
) -> Vec<Minutia> {
    let mut out = Vec::with_capacity(minutiae.len() + spurious);
    for m in minutiae {
        if rng.random_bool(drop_rate) {
            continue;
        }
        let p = motion.project(m);
        let x = p.x + rng.random_range(-jitter..=jitter);
        let y = p.y + rng.random_range(-jitter..=jitter);
        if x < 0.0 || y < 0.0 || x >= WIDTH as f32 || y >= HEIGHT as f32 {
            continue;
        }
        let units = (p.angle_deg / 1.40625).round() as i32 + rng.random_range(-2..=2);
        out.push(
            Minutia::new(
                x.round() as u16,
                y.round() as u16,
                units.rem_euclid(256) as u8,
                m.kind(),
            )
            .with_quality(55),
        );
    }
    out.extend(random_minutiae(rng, spurious));
    out
}

pub fn single_view(position: u8, minutiae: Vec<Minutia>) -> DecodedTemplate {
    TemplateBuilder::new(WIDTH, HEIGHT)
        .view(FingerView::new(FingerPosition(position), minutiae))
        .build()
        .unwrap()
}

pub fn encoded(position: u8, minutiae: Vec<Minutia>) -> String {
    single_view(position, minutiae).to_base64()
}
