//! Angle helpers shared by the comparator and alignment search.

/// Number of quantized angle units in a full turn.
pub(crate) const ANGLE_UNITS: f32 = 256.0;

/// Wraps an angle in degrees to the range [-180, 180).
pub(crate) fn wrap_deg(angle_deg: f32) -> f32 {
    let mut wrapped = angle_deg % 360.0;
    if wrapped < -180.0 {
        wrapped += 360.0;
    }
    if wrapped >= 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Converts a quantized record angle (256 units per turn) to degrees.
pub(crate) fn units_to_deg(units: u8) -> f32 {
    units as f32 * (360.0 / ANGLE_UNITS)
}

/// Smallest absolute difference between two directions, in [0, 180].
pub(crate) fn circular_diff_deg(a_deg: f32, b_deg: f32) -> f32 {
    wrap_deg(a_deg - b_deg).abs()
}

/// Computes sine and cosine for an angle in degrees.
pub(crate) fn sin_cos_deg(angle_deg: f32) -> (f32, f32) {
    angle_deg.to_radians().sin_cos()
}

/// Linear falloff: 1 up to `tolerance`, 0 from `cutoff` on.
pub(crate) fn linear_falloff(value: f32, tolerance: f32, cutoff: f32) -> f32 {
    if value <= tolerance {
        1.0
    } else if value >= cutoff {
        0.0
    } else {
        1.0 - (value - tolerance) / (cutoff - tolerance)
    }
}
