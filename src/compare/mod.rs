//! Minutia-to-minutia correspondence under a rigid alignment.
//!
//! An [`Alignment`] maps probe coordinates into candidate coordinates. The
//! comparator projects the probe minutia, then multiplies three bounded
//! factors (position, direction, type) into a score in `[0, 1]`.

use crate::template::{Minutia, MinutiaKind};
use crate::util::math::{circular_diff_deg, linear_falloff, sin_cos_deg, units_to_deg, wrap_deg};
use crate::util::ConfigError;

/// Tolerances and weights used by the comparator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComparatorParams {
    /// Distance (pixels) that still earns full position credit.
    pub position_tolerance: f32,
    /// Distance (pixels) at which position credit reaches zero.
    pub position_cutoff: f32,
    /// Direction difference (degrees) that still earns full credit.
    pub angle_tolerance_deg: f32,
    /// Direction difference (degrees) at which credit reaches zero.
    pub angle_cutoff_deg: f32,
    /// Weight when exactly one side has an unknown type.
    pub unknown_type_weight: f32,
    /// Weight for a ridge ending paired with a bifurcation.
    pub type_mismatch_weight: f32,
    /// Largest rotation (degrees) an alignment hypothesis may imply.
    pub max_rotation_deg: f32,
}

impl Default for ComparatorParams {
    fn default() -> Self {
        Self {
            position_tolerance: 10.0,
            position_cutoff: 22.0,
            angle_tolerance_deg: 20.0,
            angle_cutoff_deg: 45.0,
            unknown_type_weight: 0.75,
            type_mismatch_weight: 0.5,
            max_rotation_deg: 90.0,
        }
    }
}

impl ComparatorParams {
    /// Checks that tolerances are finite and ordered and weights lie in [0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            self.position_tolerance,
            self.position_cutoff,
            self.angle_tolerance_deg,
            self.angle_cutoff_deg,
            self.unknown_type_weight,
            self.type_mismatch_weight,
            self.max_rotation_deg,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidParams {
                reason: "non-finite comparator parameter",
            });
        }
        if self.position_tolerance < 0.0 || self.position_cutoff <= self.position_tolerance {
            return Err(ConfigError::InvalidParams {
                reason: "position_cutoff must exceed position_tolerance >= 0",
            });
        }
        if self.angle_tolerance_deg < 0.0
            || self.angle_cutoff_deg <= self.angle_tolerance_deg
            || self.angle_cutoff_deg > 180.0
        {
            return Err(ConfigError::InvalidParams {
                reason: "angle_cutoff_deg must exceed angle_tolerance_deg >= 0 and be <= 180",
            });
        }
        if self.max_rotation_deg <= 0.0 || self.max_rotation_deg > 180.0 {
            return Err(ConfigError::InvalidParams {
                reason: "max_rotation_deg must lie in (0, 180]",
            });
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&self.unknown_type_weight) || !unit.contains(&self.type_mismatch_weight) {
            return Err(ConfigError::InvalidParams {
                reason: "type weights must lie in [0, 1]",
            });
        }
        Ok(())
    }

    /// Type compatibility weight; never negative and never zero for unknowns.
    pub fn type_weight(&self, a: MinutiaKind, b: MinutiaKind) -> f32 {
        if a == b {
            1.0
        } else if a == MinutiaKind::Unknown || b == MinutiaKind::Unknown {
            self.unknown_type_weight
        } else {
            self.type_mismatch_weight
        }
    }
}

/// Rigid transform: rotate about the origin, then translate.
///
/// Rotation is expressed in image coordinates (y grows downward), so a
/// positive angle turns points the same way it advances minutia directions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alignment {
    rotation_deg: f32,
    dx: f32,
    dy: f32,
    sin: f32,
    cos: f32,
}

/// A probe minutia mapped into candidate coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    pub angle_deg: f32,
}

impl Alignment {
    pub const IDENTITY: Self = Self {
        rotation_deg: 0.0,
        dx: 0.0,
        dy: 0.0,
        sin: 0.0,
        cos: 1.0,
    };

    pub fn new(rotation_deg: f32, dx: f32, dy: f32) -> Self {
        let rotation_deg = wrap_deg(rotation_deg);
        let (sin, cos) = sin_cos_deg(rotation_deg);
        Self {
            rotation_deg,
            dx,
            dy,
            sin,
            cos,
        }
    }

    /// The transform that carries `from` exactly onto `to`.
    pub fn between(from: &Minutia, to: &Minutia) -> Self {
        let rotation = units_to_deg(to.angle()) - units_to_deg(from.angle());
        let rotated = Self::new(rotation, 0.0, 0.0).project_point(from.x() as f32, from.y() as f32);
        Self::new(rotation, to.x() as f32 - rotated.0, to.y() as f32 - rotated.1)
    }

    pub fn rotation_deg(&self) -> f32 {
        self.rotation_deg
    }

    pub fn translation(&self) -> (f32, f32) {
        (self.dx, self.dy)
    }

    fn project_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.cos * x + self.sin * y + self.dx,
            -self.sin * x + self.cos * y + self.dy,
        )
    }

    pub fn project(&self, m: &Minutia) -> Projected {
        let (x, y) = self.project_point(m.x() as f32, m.y() as f32);
        Projected {
            x,
            y,
            angle_deg: units_to_deg(m.angle()) + self.rotation_deg,
        }
    }

    /// The transform mapping candidate coordinates back to the probe.
    pub fn inverse(&self) -> Self {
        let back = Self::new(-self.rotation_deg, 0.0, 0.0);
        let (tx, ty) = back.project_point(self.dx, self.dy);
        Self::new(-self.rotation_deg, -tx, -ty)
    }
}

/// Position/direction residual of a projected minutia against a target.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Residual {
    pub(crate) distance: f32,
    pub(crate) angle_diff_deg: f32,
}

impl Residual {
    pub(crate) fn of(p: &Projected, b: &Minutia) -> Self {
        let dx = p.x - b.x() as f32;
        let dy = p.y - b.y() as f32;
        Self {
            distance: (dx * dx + dy * dy).sqrt(),
            angle_diff_deg: circular_diff_deg(p.angle_deg, units_to_deg(b.angle())),
        }
    }

    /// Inside both full-credit tolerances.
    pub(crate) fn within_tolerance(&self, params: &ComparatorParams) -> bool {
        self.distance <= params.position_tolerance
            && self.angle_diff_deg <= params.angle_tolerance_deg
    }
}

/// Scores an already projected probe minutia against a candidate minutia.
pub(crate) fn score_projected(
    p: &Projected,
    kind: MinutiaKind,
    b: &Minutia,
    params: &ComparatorParams,
) -> (f32, Residual) {
    let residual = Residual::of(p, b);
    if residual.distance >= params.position_cutoff
        || residual.angle_diff_deg >= params.angle_cutoff_deg
    {
        return (0.0, residual);
    }
    let position = linear_falloff(
        residual.distance,
        params.position_tolerance,
        params.position_cutoff,
    );
    let direction = linear_falloff(
        residual.angle_diff_deg,
        params.angle_tolerance_deg,
        params.angle_cutoff_deg,
    );
    let score = position * direction * params.type_weight(kind, b.kind());
    (score.clamp(0.0, 1.0), residual)
}

/// Correspondence of `a` (after alignment) with `b`, in `[0, 1]`.
pub fn correspondence(
    a: &Minutia,
    b: &Minutia,
    alignment: &Alignment,
    params: &ComparatorParams,
) -> f32 {
    let projected = alignment.project(a);
    score_projected(&projected, a.kind(), b, params).0
}
