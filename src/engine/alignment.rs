//! Cross-asset alignment: angle between the target's delta vector and
//! the basket reference vector, mapped to a coherence multiplier.

use crate::domain::PhaseDelta;

/// Alignment of the target delta against the global reference vector
#[derive(Debug, Clone, Copy)]
pub struct Alignment {
    /// Angular deviation in degrees, [0, 180]
    pub angle_deg: f64,
    /// Multiplier applied to the raw coherence
    pub multiplier: f64,
    /// Human-readable lane label for the run summary
    pub note: &'static str,
}

/// Angle in degrees between two phase deltas.
///
/// A zero-magnitude vector has no direction; by convention the angle is
/// then 0 (treated as perfectly aligned), which also covers the
/// no-peers case where the global vector is all zeros.
pub fn phase_angle_deg(a: &PhaseDelta, b: &PhaseDelta) -> f64 {
    let (na, nb) = (a.magnitude(), b.magnitude());
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let cos = (a.dot(b) / (na * nb)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Multiplier policy, non-overlapping and angle-ordered.
///
/// Rewards directional agreement with the basket without over-rewarding
/// trivial near-zero-angle alignment; penalizes outright divergence.
pub fn alignment_multiplier(angle_deg: f64) -> (f64, &'static str) {
    if angle_deg <= 10.0 {
        (1.00, "tight alignment (no boost)")
    } else if angle_deg <= 35.0 {
        (1.15, "sweet lane +15%")
    } else if angle_deg <= 45.0 {
        (1.00, "loose alignment (no change)")
    } else {
        (0.70, "divergence -30%")
    }
}

/// Compute the alignment of `delta` against `global`.
pub fn align(delta: &PhaseDelta, global: &PhaseDelta) -> Alignment {
    let angle_deg = phase_angle_deg(delta, global);
    let (multiplier, note) = alignment_multiplier(angle_deg);
    Alignment {
        angle_deg,
        multiplier,
        note,
    }
}
