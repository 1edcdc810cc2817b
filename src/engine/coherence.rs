//! Phase coherence: delta-vector spread to a 0-100 confidence score.

use crate::domain::PhaseDelta;

/// Default decay constant for the coherence curve.
pub const DEFAULT_KAPPA: f64 = 20.0;

/// Raw coherence of a delta vector: `100 / (1 + kappa * sigma)`.
///
/// Sigma is the population standard deviation of the components, so the
/// result is in (0, 100], hits 100 exactly when all components are
/// equal, and strictly decreases as the spread grows. The denominator
/// is at least 1, so the division is always safe for finite input.
pub fn raw_coherence(delta: &PhaseDelta, kappa: f64) -> f64 {
    100.0 / (1.0 + kappa * delta.std_dev())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_equal_components_give_full_coherence() {
        let d = PhaseDelta([0.37; 5]);
        assert_eq!(raw_coherence(&d, DEFAULT_KAPPA), 100.0);
    }

    #[test]
    fn test_bounds_hold_for_random_vectors() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let mut v = [0.0; 5];
            for c in v.iter_mut() {
                *c = rng.gen_range(-10.0..10.0);
            }
            let c = raw_coherence(&PhaseDelta(v), DEFAULT_KAPPA);
            assert!(c > 0.0 && c <= 100.0, "coherence out of range: {c}");
        }
    }

    #[test]
    fn test_non_increasing_in_spread() {
        // widen the same base vector step by step; coherence must not rise
        let mut rng = StdRng::seed_from_u64(11);
        let mut base = [0.0; 5];
        for c in base.iter_mut() {
            *c = rng.gen_range(-1.0..1.0);
        }

        let mut prev = f64::INFINITY;
        for scale in [0.0, 0.5, 1.0, 2.0, 5.0, 20.0] {
            let mut v = base;
            for c in v.iter_mut() {
                *c *= scale;
            }
            let c = raw_coherence(&PhaseDelta(v), DEFAULT_KAPPA);
            assert!(c <= prev + 1e-12, "coherence rose with spread");
            prev = c;
        }
    }

    #[test]
    fn test_known_value() {
        // sigma([0,0,0,0,5]) = 2 -> 100 / (1 + 20*2) = 100/41
        let d = PhaseDelta([0.0, 0.0, 0.0, 0.0, 5.0]);
        assert!((raw_coherence(&d, 20.0) - 100.0 / 41.0).abs() < 1e-9);
    }
}
