//! False-breakout (trap) heuristic and the herald corroboration signal.

use crate::domain::{AgentFeatureSet, LiqSkew, OiDirection};

/// Heuristic false-breakout probability from the volume regime. Low
/// participation means a move is more likely to be a trap.
pub fn trap_probability(volume_ratio: f64) -> f64 {
    if volume_ratio >= 1.30 {
        0.10
    } else if volume_ratio >= 1.15 {
        0.20
    } else if volume_ratio >= 1.05 {
        0.30
    } else if volume_ratio >= 0.95 {
        0.50
    } else {
        0.70
    }
}

/// Corroboration from correlated leaders and order flow
#[derive(Debug, Clone, Copy)]
pub struct Herald {
    /// Any correlated leader asset pointing up
    pub leaders_ok: bool,
    /// Rising open interest with short liquidation skew (squeeze setup)
    pub flows_ok: bool,
}

impl Herald {
    pub fn ok(&self) -> bool {
        self.leaders_ok || self.flows_ok
    }
}

/// Evaluate the herald signal for one feature snapshot.
pub fn herald(features: &AgentFeatureSet) -> Herald {
    Herald {
        leaders_ok: features.leaders.any_positive(),
        flows_ok: features.flows.oi == OiDirection::Up && features.flows.liq_skew == LiqSkew::Short,
    }
}

/// The veto blocks a signal regardless of other gates: trap probability
/// above the cutoff with no corroboration.
pub fn trap_veto(trap_probability: f64, cutoff: f64, herald_ok: bool) -> bool {
    trap_probability > cutoff && !herald_ok
}
