//! Independent multiplicative gates over the aligned coherence.

use crate::domain::{Flows, GateMultipliers, LiqSkew, OiDirection};

/// Volume participation gate. Monotonic step function rewarding higher
/// participation.
pub fn volume_gate(ratio: f64) -> f64 {
    if ratio >= 1.30 {
        1.00
    } else if ratio >= 1.15 {
        0.98
    } else if ratio >= 1.00 {
        0.92
    } else {
        0.85
    }
}

/// Timeframe gate: a mixed signal halves confidence.
pub fn timeframe_gate(tech_sign: i8) -> f64 {
    if tech_sign != 0 {
        1.00
    } else {
        0.50
    }
}

/// Sentiment-conflict gate: strong sentiment opposing the technical
/// bias docks the multiplier, floored at 0.50.
pub fn sentiment_conflict_gate(sentiment_index: f64, tech_sign: i8, threshold: f64, mult: f64) -> f64 {
    let si = if sentiment_index.is_finite() {
        sentiment_index.clamp(-3.0, 3.0)
    } else {
        0.0
    };
    let conflict = (si > 0.0 && tech_sign < 0) || (si < 0.0 && tech_sign > 0);
    if si.abs() >= threshold && conflict {
        (1.0 - mult).max(0.50)
    } else {
        1.00
    }
}

/// Order-flow gate: rising open interest against short liquidations is
/// a squeeze setup and earns a boost; falling OI with long liquidations
/// is docked, floored at 0.80.
pub fn flow_gate(flows: &Flows, up_short_mult: f64, down_long_mult: f64) -> f64 {
    match (flows.oi, flows.liq_skew) {
        (OiDirection::Up, LiqSkew::Short) => 1.0 + up_short_mult,
        (OiDirection::Down, LiqSkew::Long) => (1.0 - down_long_mult).max(0.80),
        _ => 1.00,
    }
}

/// Effective coherence: every gate multiplies onto the aligned score.
pub fn effective_coherence(c_loc: f64, gates: &GateMultipliers) -> f64 {
    c_loc * gates.product()
}
