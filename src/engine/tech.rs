//! Technical bias: per-timeframe indicator fields to a directional sign
//! and a coherence-weighted gate multiplier.

use crate::domain::{AgentFeatureSet, EmaCross, Sign, Stance, TimeframeIndicators};

/// Technical-bias breakdown for one feature snapshot
#[derive(Debug, Clone, Copy)]
pub struct TechBias {
    pub s_h4: f64,
    pub s_h1: f64,
    /// Timeframe agreement, 1.0 = H4 and H1 fully agree
    pub coh: f64,
    /// Mean per-timeframe score
    pub s_dir: f64,
    /// Gate multiplier in [0.85, 1.00]
    pub gate: f64,
    /// +1 both timeframes bull, -1 both bear, 0 otherwise
    pub sign: i8,
}

fn timeframe_score(tf: &TimeframeIndicators) -> f64 {
    let trend = match tf.ema_cross {
        EmaCross::FastAboveSlow => 0.7,
        EmaCross::FastBelowSlow => -0.7,
    };
    let momentum = match tf.macd_hist_slope {
        Sign::Plus => 1.0,
        Sign::Minus => -1.0,
    };
    let rsi_norm = ((tf.rsi - 50.0) / 25.0).clamp(-1.0, 1.0);
    (trend + momentum + rsi_norm) / 3.0
}

/// Directional bias sign from the timeframe stances. Mixed or neutral
/// stances carry no directional conviction.
pub fn bias_sign(features: &AgentFeatureSet) -> i8 {
    match (features.tf_alignment.h4, features.tf_alignment.h1) {
        (Stance::Bull, Stance::Bull) => 1,
        (Stance::Bear, Stance::Bear) => -1,
        _ => 0,
    }
}

/// Full technical-bias computation over the H4/H1 indicator fields.
pub fn technical_bias(features: &AgentFeatureSet) -> TechBias {
    let s_h4 = timeframe_score(&features.indicators.h4);
    let s_h1 = timeframe_score(&features.indicators.h1);
    let coh = (1.0 - (s_h4 - s_h1).abs()).max(0.0);
    let s_dir = (s_h4 + s_h1) / 2.0;
    let gate = 0.85 + 0.15 * s_dir.abs() * coh;

    TechBias {
        s_h4,
        s_h1,
        coh,
        s_dir,
        gate,
        sign: bias_sign(features),
    }
}
