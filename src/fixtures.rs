//! Deterministic feature-set fixtures.
//!
//! This is an explicit test seam. The engine itself never fabricates
//! data; when an upstream snapshot is absent the *caller* substitutes
//! one of these clearly-labeled records (and logs that it did so).

use crate::domain::{
    AgentFeatureSet, AgentPair, Breadth, EmaCross, Flows, Indicators, Leaders, LiqSkew, MacdSign,
    OiDirection, Sign, Stance, TfAlignment, TimeframeIndicators, PHASE_DIM,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Neutral bull/bear pair: mirrored templates with no directional
/// conviction. Both timeframe stances are neutral, so the tf gate can
/// never admit a signal built from this pair.
pub fn neutral_pair() -> AgentPair {
    let template = AgentFeatureSet {
        phase_vector: [1.0; PHASE_DIM],
        tf_alignment: TfAlignment {
            h4: Stance::Neutral,
            h1: Stance::Neutral,
        },
        indicators: Indicators {
            h4: TimeframeIndicators::neutral(),
            h1: TimeframeIndicators::neutral(),
        },
        volume_ratio: 1.0,
        leaders: Leaders::default(),
        flows: Flows::default(),
        sentiment_index: 0.0,
    };
    AgentPair {
        bull: template.clone(),
        bear: template,
    }
}

fn jittered_vector(rng: &mut StdRng, bias: f64) -> [f64; PHASE_DIM] {
    let mut v = [0.0; PHASE_DIM];
    for c in v.iter_mut() {
        // small spread around the bias keeps the raw coherence mid-range
        *c = bias + rng.gen_range(-0.05..0.05);
    }
    v
}

fn directional_view(rng: &mut StdRng, bull: bool) -> AgentFeatureSet {
    let stance = if bull { Stance::Bull } else { Stance::Bear };
    let sign = if bull { Sign::Plus } else { Sign::Minus };
    let tf = |rsi: f64| TimeframeIndicators {
        rsi,
        rsi_slope: sign,
        macd: if bull { MacdSign::Pos } else { MacdSign::Neg },
        macd_hist_slope: sign,
        ema_cross: if bull {
            EmaCross::FastAboveSlow
        } else {
            EmaCross::FastBelowSlow
        },
        ema_slope: sign,
    };

    let mut signs = BTreeMap::new();
    signs.insert("ETH".to_string(), sign);
    signs.insert("SOL".to_string(), sign);

    AgentFeatureSet {
        phase_vector: jittered_vector(rng, if bull { 1.04 } else { 0.96 }),
        tf_alignment: TfAlignment {
            h4: stance,
            h1: stance,
        },
        indicators: Indicators {
            h4: tf(if bull { 62.0 } else { 42.0 }),
            h1: tf(if bull { 60.0 } else { 45.0 }),
        },
        volume_ratio: if bull { 1.05 } else { 0.95 },
        leaders: Leaders {
            signs,
            breadth: if bull {
                Breadth::RiskOn
            } else {
                Breadth::RiskOff
            },
        },
        flows: Flows {
            oi: if bull {
                OiDirection::Up
            } else {
                OiDirection::Down
            },
            liq_skew: if bull { LiqSkew::Short } else { LiqSkew::Long },
        },
        sentiment_index: if bull { 1.0 } else { -1.0 },
    }
}

/// Seeded bull/bear pair with mildly jittered phase vectors. Same seed,
/// same pair.
pub fn seeded_pair(seed: u64) -> AgentPair {
    let mut rng = StdRng::seed_from_u64(seed);
    AgentPair {
        bull: directional_view(&mut rng, true),
        bear: directional_view(&mut rng, false),
    }
}
