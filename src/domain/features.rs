//! Typed schema for the per-asset dual-agent feature snapshots.
//!
//! Each tracked asset has two `AgentFeatureSet` records per cycle: the
//! bullish view and the bearish view. Field defaults and clamping live
//! here, at the boundary, so the engine itself never performs presence
//! checks or NaN guards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dimension of the phase ("mood") vector.
pub const PHASE_DIM: usize = 5;

/// Directional stance of one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Bull,
    Bear,
    Neutral,
}

/// A bare "+"/"-" sign, used for indicator slopes and leader direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

/// MACD line sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacdSign {
    Pos,
    Neg,
}

/// EMA cross state (fast EMA relative to slow EMA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaCross {
    FastAboveSlow,
    FastBelowSlow,
}

/// Indicator fields for a single timeframe
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeframeIndicators {
    /// RSI value (0-100)
    pub rsi: f64,
    /// RSI slope sign
    pub rsi_slope: Sign,
    /// MACD line sign
    pub macd: MacdSign,
    /// MACD histogram slope sign
    pub macd_hist_slope: Sign,
    /// EMA cross state
    pub ema_cross: EmaCross,
    /// EMA slope sign
    pub ema_slope: Sign,
}

impl TimeframeIndicators {
    /// Neutral indicator set: flat RSI, no directional conviction.
    pub fn neutral() -> Self {
        Self {
            rsi: 50.0,
            rsi_slope: Sign::Plus,
            macd: MacdSign::Pos,
            macd_hist_slope: Sign::Plus,
            ema_cross: EmaCross::FastAboveSlow,
            ema_slope: Sign::Plus,
        }
    }
}

/// Per-timeframe indicator block (H4 and H1)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Indicators {
    pub h4: TimeframeIndicators,
    pub h1: TimeframeIndicators,
}

/// Per-timeframe directional stance (H4 and H1)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TfAlignment {
    pub h4: Stance,
    pub h1: Stance,
}

/// Open-interest direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OiDirection {
    Up,
    Down,
    Flat,
}

/// Liquidation skew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiqSkew {
    Short,
    Long,
    Flat,
}

/// Order-flow snapshot: open interest and liquidation skew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flows {
    pub oi: OiDirection,
    pub liq_skew: LiqSkew,
}

impl Default for Flows {
    fn default() -> Self {
        Self {
            oi: OiDirection::Flat,
            liq_skew: LiqSkew::Flat,
        }
    }
}

/// Market breadth label attached to the leader board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breadth {
    RiskOn,
    RiskOff,
    Mixed,
}

/// Correlated leader assets: per-symbol direction plus breadth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaders {
    /// Direction per related asset symbol (BTreeMap for stable iteration)
    #[serde(default)]
    pub signs: BTreeMap<String, Sign>,
    pub breadth: Breadth,
}

impl Default for Leaders {
    fn default() -> Self {
        Self {
            signs: BTreeMap::new(),
            breadth: Breadth::Mixed,
        }
    }
}

impl Leaders {
    /// True if any correlated leader is pointing up.
    pub fn any_positive(&self) -> bool {
        self.signs.values().any(|s| *s == Sign::Plus)
    }
}

/// One agent's feature snapshot for one asset (bull or bear side).
///
/// Immutable for the duration of one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFeatureSet {
    /// Unit-free 5-dimensional "mood" vector
    pub phase_vector: [f64; PHASE_DIM],
    /// Per-timeframe stance
    pub tf_alignment: TfAlignment,
    /// Per-timeframe indicator fields
    pub indicators: Indicators,
    /// Current-hour volume over trailing 20-period average (1.0 = normal)
    pub volume_ratio: f64,
    /// Correlated leader assets
    #[serde(default)]
    pub leaders: Leaders,
    /// Order-flow snapshot
    #[serde(default)]
    pub flows: Flows,
    /// Sentiment index, soft-clamped to [-3, 3]
    #[serde(default)]
    pub sentiment_index: f64,
}

impl AgentFeatureSet {
    /// Clamp non-finite or out-of-range numeric fields to neutral values.
    ///
    /// Gate comparisons downstream assume finite inputs; this is the one
    /// place that enforces it.
    pub fn sanitized(mut self) -> Self {
        for c in self.phase_vector.iter_mut() {
            if !c.is_finite() {
                *c = 0.0;
            }
        }
        if !self.volume_ratio.is_finite() {
            self.volume_ratio = 1.0;
        } else if self.volume_ratio < 0.0 {
            self.volume_ratio = 0.0;
        }
        if !self.sentiment_index.is_finite() {
            self.sentiment_index = 0.0;
        } else {
            self.sentiment_index = self.sentiment_index.clamp(-3.0, 3.0);
        }
        for tf in [&mut self.indicators.h4, &mut self.indicators.h1] {
            if !tf.rsi.is_finite() {
                tf.rsi = 50.0;
            } else {
                tf.rsi = tf.rsi.clamp(0.0, 100.0);
            }
        }
        self
    }
}

/// Bull/bear snapshot pair for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPair {
    pub bull: AgentFeatureSet,
    pub bear: AgentFeatureSet,
}

impl AgentPair {
    /// Delta vector: bull phase vector minus bear phase vector.
    pub fn delta(&self) -> PhaseDelta {
        let mut d = [0.0; PHASE_DIM];
        for i in 0..PHASE_DIM {
            d[i] = self.bull.phase_vector[i] - self.bear.phase_vector[i];
        }
        PhaseDelta(d)
    }
}

/// Bull-minus-bear phase vector; a proxy for disagreement/conviction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseDelta(pub [f64; PHASE_DIM]);

impl PhaseDelta {
    pub fn zero() -> Self {
        Self([0.0; PHASE_DIM])
    }

    /// Population standard deviation of the components.
    pub fn std_dev(&self) -> f64 {
        let n = PHASE_DIM as f64;
        let mean = self.0.iter().sum::<f64>() / n;
        let var = self.0.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        var.sqrt()
    }

    /// Euclidean magnitude.
    pub fn magnitude(&self) -> f64 {
        self.0.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &PhaseDelta) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Elementwise mean of a set of deltas; zero vector when empty.
    pub fn mean_of(deltas: &[PhaseDelta]) -> PhaseDelta {
        if deltas.is_empty() {
            return PhaseDelta::zero();
        }
        let mut acc = [0.0; PHASE_DIM];
        for d in deltas {
            for i in 0..PHASE_DIM {
                acc[i] += d.0[i];
            }
        }
        let n = deltas.len() as f64;
        for c in acc.iter_mut() {
            *c /= n;
        }
        PhaseDelta(acc)
    }
}

impl fmt::Display for PhaseDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}, {:.4}, {:.4}]",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4]
        )
    }
}

/// All tracked assets' bull/bear pairs for one cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasketSnapshot {
    pairs: BTreeMap<String, AgentPair>,
}

impl BasketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: impl Into<String>, pair: AgentPair) {
        self.pairs.insert(asset.into(), pair);
    }

    pub fn pair(&self, asset: &str) -> Option<&AgentPair> {
        self.pairs.get(asset)
    }

    pub fn pair_mut(&mut self, asset: &str) -> Option<&mut AgentPair> {
        self.pairs.get_mut(asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.pairs.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Global reference vector: elementwise mean of every *other* asset's
    /// delta vector. Zero vector when the target has no peers.
    pub fn peers_mean(&self, target: &str) -> PhaseDelta {
        let deltas: Vec<PhaseDelta> = self
            .pairs
            .iter()
            .filter(|(asset, _)| asset.as_str() != target)
            .map(|(_, pair)| pair.delta())
            .collect();
        PhaseDelta::mean_of(&deltas)
    }
}
