//! Decision and gate-audit records.
//!
//! A `Decision` is created fresh each invocation, never mutated after
//! creation, and written once to the audit log. The per-gate audit
//! trail (`GateResult`) is a first-class part of the record, not
//! incidental bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "WATCH")]
    Watch,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Watch => "WATCH",
        }
    }

    pub fn is_watch(&self) -> bool {
        matches!(self, Signal::Watch)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which decision tier produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Primary tier passed with full confidence
    Strong,
    /// Secondary relaxed tier rescued a reduced-size signal
    Lite,
    /// No tier passed (or fastgate short-circuit)
    Baseline,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Strong => "strong",
            Mode::Lite => "lite",
            Mode::Baseline => "baseline",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sizing recommendation band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeBand {
    Full,
    Half,
    Watch,
}

impl SizeBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeBand::Full => "Full",
            SizeBand::Half => "Half",
            SizeBand::Watch => "Watch",
        }
    }
}

impl fmt::Display for SizeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Volume regime label (quieter markets demand higher confidence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Active,
    Quiet,
}

/// Named checks evaluated by the decision tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateName {
    Ceff,
    Phase,
    Volume,
    Coh,
    Tf,
    Herald,
    TrapVeto,
    StarveGuard,
}

impl GateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateName::Ceff => "ceff",
            GateName::Phase => "phase",
            GateName::Volume => "volume",
            GateName::Coh => "coh",
            GateName::Tf => "tf",
            GateName::Herald => "herald",
            GateName::TrapVeto => "trap_veto",
            GateName::StarveGuard => "starve_guard",
        }
    }

    /// Tie-break order when reporting the single hard gate reason.
    pub const HARD_GATE_PRIORITY: [GateName; 6] = [
        GateName::Phase,
        GateName::Ceff,
        GateName::Volume,
        GateName::Tf,
        GateName::Coh,
        GateName::Herald,
    ];
}

impl fmt::Display for GateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One evaluated check: pass/fail plus the value and threshold used.
///
/// Boolean checks (tf, herald, starve guard) record actual as 0.0/1.0
/// against a threshold of 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GateResult {
    pub name: GateName,
    pub passed: bool,
    pub actual: f64,
    pub threshold: f64,
}

impl GateResult {
    pub fn numeric(name: GateName, passed: bool, actual: f64, threshold: f64) -> Self {
        Self {
            name,
            passed,
            actual,
            threshold,
        }
    }

    pub fn boolean(name: GateName, passed: bool) -> Self {
        Self {
            name,
            passed,
            actual: if passed { 1.0 } else { 0.0 },
            threshold: 1.0,
        }
    }
}

/// Gate multipliers applied onto the aligned coherence
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GateMultipliers {
    pub volume: f64,
    pub tf: f64,
    pub sentiment: f64,
    pub flow: f64,
    pub tech: f64,
}

impl GateMultipliers {
    pub fn product(&self) -> f64 {
        self.volume * self.tf * self.sentiment * self.flow * self.tech
    }
}

/// Technical-bias summary carried in the audit record
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TechSummary {
    /// +1 both timeframes bull, -1 both bear, 0 mixed
    pub sign: i8,
    /// Timeframe agreement in [0, 1]
    pub coh: f64,
    /// Mean per-timeframe score
    pub s_dir: f64,
}

/// Which admission path produced the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateNote {
    StrongFull,
    WatchChecks,
    LiteDefault,
    LiteRescue,
    WatchFastgate,
}

impl GateNote {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateNote::StrongFull => "strong_full",
            GateNote::WatchChecks => "watch_checks",
            GateNote::LiteDefault => "lite_default",
            GateNote::LiteRescue => "lite_rescue",
            GateNote::WatchFastgate => "watch_fastgate",
        }
    }
}

/// One engine invocation's full, auditable outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique trace id for downstream joins
    pub trace_id: String,
    pub timestamp_utc: DateTime<Utc>,
    pub asset: String,
    /// Experiment lane label for A/B analytics
    pub experiment: String,

    pub signal: Signal,
    pub mode: Mode,
    pub size_band: SizeBand,

    /// Raw coherence from the delta vector
    pub c_raw: f64,
    /// Alignment-adjusted coherence
    pub c_loc: f64,
    /// Fully gated effective coherence
    pub c_eff: f64,
    /// Angle between target delta and the global reference vector
    pub phase_angle_deg: f64,
    pub volume_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub regime: Regime,
    pub kappa: f64,

    /// Heuristic false-breakout probability from the volume regime
    pub trap_probability: f64,
    pub leaders_ok: bool,
    pub flows_ok: bool,
    pub herald_ok: bool,

    /// Absent when the fastgate short-circuits before the tech pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech: Option<TechSummary>,
    /// Absent when the fastgate short-circuits before the gate battery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_multipliers: Option<GateMultipliers>,

    /// Strong-tier checks in evaluation order
    pub strong_checks: Vec<GateResult>,
    /// Lite-tier checks, present only when the lite tier was evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lite_checks: Option<Vec<GateResult>>,

    /// Failing strong-tier gate names (populated on WATCH only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_checks: Vec<GateName>,
    /// First failing gate in priority order (populated on WATCH only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_gate_reason: Option<GateName>,
    /// Short-circuit reason (fastgate only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub gate_note: GateNote,

    /// Volume, trap, herald and tf preconditions all green
    pub conditions_ready: bool,
    /// Starvation counter value read at the start of the invocation
    pub starve_cnt: u32,
    pub lite_guard_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_serde_uses_upper_case() {
        assert_eq!(serde_json::to_string(&Signal::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Signal::Watch).unwrap(), "\"WATCH\"");
        let s: Signal = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(s, Signal::Sell);
    }

    #[test]
    fn test_gate_name_wire_names() {
        assert_eq!(serde_json::to_string(&GateName::TrapVeto).unwrap(), "\"trap_veto\"");
        assert_eq!(GateName::Ceff.as_str(), "ceff");
        assert_eq!(GateName::StarveGuard.as_str(), "starve_guard");
    }

    #[test]
    fn test_boolean_gate_result_encoding() {
        let g = GateResult::boolean(GateName::Herald, false);
        assert_eq!(g.actual, 0.0);
        assert_eq!(g.threshold, 1.0);
        assert!(!g.passed);
    }

    #[test]
    fn test_gate_multiplier_product() {
        let g = GateMultipliers {
            volume: 0.92,
            tf: 1.0,
            sentiment: 1.0,
            flow: 1.05,
            tech: 0.95,
        };
        assert!((g.product() - 0.92 * 1.05 * 0.95).abs() < 1e-12);
    }
}
