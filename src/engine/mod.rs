//! Decision engine: two-tier gating state machine.
//!
//! Pipeline for one invocation:
//! delta vector → raw coherence → global alignment → gate battery →
//! effective coherence → trap veto → Strong check → LITE rescue →
//! Decision (+ successor engine state).
//!
//! The engine is pure arithmetic over already-loaded inputs: no I/O, no
//! randomness, fully deterministic for fixed inputs and configuration.

pub mod alignment;
pub mod coherence;
pub mod gates;
pub mod regime;
pub mod tech;
pub mod trap;

pub use alignment::{align, Alignment};
pub use coherence::{raw_coherence, DEFAULT_KAPPA};
pub use regime::{load_decile, AngleWindow, RegimeDecile};
pub use tech::{technical_bias, TechBias};
pub use trap::{herald, trap_probability, trap_veto, Herald};

use crate::config::EngineConfig;
use crate::domain::{
    BasketSnapshot, Decision, EngineState, GateMultipliers, GateName, GateNote, GateResult, Mode,
    Regime, Signal, SizeBand, TechSummary,
};
use crate::error::{PhasegateError, Result};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Below this volume ratio the engine short-circuits to WATCH without
/// running the gate battery.
pub const FASTGATE_VOLUME_MIN: f64 = 0.80;

/// Reason string attached to fastgate decisions.
pub const REASON_VOLUME_LOW_FASTGATE: &str = "volume_low_fastgate";

/// Floor for the Half size band threshold.
const SIZE_HALF_FLOOR: f64 = 32.0;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Size band from effective coherence against the full-entry threshold.
fn size_band_from_ceff(c_eff: f64, threshold_full: f64) -> SizeBand {
    if c_eff >= threshold_full {
        SizeBand::Full
    } else if c_eff >= (threshold_full - 20.0).max(SIZE_HALF_FLOOR) {
        SizeBand::Half
    } else {
        SizeBand::Watch
    }
}

/// Result of one engine invocation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub decision: Decision,
    /// Successor state the caller must persist before the next cycle
    pub next_state: EngineState,
}

/// The decision engine. Holds thresholds only; all per-cycle inputs are
/// passed into `evaluate`.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: EngineConfig,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one decision cycle for `target` over the basket snapshot.
    ///
    /// `state` is the persisted engine state read before the call; the
    /// returned `next_state` must be stored after it. The engine never
    /// falls over on odd numeric input — the snapshot is expected to be
    /// sanitized at the boundary, and every outcome resolves to a
    /// Decision.
    pub fn evaluate(
        &self,
        snapshot: &BasketSnapshot,
        target: &str,
        decile: Option<RegimeDecile>,
        state: EngineState,
        price: Option<f64>,
    ) -> Result<Evaluation> {
        let cfg = &self.config;
        let pair = snapshot.pair(target).ok_or_else(|| {
            PhasegateError::FeatureSetUnavailable(format!(
                "no bull/bear pair loaded for {target}"
            ))
        })?;
        // Market-context fields (volume, leaders, flows, sentiment,
        // indicators) are read from the bull view; the bear view
        // contributes through the delta vector.
        let primary = &pair.bull;
        let volume_ratio = primary.volume_ratio;

        let delta = pair.delta();
        let c_raw = coherence::raw_coherence(&delta, cfg.kappa);
        let global = snapshot.peers_mean(target);
        let alignment = alignment::align(&delta, &global);
        let angle = alignment.angle_deg;
        let c_loc = c_raw * alignment.multiplier;

        let herald = trap::herald(primary);
        let trap_t = trap::trap_probability(volume_ratio);
        let regime_label = if volume_ratio >= 1.0 {
            Regime::Active
        } else {
            Regime::Quiet
        };
        let lite_guard_ok = cfg
            .lite_starve_cycles
            .map_or(true, |n| state.starve_cnt >= n);

        let trace_id = Uuid::new_v4().simple().to_string();
        let timestamp_utc = Utc::now();
        let experiment = cfg.experiment().to_string();

        // Fastgate: clearly illiquid conditions go straight to WATCH.
        if volume_ratio < FASTGATE_VOLUME_MIN {
            info!(
                "{experiment} | fastgate volume_low | vol={volume_ratio:.3} < {FASTGATE_VOLUME_MIN:.2}"
            );
            let decision = Decision {
                trace_id,
                timestamp_utc,
                asset: target.to_string(),
                experiment,
                signal: Signal::Watch,
                mode: Mode::Baseline,
                size_band: SizeBand::Watch,
                c_raw: round3(c_raw),
                c_loc: round3(c_loc),
                c_eff: round3(c_loc),
                phase_angle_deg: round2(angle),
                volume_ratio: round3(volume_ratio),
                price,
                regime: regime_label,
                kappa: cfg.kappa,
                trap_probability: round3(trap_t),
                leaders_ok: herald.leaders_ok,
                flows_ok: herald.flows_ok,
                herald_ok: herald.ok(),
                tech: None,
                gate_multipliers: None,
                strong_checks: vec![GateResult::numeric(
                    GateName::Volume,
                    false,
                    round3(volume_ratio),
                    FASTGATE_VOLUME_MIN,
                )],
                lite_checks: None,
                failed_checks: vec![GateName::Volume],
                hard_gate_reason: Some(GateName::Volume),
                reason: Some(REASON_VOLUME_LOW_FASTGATE.to_string()),
                gate_note: GateNote::WatchFastgate,
                conditions_ready: false,
                starve_cnt: state.starve_cnt,
                lite_guard_ok,
            };
            return Ok(Evaluation {
                next_state: state.after(Signal::Watch),
                decision,
            });
        }

        // Gate battery
        let tech = tech::technical_bias(primary);
        let tf_ok = tech.sign != 0;
        let multipliers = GateMultipliers {
            volume: gates::volume_gate(volume_ratio),
            tf: gates::timeframe_gate(tech.sign),
            sentiment: gates::sentiment_conflict_gate(
                primary.sentiment_index,
                tech.sign,
                cfg.si_conflict_threshold,
                cfg.si_conflict_mult,
            ),
            flow: gates::flow_gate(
                &primary.flows,
                cfg.flows_up_short_mult,
                cfg.flows_down_long_mult,
            ),
            tech: tech.gate,
        };
        let c_eff = gates::effective_coherence(c_loc, &multipliers);

        // Quieter markets demand higher confidence.
        let threshold_full = if volume_ratio < 1.0 {
            cfg.strong_ceff_enter_quiet
        } else {
            cfg.strong_ceff_enter_active
        };
        let strong_window = AngleWindow {
            min_deg: cfg.strong_angle_min,
            max_deg: cfg.strong_angle_max,
        }
        .adjusted_for(decile);

        let vetoed = trap::trap_veto(trap_t, cfg.trap_cutoff, herald.ok());

        // Strong tier
        let mut strong_checks = vec![
            GateResult::numeric(GateName::Ceff, c_eff >= threshold_full, c_eff, threshold_full),
            GateResult::numeric(
                GateName::Phase,
                angle <= strong_window.max_deg,
                angle,
                strong_window.max_deg,
            ),
            GateResult::numeric(
                GateName::Volume,
                volume_ratio >= cfg.vol_enter,
                volume_ratio,
                cfg.vol_enter,
            ),
            GateResult::numeric(GateName::Coh, tech.coh > cfg.coh_enter, tech.coh, cfg.coh_enter),
            GateResult::boolean(GateName::Tf, tf_ok),
            GateResult::boolean(GateName::Herald, herald.ok()),
        ];
        if vetoed {
            strong_checks.push(GateResult::numeric(
                GateName::TrapVeto,
                false,
                trap_t,
                cfg.trap_cutoff,
            ));
        }
        let strong_ok = strong_checks.iter().all(|c| c.passed);

        let directional = if tech.sign >= 0 {
            Signal::Buy
        } else {
            Signal::Sell
        };

        let (mut signal, mut mode, mut gate_note) = if strong_ok {
            (directional, Mode::Strong, GateNote::StrongFull)
        } else {
            (Signal::Watch, Mode::Baseline, GateNote::WatchChecks)
        };

        // LITE rescue tier
        let mut lite_checks = None;
        if !strong_ok && cfg.lite_enable {
            let lite_max = regime::lite_angle_max(cfg.lite_angle_max, decile);
            let vol_rescue = volume_ratio >= cfg.lite_rescue_min_vol && herald.ok() && tf_ok;
            let vol_ok = volume_ratio >= cfg.lite_vol_enter || vol_rescue;
            // The rescue path trades lower volume for a relaxed entry bar.
            let ceff_threshold = if volume_ratio >= cfg.lite_vol_enter {
                cfg.lite_ceff_enter
            } else {
                (cfg.lite_ceff_enter - 6.0).max(35.0)
            };

            let mut checks = vec![
                GateResult::numeric(GateName::Ceff, c_eff >= ceff_threshold, c_eff, ceff_threshold),
                GateResult::numeric(GateName::Phase, angle <= lite_max, angle, lite_max),
                GateResult::numeric(GateName::Volume, vol_ok, volume_ratio, cfg.lite_vol_enter),
                GateResult::numeric(
                    GateName::Coh,
                    tech.coh > cfg.lite_coh_enter,
                    tech.coh,
                    cfg.lite_coh_enter,
                ),
                GateResult::boolean(GateName::Tf, tf_ok),
                GateResult::boolean(GateName::Herald, herald.ok()),
            ];
            if let Some(min_cycles) = cfg.lite_starve_cycles {
                checks.push(GateResult::numeric(
                    GateName::StarveGuard,
                    lite_guard_ok,
                    state.starve_cnt as f64,
                    min_cycles as f64,
                ));
            }

            if !vetoed && checks.iter().all(|c| c.passed) {
                signal = directional;
                mode = Mode::Lite;
                gate_note = if vol_rescue {
                    GateNote::LiteRescue
                } else {
                    GateNote::LiteDefault
                };
            }
            lite_checks = Some(checks);
        }

        // LITE never sizes above Half.
        let size_band = if mode == Mode::Lite {
            SizeBand::Half
        } else {
            size_band_from_ceff(c_eff, threshold_full)
        };

        let (failed_checks, hard_gate_reason) = if signal.is_watch() {
            let failed: Vec<GateName> = strong_checks
                .iter()
                .filter(|c| !c.passed)
                .map(|c| c.name)
                .collect();
            let hard = if vetoed {
                Some(GateName::TrapVeto)
            } else {
                GateName::HARD_GATE_PRIORITY
                    .iter()
                    .copied()
                    .find(|name| failed.contains(name))
            };
            (failed, hard)
        } else {
            (Vec::new(), None)
        };

        let conditions_ready =
            volume_ratio >= 1.0 && trap_t <= cfg.trap_cutoff && herald.ok() && tf_ok;

        info!(
            "{} | mode={} | vol={:.3} | angle={:.2} | Ceff={:.2} | gates(vol={:.2},tech={:.2},sent={:.2},flow={:.2}) | tf_ok={} herald={} | trap_T={:.2} | {} | {}",
            experiment,
            mode,
            volume_ratio,
            angle,
            c_eff,
            multipliers.volume,
            multipliers.tech,
            multipliers.sentiment,
            multipliers.flow,
            tf_ok,
            herald.ok(),
            trap_t,
            alignment.note,
            gate_note.as_str()
        );

        let decision = Decision {
            trace_id,
            timestamp_utc,
            asset: target.to_string(),
            experiment,
            signal,
            mode,
            size_band,
            c_raw: round3(c_raw),
            c_loc: round3(c_loc),
            c_eff: round3(c_eff),
            phase_angle_deg: round2(angle),
            volume_ratio: round3(volume_ratio),
            price,
            regime: regime_label,
            kappa: cfg.kappa,
            trap_probability: round3(trap_t),
            leaders_ok: herald.leaders_ok,
            flows_ok: herald.flows_ok,
            herald_ok: herald.ok(),
            tech: Some(TechSummary {
                sign: tech.sign,
                coh: round3(tech.coh),
                s_dir: round3(tech.s_dir),
            }),
            gate_multipliers: Some(multipliers),
            strong_checks,
            lite_checks,
            failed_checks,
            hard_gate_reason,
            reason: None,
            gate_note,
            conditions_ready,
            starve_cnt: state.starve_cnt,
            lite_guard_ok,
        };

        Ok(Evaluation {
            next_state: state.after(signal),
            decision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AgentFeatureSet, AgentPair, Breadth, EmaCross, Flows, Indicators, Leaders, LiqSkew,
        MacdSign, OiDirection, Sign, Stance, TfAlignment, TimeframeIndicators,
    };
    use std::collections::BTreeMap;

    fn bullish_tf() -> TimeframeIndicators {
        TimeframeIndicators {
            rsi: 75.0,
            rsi_slope: Sign::Plus,
            macd: MacdSign::Pos,
            macd_hist_slope: Sign::Plus,
            ema_cross: EmaCross::FastAboveSlow,
            ema_slope: Sign::Plus,
        }
    }

    fn bullish_view(phase: [f64; 5], volume_ratio: f64) -> AgentFeatureSet {
        let mut signs = BTreeMap::new();
        signs.insert("ETH".to_string(), Sign::Plus);
        signs.insert("SOL".to_string(), Sign::Plus);
        AgentFeatureSet {
            phase_vector: phase,
            tf_alignment: TfAlignment {
                h4: Stance::Bull,
                h1: Stance::Bull,
            },
            indicators: Indicators {
                h4: bullish_tf(),
                h1: bullish_tf(),
            },
            volume_ratio,
            leaders: Leaders {
                signs,
                breadth: Breadth::RiskOn,
            },
            flows: Flows {
                oi: OiDirection::Up,
                liq_skew: LiqSkew::Short,
            },
            sentiment_index: 1.0,
        }
    }

    fn bearish_view(phase: [f64; 5]) -> AgentFeatureSet {
        let mut view = bullish_view(phase, 1.0);
        view.tf_alignment = TfAlignment {
            h4: Stance::Bear,
            h1: Stance::Bear,
        };
        view
    }

    /// Target pair with zero-spread delta plus one aligned peer.
    fn aligned_snapshot(volume_ratio: f64) -> BasketSnapshot {
        let mut snap = BasketSnapshot::new();
        snap.insert(
            "BTC",
            AgentPair {
                bull: bullish_view([1.04; 5], volume_ratio),
                bear: bearish_view([0.96; 5]),
            },
        );
        // peer delta parallel to the target's -> angle 0
        snap.insert(
            "ETH",
            AgentPair {
                bull: bullish_view([1.10; 5], 1.0),
                bear: bearish_view([1.00; 5]),
            },
        );
        snap
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(EngineConfig::default())
    }

    #[test]
    fn test_perfect_coherence_strong_buy_full() {
        let eval = engine()
            .evaluate(
                &aligned_snapshot(1.35),
                "BTC",
                None,
                EngineState::default(),
                None,
            )
            .unwrap();
        let d = eval.decision;

        assert_eq!(d.c_raw, 100.0);
        assert_eq!(d.phase_angle_deg, 0.0);
        assert_eq!(d.signal, Signal::Buy);
        assert_eq!(d.mode, Mode::Strong);
        assert_eq!(d.size_band, SizeBand::Full);
        assert_eq!(d.gate_note, GateNote::StrongFull);
        assert!(d.failed_checks.is_empty());
        assert!(d.hard_gate_reason.is_none());
        assert_eq!(eval.next_state.starve_cnt, 0);
    }

    #[test]
    fn test_fastgate_short_circuits() {
        let eval = engine()
            .evaluate(
                &aligned_snapshot(0.79),
                "BTC",
                None,
                EngineState::default(),
                None,
            )
            .unwrap();
        let d = eval.decision;

        assert_eq!(d.signal, Signal::Watch);
        assert_eq!(d.size_band, SizeBand::Watch);
        assert_eq!(d.mode, Mode::Baseline);
        assert_eq!(d.reason.as_deref(), Some(REASON_VOLUME_LOW_FASTGATE));
        assert_eq!(d.gate_note, GateNote::WatchFastgate);
        assert_eq!(d.failed_checks, vec![GateName::Volume]);
        assert_eq!(d.hard_gate_reason, Some(GateName::Volume));
        // battery never ran
        assert!(d.tech.is_none());
        assert!(d.gate_multipliers.is_none());
        assert_eq!(eval.next_state.starve_cnt, 1);
    }

    #[test]
    fn test_quiet_regime_uses_higher_threshold() {
        // volume 0.90: quiet regime, threshold 70 instead of 66
        let eval = engine()
            .evaluate(
                &aligned_snapshot(0.90),
                "BTC",
                None,
                EngineState::default(),
                None,
            )
            .unwrap();
        let d = eval.decision;
        let ceff_check = d
            .strong_checks
            .iter()
            .find(|c| c.name == GateName::Ceff)
            .unwrap();
        assert_eq!(ceff_check.threshold, 70.0);
        assert_eq!(d.regime, crate::domain::Regime::Quiet);
    }

    #[test]
    fn test_trap_veto_blocks_even_when_gates_pass() {
        let mut config = EngineConfig::default();
        config.trap_cutoff = 0.40;
        let engine = DecisionEngine::new(config);

        // volume 1.0 -> trap_T 0.50 > 0.40; strip every herald source
        let mut snap = aligned_snapshot(1.0);
        {
            let pair = snap.pair_mut("BTC").unwrap();
            pair.bull.leaders.signs.clear();
            pair.bull.flows = Flows::default();
        }

        let eval = engine
            .evaluate(&snap, "BTC", None, EngineState::default(), None)
            .unwrap();
        let d = eval.decision;

        assert_eq!(d.signal, Signal::Watch);
        assert_eq!(d.hard_gate_reason, Some(GateName::TrapVeto));
        assert!(d.failed_checks.contains(&GateName::TrapVeto));
        // lite must not rescue a vetoed cycle
        assert_ne!(d.mode, Mode::Lite);
    }

    #[test]
    fn test_lite_rescue_is_half_sized() {
        // raise the strong bar so only lite can pass
        let mut config = EngineConfig::default();
        config.strong_ceff_enter_active = 99.9;
        config.strong_ceff_enter_quiet = 99.9;
        let engine = DecisionEngine::new(config);

        // volume 0.87: below lite_vol_enter 0.95, inside rescue band
        let eval = engine
            .evaluate(
                &aligned_snapshot(0.87),
                "BTC",
                None,
                EngineState::default(),
                None,
            )
            .unwrap();
        let d = eval.decision;

        assert_eq!(d.signal, Signal::Buy);
        assert_eq!(d.mode, Mode::Lite);
        assert_eq!(d.size_band, SizeBand::Half);
        assert_eq!(d.gate_note, GateNote::LiteRescue);
        // rescue path relaxes the lite entry bar
        let lite = d.lite_checks.unwrap();
        let ceff = lite.iter().find(|c| c.name == GateName::Ceff).unwrap();
        assert_eq!(ceff.threshold, 42.0);
    }

    #[test]
    fn test_starve_guard_blocks_fresh_state() {
        let mut config = EngineConfig::default();
        config.strong_ceff_enter_active = 99.9;
        config.strong_ceff_enter_quiet = 99.9;
        config.lite_starve_cycles = Some(3);
        let engine = DecisionEngine::new(config);

        let snap = aligned_snapshot(1.0);

        // starve_cnt 0 < 3: guard holds lite back
        let eval = engine
            .evaluate(&snap, "BTC", None, EngineState::default(), None)
            .unwrap();
        assert_eq!(eval.decision.signal, Signal::Watch);
        assert!(!eval.decision.lite_guard_ok);

        // starved long enough: lite fires
        let starved = EngineState {
            starve_cnt: 3,
            last_strong: false,
        };
        let eval = engine.evaluate(&snap, "BTC", None, starved, None).unwrap();
        assert_eq!(eval.decision.signal, Signal::Buy);
        assert_eq!(eval.decision.mode, Mode::Lite);
    }

    #[test]
    fn test_high_decile_tightens_phase_gate() {
        let eval = engine()
            .evaluate(
                &aligned_snapshot(1.35),
                "BTC",
                Some(RegimeDecile::new(8)),
                EngineState::default(),
                None,
            )
            .unwrap();
        let phase = eval
            .decision
            .strong_checks
            .iter()
            .find(|c| c.name == GateName::Phase)
            .unwrap();
        assert_eq!(phase.threshold, 35.0);
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let snap = BasketSnapshot::new();
        let err = engine()
            .evaluate(&snap, "BTC", None, EngineState::default(), None)
            .unwrap_err();
        assert!(matches!(err, PhasegateError::FeatureSetUnavailable(_)));
    }

    #[test]
    fn test_size_band_thresholds() {
        assert_eq!(size_band_from_ceff(70.0, 66.0), SizeBand::Full);
        assert_eq!(size_band_from_ceff(66.0, 66.0), SizeBand::Full);
        assert_eq!(size_band_from_ceff(50.0, 66.0), SizeBand::Half);
        assert_eq!(size_band_from_ceff(46.0, 66.0), SizeBand::Half);
        assert_eq!(size_band_from_ceff(45.9, 66.0), SizeBand::Watch);
        // the Half floor binds when the full threshold is low
        assert_eq!(size_band_from_ceff(33.0, 40.0), SizeBand::Half);
        assert_eq!(size_band_from_ceff(31.0, 40.0), SizeBand::Watch);
    }
}
