use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{Decision, Flows, LiqSkew, OiDirection};
use crate::engine::{self, DecisionEngine};
use crate::error::{PhasegateError, Result};
use crate::fixtures;
use crate::persistence::{AuditLog, FeatureStore, StateStore};

#[derive(Parser)]
#[command(name = "phasegate")]
#[command(author = "Phasegate Team")]
#[command(version = "0.1.0")]
#[command(about = "Dual-agent phase-coherence decision engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory path
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one decision cycle
    Run {
        /// Pin the target's sentiment index
        #[arg(long)]
        sentiment_index: Option<f64>,
        /// Pin the target's volume ratio
        #[arg(long)]
        volume_ratio: Option<f64>,
        /// Inline JSON flows override, e.g. '{"oi":"up","liq_skew":"short"}'
        #[arg(long)]
        flows: Option<String>,
        /// JSON file with a flows override
        #[arg(long)]
        flows_file: Option<PathBuf>,
        /// Reference price recorded alongside the decision
        #[arg(long)]
        price: Option<f64>,
        /// Coherence decay constant override
        #[arg(long)]
        kappa: Option<f64>,
        /// Trap-veto cutoff override
        #[arg(long)]
        trap_cutoff: Option<f64>,
        /// Experiment lane label
        #[arg(long)]
        experiment_id: Option<String>,
        /// Minimum consecutive WATCH cycles before LITE may fire
        #[arg(long)]
        lite_starve_cycles: Option<u32>,
    },
    /// Show recent decisions from the JSONL log
    Tail {
        /// Number of decisions to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },
    /// Write seeded bull/bear fixture files for the configured basket
    Fixture {
        /// Generator seed
        #[arg(long, default_value = "40")]
        seed: u64,
    },
}

/// Per-run overrides for the `run` command
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    pub sentiment_index: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub flows: Option<String>,
    pub flows_file: Option<PathBuf>,
    pub price: Option<f64>,
    pub kappa: Option<f64>,
    pub trap_cutoff: Option<f64>,
    pub experiment_id: Option<String>,
    pub lite_starve_cycles: Option<u32>,
}

/// Partial flows override parsed from CLI JSON
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct FlowsOverride {
    #[serde(default)]
    pub oi: Option<OiDirection>,
    #[serde(default)]
    pub liq_skew: Option<LiqSkew>,
}

impl FlowsOverride {
    fn merge(&mut self, other: FlowsOverride) {
        if other.oi.is_some() {
            self.oi = other.oi;
        }
        if other.liq_skew.is_some() {
            self.liq_skew = other.liq_skew;
        }
    }

    fn apply(&self, flows: &mut Flows) {
        if let Some(oi) = self.oi {
            flows.oi = oi;
        }
        if let Some(skew) = self.liq_skew {
            flows.liq_skew = skew;
        }
    }
}

/// One full decision cycle: load inputs, evaluate, write every audit
/// output, persist the successor state.
pub fn run_once(mut config: AppConfig, overrides: RunOverrides) -> Result<Decision> {
    if let Some(kappa) = overrides.kappa {
        config.engine.kappa = kappa;
    }
    if let Some(cutoff) = overrides.trap_cutoff {
        config.engine.trap_cutoff = cutoff;
    }
    if let Some(cycles) = overrides.lite_starve_cycles {
        config.engine.lite_starve_cycles = Some(cycles);
    }
    if let Some(ref experiment) = overrides.experiment_id {
        config.engine.experiment_id = Some(experiment.clone());
    }

    if let Err(errors) = config.validate() {
        return Err(PhasegateError::Validation(errors.join("; ")));
    }

    let feature_store = FeatureStore::new(&config.paths.agents_dir);
    let mut snapshot = feature_store.load_basket(&config.basket.assets);

    // Supervisors frequently pin single inputs; overrides land on the
    // target's bull view, which carries the market-context fields.
    if let Some(pair) = snapshot.pair_mut(&config.basket.target) {
        if let Some(si) = overrides.sentiment_index {
            pair.bull.sentiment_index = si;
        }
        if let Some(vr) = overrides.volume_ratio {
            pair.bull.volume_ratio = vr;
        }

        let mut flows_override = FlowsOverride::default();
        if let Some(ref raw) = overrides.flows {
            match serde_json::from_str::<FlowsOverride>(raw) {
                Ok(parsed) => flows_override.merge(parsed),
                Err(e) => warn!("ignoring unparsable --flows override: {e}"),
            }
        }
        if let Some(ref path) = overrides.flows_file {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<FlowsOverride>(&content) {
                    Ok(parsed) => flows_override.merge(parsed),
                    Err(e) => warn!("ignoring unparsable flows file {}: {e}", path.display()),
                },
                Err(e) => warn!("ignoring unreadable flows file {}: {e}", path.display()),
            }
        }
        flows_override.apply(&mut pair.bull.flows);

        // overrides may reintroduce odd numerics
        pair.bull = pair.bull.clone().sanitized();
    }

    let decile = engine::load_decile(&config.paths.data_dir);
    let state_store = StateStore::new(&config.paths.data_dir);
    let state = state_store.load();

    let engine = DecisionEngine::new(config.engine.clone());
    let evaluation = engine.evaluate(
        &snapshot,
        &config.basket.target,
        decile,
        state,
        overrides.price,
    )?;

    let audit = AuditLog::new(&config.paths);
    audit.record(&evaluation.decision)?;
    state_store.store(&evaluation.next_state)?;
    info!(
        "persisted state: starve_cnt={} last_strong={}",
        evaluation.next_state.starve_cnt, evaluation.next_state.last_strong
    );

    Ok(evaluation.decision)
}

/// Print the decision summary for interactive runs.
pub fn print_decision(decision: &Decision) {
    println!(
        "{} {} | mode={} size={} | Ceff={:.2} angle={:.2} vol={:.3} trapT={:.2}",
        decision.asset,
        decision.signal,
        decision.mode,
        decision.size_band,
        decision.c_eff,
        decision.phase_angle_deg,
        decision.volume_ratio,
        decision.trap_probability,
    );
    if decision.signal.is_watch() {
        let failed: Vec<&str> = decision.failed_checks.iter().map(|g| g.as_str()).collect();
        let reason = decision
            .hard_gate_reason
            .map(|g| g.as_str())
            .or(decision.reason.as_deref())
            .unwrap_or("-");
        println!("  why: {} | failed: [{}]", reason, failed.join(", "));
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct DecisionRow {
    pub timestamp: String,
    pub asset: String,
    pub signal: String,
    pub mode: String,
    pub size: String,
    pub c_eff: String,
    pub angle: String,
    pub volume: String,
    pub trap_t: String,
}

impl From<&Decision> for DecisionRow {
    fn from(d: &Decision) -> Self {
        Self {
            timestamp: d.timestamp_utc.format("%Y-%m-%d %H:%M:%S").to_string(),
            asset: d.asset.clone(),
            signal: d.signal.to_string(),
            mode: d.mode.to_string(),
            size: d.size_band.to_string(),
            c_eff: format!("{:.2}", d.c_eff),
            angle: format!("{:.2}", d.phase_angle_deg),
            volume: format!("{:.3}", d.volume_ratio),
            trap_t: format!("{:.2}", d.trap_probability),
        }
    }
}

/// Render the most recent decisions as a table.
pub fn show_tail(config: &AppConfig, count: usize) -> Result<()> {
    let audit = AuditLog::new(&config.paths);
    let decisions = audit.tail(count)?;
    if decisions.is_empty() {
        println!("(no decisions logged)");
        return Ok(());
    }
    let rows: Vec<DecisionRow> = decisions.iter().map(DecisionRow::from).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

/// Write seeded fixture pairs for every configured asset.
pub fn write_fixtures(config: &AppConfig, seed: u64) -> Result<()> {
    let store = FeatureStore::new(&config.paths.agents_dir);
    for (i, asset) in config.basket.assets.iter().enumerate() {
        let pair = fixtures::seeded_pair(seed.wrapping_add(i as u64));
        store.store_pair(asset, &pair)?;
        info!("wrote fixture pair for {asset}");
    }
    println!(
        "Wrote {} fixture pairs to {}",
        config.basket.assets.len(),
        config.paths.agents_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flows_override_merge_and_apply() {
        let mut base = FlowsOverride::default();
        base.merge(serde_json::from_str(r#"{"oi":"up"}"#).unwrap());
        base.merge(serde_json::from_str(r#"{"liq_skew":"short"}"#).unwrap());

        let mut flows = Flows::default();
        base.apply(&mut flows);
        assert_eq!(flows.oi, OiDirection::Up);
        assert_eq!(flows.liq_skew, LiqSkew::Short);

        // later merges win
        base.merge(serde_json::from_str(r#"{"oi":"down"}"#).unwrap());
        base.apply(&mut flows);
        assert_eq!(flows.oi, OiDirection::Down);
    }

    #[test]
    fn test_decision_row_formatting() {
        let mut snapshot = crate::domain::BasketSnapshot::new();
        snapshot.insert("BTC", crate::fixtures::neutral_pair());
        let engine = DecisionEngine::new(crate::config::EngineConfig::default());
        let decision = engine
            .evaluate(
                &snapshot,
                "BTC",
                None,
                crate::domain::EngineState::default(),
                None,
            )
            .unwrap()
            .decision;

        let row = DecisionRow::from(&decision);
        assert_eq!(row.asset, "BTC");
        assert_eq!(row.signal, "WATCH");
        assert_eq!(row.size, "Watch");
    }
}
