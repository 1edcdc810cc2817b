//! Append-only audit outputs.
//!
//! Every invocation produces:
//! - one JSON line in the decisions log (the full Decision record)
//! - one minimal CSV row in the run log (header written on creation)
//! - a mirror line in the skipped log when the decision is WATCH
//! - a heartbeat line for liveness monitoring

use crate::config::PathsConfig;
use crate::domain::Decision;
use crate::error::{PhasegateError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header of the tabular run log.
pub const RUN_CSV_HEADER: &str =
    "timestamp_utc,asset,price,c_eff,phase_angle_deg,volume_ratio,signal,size_band,mode,trap_t";

/// Liveness record appended after each run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub ts: DateTime<Utc>,
    /// 1 when the cycle produced a non-WATCH signal
    pub strong: u8,
    pub experiment: String,
    pub c_eff: f64,
}

impl Heartbeat {
    pub fn from_decision(decision: &Decision) -> Self {
        Self {
            ts: decision.timestamp_utc,
            strong: if decision.signal.is_watch() { 0 } else { 1 },
            experiment: decision.experiment.clone(),
            c_eff: decision.c_eff,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    run_csv: PathBuf,
    decisions_jsonl: PathBuf,
    skipped_jsonl: PathBuf,
    heartbeat: PathBuf,
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PhasegateError::AuditLog {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PhasegateError::AuditLog {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    writeln!(file, "{line}").map_err(|e| PhasegateError::AuditLog {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

impl AuditLog {
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            run_csv: paths.run_csv.clone(),
            decisions_jsonl: paths.decisions_jsonl.clone(),
            skipped_jsonl: paths.skipped_jsonl(),
            heartbeat: paths.heartbeat.clone(),
        }
    }

    pub fn decisions_path(&self) -> &Path {
        &self.decisions_jsonl
    }

    /// Record one decision across every output.
    pub fn record(&self, decision: &Decision) -> Result<()> {
        self.append_csv_row(decision)?;

        let line = serde_json::to_string(decision)?;
        append_line(&self.decisions_jsonl, &line)?;
        if decision.signal.is_watch() {
            append_line(&self.skipped_jsonl, &line)?;
        }

        let hb = serde_json::to_string(&Heartbeat::from_decision(decision))?;
        append_line(&self.heartbeat, &hb)
    }

    fn append_csv_row(&self, decision: &Decision) -> Result<()> {
        let is_new = !self.run_csv.exists();
        if is_new {
            append_line(&self.run_csv, RUN_CSV_HEADER)?;
        }
        let row = format!(
            "{},{},{},{},{},{},{},{},{},{}",
            decision
                .timestamp_utc
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            decision.asset,
            decision.price.map_or(String::new(), |p| p.to_string()),
            decision.c_eff,
            decision.phase_angle_deg,
            decision.volume_ratio,
            decision.signal,
            decision.size_band,
            decision.mode,
            decision.trap_probability,
        );
        append_line(&self.run_csv, &row)
    }

    /// Read the last `count` decisions from the JSONL log (oldest
    /// first). Unparsable lines are skipped.
    pub fn tail(&self, count: usize) -> Result<Vec<Decision>> {
        let content = match std::fs::read_to_string(&self.decisions_jsonl) {
            Ok(c) => c,
            Err(_) => return Ok(Vec::new()),
        };
        let mut decisions: Vec<Decision> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect();
        if decisions.len() > count {
            decisions.drain(..decisions.len() - count);
        }
        Ok(decisions)
    }
}
