use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub basket: BasketConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Decision-engine thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Coherence decay constant
    #[serde(default = "default_kappa")]
    pub kappa: f64,

    // Strong tier
    #[serde(default = "default_strong_angle_min")]
    pub strong_angle_min: f64,
    #[serde(default = "default_strong_angle_max")]
    pub strong_angle_max: f64,
    /// C_eff entry threshold when volume_ratio >= 1.0
    #[serde(default = "default_strong_ceff_enter_active")]
    pub strong_ceff_enter_active: f64,
    /// C_eff entry threshold in quiet volume (ratio < 1.0)
    #[serde(default = "default_strong_ceff_enter_quiet")]
    pub strong_ceff_enter_quiet: f64,
    /// Technical coherence floor (exclusive)
    #[serde(default = "default_coh_enter")]
    pub coh_enter: f64,
    /// Volume-ratio admission floor
    #[serde(default = "default_vol_enter")]
    pub vol_enter: f64,

    // Lite tier
    #[serde(default = "default_true")]
    pub lite_enable: bool,
    #[serde(default = "default_lite_angle_min")]
    pub lite_angle_min: f64,
    #[serde(default = "default_lite_angle_max")]
    pub lite_angle_max: f64,
    #[serde(default = "default_lite_ceff_enter")]
    pub lite_ceff_enter: f64,
    #[serde(default = "default_lite_coh_enter")]
    pub lite_coh_enter: f64,
    #[serde(default = "default_lite_vol_enter")]
    pub lite_vol_enter: f64,
    /// Rescue-path volume floor (requires herald + tf corroboration)
    #[serde(default = "default_lite_rescue_min_vol")]
    pub lite_rescue_min_vol: f64,
    /// Minimum consecutive WATCH cycles before lite may fire (None = no guard)
    #[serde(default)]
    pub lite_starve_cycles: Option<u32>,

    // Sentiment-conflict gate
    #[serde(default = "default_si_conflict_threshold")]
    pub si_conflict_threshold: f64,
    #[serde(default = "default_si_conflict_mult")]
    pub si_conflict_mult: f64,

    // Flow gate
    #[serde(default = "default_flows_mult")]
    pub flows_up_short_mult: f64,
    #[serde(default = "default_flows_mult")]
    pub flows_down_long_mult: f64,

    /// Trap-veto cutoff (exclusive)
    #[serde(default = "default_trap_cutoff")]
    pub trap_cutoff: f64,

    /// Experiment lane label carried into every decision record
    #[serde(default)]
    pub experiment_id: Option<String>,
}

fn default_kappa() -> f64 {
    20.0
}
fn default_strong_angle_min() -> f64 {
    12.0
}
fn default_strong_angle_max() -> f64 {
    35.0
}
fn default_strong_ceff_enter_active() -> f64 {
    66.0
}
fn default_strong_ceff_enter_quiet() -> f64 {
    70.0
}
fn default_coh_enter() -> f64 {
    0.50
}
fn default_vol_enter() -> f64 {
    1.00
}
fn default_true() -> bool {
    true
}
fn default_lite_angle_min() -> f64 {
    12.0
}
fn default_lite_angle_max() -> f64 {
    45.0
}
fn default_lite_ceff_enter() -> f64 {
    48.0
}
fn default_lite_coh_enter() -> f64 {
    0.35
}
fn default_lite_vol_enter() -> f64 {
    0.95
}
fn default_lite_rescue_min_vol() -> f64 {
    0.85
}
fn default_si_conflict_threshold() -> f64 {
    2.0
}
fn default_si_conflict_mult() -> f64 {
    0.25
}
fn default_flows_mult() -> f64 {
    0.05
}
fn default_trap_cutoff() -> f64 {
    0.80
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kappa: default_kappa(),
            strong_angle_min: default_strong_angle_min(),
            strong_angle_max: default_strong_angle_max(),
            strong_ceff_enter_active: default_strong_ceff_enter_active(),
            strong_ceff_enter_quiet: default_strong_ceff_enter_quiet(),
            coh_enter: default_coh_enter(),
            vol_enter: default_vol_enter(),
            lite_enable: true,
            lite_angle_min: default_lite_angle_min(),
            lite_angle_max: default_lite_angle_max(),
            lite_ceff_enter: default_lite_ceff_enter(),
            lite_coh_enter: default_lite_coh_enter(),
            lite_vol_enter: default_lite_vol_enter(),
            lite_rescue_min_vol: default_lite_rescue_min_vol(),
            lite_starve_cycles: None,
            si_conflict_threshold: default_si_conflict_threshold(),
            si_conflict_mult: default_si_conflict_mult(),
            flows_up_short_mult: default_flows_mult(),
            flows_down_long_mult: default_flows_mult(),
            trap_cutoff: default_trap_cutoff(),
            experiment_id: None,
        }
    }
}

impl EngineConfig {
    /// Experiment lane label, defaulting to "baseline".
    pub fn experiment(&self) -> &str {
        self.experiment_id.as_deref().unwrap_or("baseline")
    }
}

/// Tracked asset basket
#[derive(Debug, Clone, Deserialize)]
pub struct BasketConfig {
    /// Asset symbols whose bull/bear snapshots are loaded each cycle
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
    /// The asset the decision is made for
    #[serde(default = "default_target")]
    pub target: String,
}

fn default_assets() -> Vec<String> {
    ["BTC", "ETH", "SOL", "SPX", "NDX", "DXY", "GOLD", "US10Y"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_target() -> String {
    "BTC".to_string()
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            target: default_target(),
        }
    }
}

/// File-system locations for inputs and append-only outputs
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `<ASSET>_bull.json` / `<ASSET>_bear.json`
    #[serde(default = "default_agents_dir")]
    pub agents_dir: PathBuf,
    /// Directory holding the state file and regime stats file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Append-only tabular run log
    #[serde(default = "default_run_csv")]
    pub run_csv: PathBuf,
    /// Append-only decision records (one JSON object per line)
    #[serde(default = "default_decisions_jsonl")]
    pub decisions_jsonl: PathBuf,
    /// Append-only heartbeat records
    #[serde(default = "default_heartbeat")]
    pub heartbeat: PathBuf,
}

fn default_agents_dir() -> PathBuf {
    PathBuf::from("data/agents")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_run_csv() -> PathBuf {
    PathBuf::from("logs/decisions_run.csv")
}
fn default_decisions_jsonl() -> PathBuf {
    PathBuf::from("logs/decisions.jsonl")
}
fn default_heartbeat() -> PathBuf {
    PathBuf::from("logs/engine_heartbeat.jsonl")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            agents_dir: default_agents_dir(),
            data_dir: default_data_dir(),
            run_csv: default_run_csv(),
            decisions_jsonl: default_decisions_jsonl(),
            heartbeat: default_heartbeat(),
        }
    }
}

impl PathsConfig {
    /// WATCH decisions are mirrored next to the main decisions log.
    pub fn skipped_jsonl(&self) -> PathBuf {
        let stem = self
            .decisions_jsonl
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("decisions");
        self.decisions_jsonl
            .with_file_name(format!("{stem}_skipped.jsonl"))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PHASEGATE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PHASEGATE_ENGINE__KAPPA, etc.)
            .add_source(
                Environment::with_prefix("PHASEGATE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let e = &self.engine;

        if e.kappa <= 0.0 {
            errors.push("kappa must be positive".to_string());
        }

        for (name, min, max) in [
            ("strong", e.strong_angle_min, e.strong_angle_max),
            ("lite", e.lite_angle_min, e.lite_angle_max),
        ] {
            if !(0.0..=180.0).contains(&min) || !(0.0..=180.0).contains(&max) {
                errors.push(format!("{name} angle bounds must be within [0, 180]"));
            }
            if min > max {
                errors.push(format!("{name}_angle_min must not exceed {name}_angle_max"));
            }
        }

        if e.strong_ceff_enter_active <= 0.0 || e.strong_ceff_enter_quiet <= 0.0 {
            errors.push("strong C_eff entry thresholds must be positive".to_string());
        }

        if e.lite_rescue_min_vol > e.lite_vol_enter {
            errors.push("lite_rescue_min_vol must not exceed lite_vol_enter".to_string());
        }

        if !(0.0..=1.0).contains(&e.trap_cutoff) {
            errors.push("trap_cutoff must be within [0, 1]".to_string());
        }

        for (name, mult) in [
            ("si_conflict_mult", e.si_conflict_mult),
            ("flows_up_short_mult", e.flows_up_short_mult),
            ("flows_down_long_mult", e.flows_down_long_mult),
        ] {
            if !(0.0..1.0).contains(&mult) {
                errors.push(format!("{name} must be within [0, 1)"));
            }
        }

        if self.basket.assets.is_empty() {
            errors.push("basket.assets must not be empty".to_string());
        }
        if !self.basket.assets.contains(&self.basket.target) {
            errors.push(format!(
                "basket.target {} is not in basket.assets",
                self.basket.target
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.kappa, 20.0);
        assert_eq!(config.engine.strong_ceff_enter_active, 66.0);
        assert_eq!(config.engine.strong_ceff_enter_quiet, 70.0);
        assert_eq!(config.engine.lite_ceff_enter, 48.0);
        assert_eq!(config.basket.target, "BTC");
        assert_eq!(config.basket.assets.len(), 8);
    }

    #[test]
    fn test_experiment_defaults_to_baseline() {
        let mut engine = EngineConfig::default();
        assert_eq!(engine.experiment(), "baseline");
        engine.experiment_id = Some("lane_b".to_string());
        assert_eq!(engine.experiment(), "lane_b");
    }

    #[test]
    fn test_skipped_log_path() {
        let paths = PathsConfig::default();
        assert_eq!(
            paths.skipped_jsonl(),
            PathBuf::from("logs/decisions_skipped.jsonl")
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.engine.kappa = 0.0;
        config.engine.strong_angle_min = 40.0; // above max 35
        config.engine.trap_cutoff = 1.5;
        config.basket.target = "DOGE".to_string();

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("kappa")));
        assert!(errors.iter().any(|e| e.contains("strong_angle_min")));
        assert!(errors.iter().any(|e| e.contains("trap_cutoff")));
        assert!(errors.iter().any(|e| e.contains("DOGE")));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [engine]
            kappa = 25.0
            trap_cutoff = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(parsed.engine.kappa, 25.0);
        assert_eq!(parsed.engine.trap_cutoff, 0.6);
        // untouched fields keep their defaults
        assert_eq!(parsed.engine.lite_vol_enter, 0.95);
        assert_eq!(parsed.basket.target, "BTC");
    }
}
