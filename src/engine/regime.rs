//! Regime decile input and the angle-threshold adjustments it drives.
//!
//! The decile is an external 0-9 percentile ranking of basket-wide
//! coherence, produced by out-of-scope tooling and dropped as a small
//! JSON file. High deciles tighten the acceptable angle window; low
//! deciles loosen it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// External 0-9 coherence-of-coherence percentile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegimeDecile(u8);

impl RegimeDecile {
    /// Clamps out-of-range values into 0-9.
    pub fn new(decile: u8) -> Self {
        Self(decile.min(9))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_high(&self) -> bool {
        self.0 >= 7
    }

    pub fn is_low(&self) -> bool {
        self.0 <= 2
    }
}

/// Acceptable phase-angle window for a decision tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleWindow {
    pub min_deg: f64,
    pub max_deg: f64,
}

impl AngleWindow {
    /// Strong-tier adjustment: a high decile tightens the max to 35°; a
    /// low decile loosens the max by 10° (cap 60°) and the min by 5°
    /// (floor 0°).
    pub fn adjusted_for(self, decile: Option<RegimeDecile>) -> Self {
        match decile {
            Some(d) if d.is_high() => Self {
                min_deg: self.min_deg,
                max_deg: self.max_deg.min(35.0),
            },
            Some(d) if d.is_low() => Self {
                min_deg: (self.min_deg - 5.0).max(0.0),
                max_deg: (self.max_deg + 10.0).min(60.0),
            },
            _ => self,
        }
    }
}

/// Lite-tier adjustment: only the high-decile tightening applies.
pub fn lite_angle_max(base_max_deg: f64, decile: Option<RegimeDecile>) -> f64 {
    match decile {
        Some(d) if d.is_high() => base_max_deg.min(35.0),
        _ => base_max_deg,
    }
}

#[derive(Debug, Deserialize)]
struct RegimeStatsFile {
    decile: i64,
}

/// Stats file name under the data directory.
pub const STATS_FILE: &str = "coc_stats.json";

/// Read the regime decile from the data directory. Missing or
/// malformed input skips the adjustment entirely.
pub fn load_decile(data_dir: &Path) -> Option<RegimeDecile> {
    let path = data_dir.join(STATS_FILE);
    let content = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<RegimeStatsFile>(&content) {
        Ok(stats) if (0..=9).contains(&stats.decile) => Some(RegimeDecile::new(stats.decile as u8)),
        Ok(stats) => {
            debug!("regime decile {} out of range, ignoring", stats.decile);
            None
        }
        Err(e) => {
            debug!("unreadable regime stats at {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: AngleWindow = AngleWindow {
        min_deg: 12.0,
        max_deg: 35.0,
    };

    #[test]
    fn test_no_decile_keeps_base() {
        assert_eq!(BASE.adjusted_for(None), BASE);
        assert_eq!(BASE.adjusted_for(Some(RegimeDecile::new(5))), BASE);
    }

    #[test]
    fn test_high_decile_tightens_max() {
        let wide = AngleWindow {
            min_deg: 12.0,
            max_deg: 45.0,
        };
        let adj = wide.adjusted_for(Some(RegimeDecile::new(8)));
        assert_eq!(adj.max_deg, 35.0);
        assert_eq!(adj.min_deg, 12.0);
    }

    #[test]
    fn test_low_decile_loosens_both() {
        let adj = BASE.adjusted_for(Some(RegimeDecile::new(1)));
        assert_eq!(adj.max_deg, 45.0);
        assert_eq!(adj.min_deg, 7.0);

        // caps hold
        let wide = AngleWindow {
            min_deg: 2.0,
            max_deg: 55.0,
        };
        let adj = wide.adjusted_for(Some(RegimeDecile::new(0)));
        assert_eq!(adj.max_deg, 60.0);
        assert_eq!(adj.min_deg, 0.0);
    }

    #[test]
    fn test_lite_only_tightens() {
        assert_eq!(lite_angle_max(45.0, Some(RegimeDecile::new(9))), 35.0);
        assert_eq!(lite_angle_max(45.0, Some(RegimeDecile::new(1))), 45.0);
        assert_eq!(lite_angle_max(45.0, None), 45.0);
    }

    #[test]
    fn test_load_decile_missing_file() {
        assert_eq!(load_decile(Path::new("/nonexistent-dir")), None);
    }

    #[test]
    fn test_load_decile_parses_and_validates() {
        let dir = std::env::temp_dir().join("phasegate_regime_test");
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(dir.join(STATS_FILE), r#"{"decile": 7}"#).unwrap();
        assert_eq!(load_decile(&dir), Some(RegimeDecile::new(7)));

        std::fs::write(dir.join(STATS_FILE), r#"{"decile": 42}"#).unwrap();
        assert_eq!(load_decile(&dir), None);

        std::fs::write(dir.join(STATS_FILE), "not json").unwrap();
        assert_eq!(load_decile(&dir), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
