//! Loading the per-asset bull/bear feature files.
//!
//! Files live under the agents directory as `<ASSET>_bull.json` and
//! `<ASSET>_bear.json`. A missing or malformed pair is a fallback
//! condition, not an abort: the neutral fixture pair is substituted and
//! the substitution is logged.

use crate::domain::{AgentFeatureSet, AgentPair, BasketSnapshot};
use crate::fixtures;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FeatureStore {
    agents_dir: PathBuf,
}

impl FeatureStore {
    pub fn new(agents_dir: &Path) -> Self {
        Self {
            agents_dir: agents_dir.to_path_buf(),
        }
    }

    pub fn bull_path(&self, asset: &str) -> PathBuf {
        self.agents_dir.join(format!("{asset}_bull.json"))
    }

    pub fn bear_path(&self, asset: &str) -> PathBuf {
        self.agents_dir.join(format!("{asset}_bear.json"))
    }

    fn load_side(&self, path: &Path) -> Option<AgentFeatureSet> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<AgentFeatureSet>(&content) {
            Ok(fs) => Some(fs.sanitized()),
            Err(e) => {
                warn!("malformed feature file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load one asset's pair; None when either side is absent or
    /// unreadable.
    pub fn load_pair(&self, asset: &str) -> Option<AgentPair> {
        let bull = self.load_side(&self.bull_path(asset))?;
        let bear = self.load_side(&self.bear_path(asset))?;
        Some(AgentPair { bull, bear })
    }

    /// Load the whole basket, substituting the neutral fixture pair for
    /// any asset whose files are absent.
    pub fn load_basket(&self, assets: &[String]) -> BasketSnapshot {
        let mut snapshot = BasketSnapshot::new();
        for asset in assets {
            match self.load_pair(asset) {
                Some(pair) => {
                    debug!("loaded feature pair for {asset}");
                    snapshot.insert(asset.clone(), pair);
                }
                None => {
                    warn!("no feature pair for {asset}, substituting neutral fixture");
                    snapshot.insert(asset.clone(), fixtures::neutral_pair());
                }
            }
        }
        snapshot
    }

    /// Write a pair to the store (used by the fixture command).
    pub fn store_pair(&self, asset: &str, pair: &AgentPair) -> crate::error::Result<()> {
        std::fs::create_dir_all(&self.agents_dir)?;
        std::fs::write(
            self.bull_path(asset),
            serde_json::to_string_pretty(&pair.bull)?,
        )?;
        std::fs::write(
            self.bear_path(asset),
            serde_json::to_string_pretty(&pair.bear)?,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stance;

    fn temp_store(name: &str) -> FeatureStore {
        let dir = std::env::temp_dir().join(name);
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        FeatureStore::new(&dir)
    }

    #[test]
    fn test_round_trip_pair() {
        let store = temp_store("phasegate_feature_round_trip");
        let pair = fixtures::seeded_pair(40);
        store.store_pair("BTC", &pair).unwrap();

        let loaded = store.load_pair("BTC").unwrap();
        assert_eq!(loaded.bull.phase_vector, pair.bull.phase_vector);
        assert_eq!(loaded.bear.volume_ratio, pair.bear.volume_ratio);
    }

    #[test]
    fn test_missing_pair_is_none() {
        let store = temp_store("phasegate_feature_missing");
        assert!(store.load_pair("BTC").is_none());
    }

    #[test]
    fn test_half_pair_is_none() {
        let store = temp_store("phasegate_feature_half");
        let pair = fixtures::seeded_pair(1);
        std::fs::write(
            store.bull_path("BTC"),
            serde_json::to_string(&pair.bull).unwrap(),
        )
        .unwrap();
        assert!(store.load_pair("BTC").is_none());
    }

    #[test]
    fn test_basket_substitutes_neutral_fixture() {
        let store = temp_store("phasegate_feature_basket");
        store.store_pair("BTC", &fixtures::seeded_pair(2)).unwrap();

        let assets = vec!["BTC".to_string(), "ETH".to_string()];
        let snapshot = store.load_basket(&assets);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.pair("BTC").unwrap().bull.tf_alignment.h4, Stance::Bull);
        // the absent asset arrives as the neutral fixture
        assert_eq!(
            snapshot.pair("ETH").unwrap().bull.tf_alignment.h4,
            Stance::Neutral
        );
    }

    #[test]
    fn test_loaded_records_are_sanitized() {
        let store = temp_store("phasegate_feature_sanitize");
        let mut pair = fixtures::seeded_pair(3);
        pair.bull.sentiment_index = 9.0;
        store.store_pair("BTC", &pair).unwrap();

        let loaded = store.load_pair("BTC").unwrap();
        assert_eq!(loaded.bull.sentiment_index, 3.0);
    }
}
