pub mod audit;
pub mod feature_store;
pub mod state_store;

pub use audit::{AuditLog, Heartbeat, RUN_CSV_HEADER};
pub use feature_store::FeatureStore;
pub use state_store::{StateStore, STATE_FILE};
