pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod persistence;

pub use config::AppConfig;
pub use domain::{
    AgentFeatureSet, AgentPair, BasketSnapshot, Decision, EngineState, GateName, GateResult, Mode,
    PhaseDelta, Signal, SizeBand,
};
pub use engine::{DecisionEngine, Evaluation, RegimeDecile};
pub use error::{PhasegateError, Result};
pub use persistence::{AuditLog, FeatureStore, StateStore};
