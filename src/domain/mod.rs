pub mod decision;
pub mod features;
pub mod state;

pub use decision::{
    Decision, GateMultipliers, GateName, GateNote, GateResult, Mode, Regime, Signal, SizeBand,
    TechSummary,
};
pub use features::{
    AgentFeatureSet, AgentPair, BasketSnapshot, Breadth, EmaCross, Flows, Indicators, Leaders,
    LiqSkew, MacdSign, OiDirection, PhaseDelta, Sign, Stance, TfAlignment, TimeframeIndicators,
    PHASE_DIM,
};
pub use state::{EngineState, STARVE_CNT_CAP};
