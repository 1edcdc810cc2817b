//! Cross-invocation engine state.
//!
//! The starvation counter is the only mutable state the engine carries
//! between invocations. It is an explicit value passed into and
//! returned from the decision function; persistence is the caller's
//! responsibility (load-before, store-after).

use crate::domain::decision::Signal;
use serde::{Deserialize, Serialize};

/// Upper bound on the persisted starvation counter.
pub const STARVE_CNT_CAP: u32 = 1000;

/// Persisted engine state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Consecutive WATCH cycles since the last actionable signal
    #[serde(default)]
    pub starve_cnt: u32,
    /// Whether the previous cycle produced a non-WATCH signal
    #[serde(default)]
    pub last_strong: bool,
}

impl EngineState {
    /// Successor state after a decision: non-WATCH resets the counter,
    /// WATCH increments it (capped).
    pub fn after(self, signal: Signal) -> Self {
        if signal.is_watch() {
            Self {
                starve_cnt: (self.starve_cnt + 1).min(STARVE_CNT_CAP),
                last_strong: false,
            }
        } else {
            Self {
                starve_cnt: 0,
                last_strong: true,
            }
        }
    }
}
