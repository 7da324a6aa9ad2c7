//! Per-strategy warmth tracking.
//!
//! A strategy is warm once one invocation of it has completed successfully in
//! this process. The tracker is created empty when the hosting process starts
//! and lives until it exits; there is no reset.
//!
//! Warmth is local to one execution environment. When many instances serve
//! traffic side by side, each keeps its own tracker, so "cold" means "first
//! call since this instance came up", not "first call ever".

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::strategy::StrategyId;

/// Process-lifetime record of which strategies have completed a call.
#[derive(Debug, Default)]
pub struct WarmthTracker {
    warmed_at: Mutex<HashMap<StrategyId, DateTime<Utc>>>,
}

impl WarmthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_warm(&self, id: &StrategyId) -> bool {
        self.warm_since(id).is_some()
    }

    /// When `id` was last marked warm, if ever.
    pub fn warm_since(&self, id: &StrategyId) -> Option<DateTime<Utc>> {
        self.warmed_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .copied()
    }

    /// Mark `id` warm. Repeated calls only refresh the timestamp.
    pub fn mark_warm(&self, id: &StrategyId) {
        let now = Utc::now();
        let previous = self
            .warmed_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.clone(), now);
        if previous.is_none() {
            debug!(strategy = %id, "strategy warmed");
        }
    }
}
