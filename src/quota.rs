use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::constants::DEFAULT_DAILY_QUOTA;

const WARN_THRESHOLD: f64 = 0.8;
const WARN_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Default)]
struct QuotaState {
    spent_by_endpoint: HashMap<&'static str, u64>,
    spent_total: u64,
    last_warn: Option<Instant>,
}

/// Running tally of metadata-API units charged against the daily budget.
/// There is no reset logic; the process is expected to restart well inside
/// one quota day.
#[derive(Clone)]
pub struct QuotaMeter {
    budget: u64,
    state: Arc<Mutex<QuotaState>>,
}

impl QuotaMeter {
    pub fn new(budget: u32) -> Self {
        Self {
            budget: budget as u64,
            state: Arc::new(Mutex::new(QuotaState::default())),
        }
    }

    /// Charge `units` for a call to `endpoint`. Returns false, charging
    /// nothing, once the budget is exhausted.
    pub fn try_charge(&self, endpoint: &'static str, units: u32) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.spent_total + units as u64 > self.budget {
            return false;
        }
        state.spent_total += units as u64;
        *state.spent_by_endpoint.entry(endpoint).or_default() += units as u64;

        let utilization = state.spent_total as f64 / self.budget as f64;
        if utilization >= WARN_THRESHOLD {
            let now = Instant::now();
            let due = state
                .last_warn
                .map(|at| now.duration_since(at) >= WARN_COOLDOWN)
                .unwrap_or(true);
            if due {
                warn!(
                    "metadata-API usage at {:.0}% of daily budget ({}/{} units)",
                    utilization * 100.0,
                    state.spent_total,
                    self.budget
                );
                state.last_warn = Some(now);
            }
        }
        true
    }

    pub fn spent(&self) -> u64 {
        self.state.lock().unwrap().spent_total
    }

    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.spent())
    }
}

impl Default for QuotaMeter {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_QUOTA)
    }
}
