use std::sync::Mutex;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, TaskError};
use crate::types::ReportEntry;

/// Member name -> minutes, in order of first report.
pub type Totals = IndexMap<String, u64>;

/// Running minutes per member. Neither map is ever rolled over by the command
/// path; "weekly" and "monthly" are labels only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeTotals {
    pub weekly: Totals,
    pub monthly: Totals,
}

impl TimeTotals {
    fn add(&mut self, entry: &ReportEntry) {
        let minutes = u64::from(entry.minutes);
        *self.weekly.entry(entry.name.clone()).or_insert(0) += minutes;
        *self.monthly.entry(entry.name.clone()).or_insert(0) += minutes;
    }
}

/// Lifecycle hooks for wiring persistence around the accumulator.
pub trait TotalsHooks: Send + Sync {
    fn load(&self) -> Result<Option<TimeTotals>, StoreError> {
        Ok(None)
    }

    fn save(&self, _totals: &TimeTotals) -> Result<(), StoreError> {
        Ok(())
    }

    #[cfg(test)]
    fn on_reset(&self) {}
}

/// Keeps totals in memory only; everything is lost on restart.
#[derive(Default)]
pub struct MemoryOnly;

impl TotalsHooks for MemoryOnly {}

pub struct Accumulator {
    totals: Mutex<TimeTotals>,
    hooks: Box<dyn TotalsHooks>,
}

impl Accumulator {
    pub fn new(hooks: Box<dyn TotalsHooks>) -> Self {
        let totals = match hooks.load() {
            Ok(Some(t)) => t,
            Ok(None) => TimeTotals::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load totals, starting empty");
                TimeTotals::default()
            }
        };
        Self {
            totals: Mutex::new(totals),
            hooks,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryOnly))
    }

    /// Adds every entry under a single lock, so one command's accumulation
    /// never interleaves with another's.
    pub fn apply(&self, entries: &[ReportEntry]) -> Result<(), TaskError> {
        let mut g = self.totals.lock().map_err(|_| TaskError::Poisoned)?;
        for entry in entries {
            g.add(entry);
        }
        if let Err(e) = self.hooks.save(&g) {
            tracing::warn!(error = %e, "failed to save totals");
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Result<TimeTotals, TaskError> {
        self.totals
            .lock()
            .map(|g| g.clone())
            .map_err(|_| TaskError::Poisoned)
    }

    #[cfg(test)]
    pub fn reset(&self) -> Result<(), TaskError> {
        let mut g = self.totals.lock().map_err(|_| TaskError::Poisoned)?;
        *g = TimeTotals::default();
        self.hooks.on_reset();
        if let Err(e) = self.hooks.save(&g) {
            tracing::warn!(error = %e, "failed to save totals after reset");
        }
        Ok(())
    }
}
