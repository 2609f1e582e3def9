//! Per-node execution-outcome ledger.
//!
//! A [`Report`] maps node identity to a [`Record`], the ordered history of
//! that node's executions within one run. Parallel branches append
//! concurrently, so the map sits behind one lock with create-if-absent and
//! append done under a single hold.

use crate::action::Action;
use crate::error::PerformError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// One observed execution outcome for a node.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success,
    Failure(PerformError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Ordered success/failure history of one node's executions.
///
/// A node inside a ForEach or Retry accumulates one event per actual run.
#[derive(Debug, Clone, Default)]
pub struct Record {
    events: Vec<Outcome>,
}

impl Record {
    pub fn events(&self) -> &[Outcome] {
        &self.events
    }

    /// Number of completed runs recorded for the node.
    pub fn runs(&self) -> usize {
        self.events.len()
    }

    /// Number of failed runs.
    pub fn failures(&self) -> usize {
        self.events.iter().filter(|e| !e.is_success()).count()
    }

    /// Whether the final observed outcome was a success.
    pub fn succeeded(&self) -> bool {
        matches!(self.events.last(), Some(Outcome::Success))
    }

    /// One-line outcome description for rendering.
    pub fn summary(&self) -> String {
        let first_failure = self.events.iter().find_map(|e| match e {
            Outcome::Failure(err) => Some(err),
            Outcome::Success => None,
        });
        match (self.runs(), self.failures()) {
            (0, _) => "no outcome".to_string(),
            (1, 0) => "ok".to_string(),
            (1, _) => match first_failure {
                Some(err) => format!("failed: {err}"),
                None => "failed".to_string(),
            },
            (runs, 0) => format!("{runs} runs, all ok"),
            (runs, failures) => format!("{runs} runs, {failures} failed"),
        }
    }
}

/// The node-to-Record mapping for one execution run.
///
/// Every node actually visited during execution has a record with at least
/// one event by the time the run finishes; nodes never reached (the untaken
/// arm of a When, an unmatched recovery action) have none.
#[derive(Debug, Default)]
pub struct Report {
    records: Mutex<HashMap<Uuid, Record>>,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Record>>, PerformError> {
        self.records
            .lock()
            .map_err(|e| PerformError::Failed(format!("Report lock poisoned: {}", e)))
    }

    /// Create an empty record for the node if none exists yet.
    pub(crate) fn ensure_record(&self, id: Uuid) -> Result<(), PerformError> {
        self.lock()?.entry(id).or_default();
        Ok(())
    }

    /// Append one outcome event to the node's record, creating it if absent.
    pub(crate) fn append(&self, id: Uuid, outcome: Outcome) -> Result<(), PerformError> {
        self.lock()?.entry(id).or_default().events.push(outcome);
        Ok(())
    }

    /// The record for a node, if it was ever visited.
    pub fn record(&self, action: &Action) -> Option<Record> {
        self.records.lock().ok()?.get(&action.id()).cloned()
    }

    pub fn was_visited(&self, action: &Action) -> bool {
        self.record(action).is_some()
    }

    /// Number of nodes with a record.
    pub fn len(&self) -> usize {
        self.records.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
