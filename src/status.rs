//! Run status domain types and the local status store
//!
//! The store is the coordinator's authoritative cache of the last
//! *confirmed* status per run. It performs no validation of its own;
//! the coordinator's guards decide whether a write is allowed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle status of a run as seen by the coordinator.
///
/// READY is absorbing: once a run is observed READY, this coordinator
/// never moves it back to NEW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    New,
    Ready,
}

impl RunStatus {
    /// Whether this status is terminal for the coordinator.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Ready)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::New => write!(f, "NEW"),
            RunStatus::Ready => write!(f, "READY"),
        }
    }
}

/// Tagged reason for requesting a completion check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusTrigger {
    AfterUnitPick,
    SubGroupCompleted,
    SegmentCompleted,
    RunCompleted,
    ManualCheck,
}

impl fmt::Display for StatusTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusTrigger::AfterUnitPick => "after-unit-pick",
            StatusTrigger::SubGroupCompleted => "sub-group-completed",
            StatusTrigger::SegmentCompleted => "segment-completed",
            StatusTrigger::RunCompleted => "run-completed",
            StatusTrigger::ManualCheck => "manual-check",
        };
        write!(f, "{}", s)
    }
}

/// Last known status of a run, with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatusState {
    #[serde(rename = "run-no")]
    pub run_no: u32,
    pub status: RunStatus,
    #[serde(rename = "last-updated")]
    pub last_updated: DateTime<Utc>,
}

/// In-memory store of the last confirmed status per run.
///
/// Every write replaces the whole `RunStatusState` with a fresh
/// timestamp. Entries are never removed during normal operation;
/// `clear` exists for reset/teardown.
#[derive(Debug, Default)]
pub struct StatusStore {
    states: HashMap<u32, RunStatusState>,
    /// Most recently written run number, for the "current run" view.
    current: Option<u32>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last confirmed state for a run, if one has been observed.
    pub fn get(&self, run_no: u32) -> Option<&RunStatusState> {
        self.states.get(&run_no)
    }

    /// Overwrite the full state for a run with a fresh timestamp.
    pub fn set(&mut self, run_no: u32, status: RunStatus) {
        self.states.insert(
            run_no,
            RunStatusState {
                run_no,
                status,
                last_updated: Utc::now(),
            },
        );
        self.current = Some(run_no);
    }

    /// State of the most recently updated run.
    pub fn current(&self) -> Option<&RunStatusState> {
        self.current.and_then(|run_no| self.states.get(&run_no))
    }

    /// Whether the cached status for a run is terminal.
    pub fn is_ready(&self, run_no: u32) -> bool {
        self.get(run_no).is_some_and(|s| s.status.is_terminal())
    }

    /// Drop all cached state (reset/teardown only).
    pub fn clear(&mut self) {
        self.states.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_absent_run() {
        let store = StatusStore::new();
        assert!(store.get(500).is_none());
        assert!(store.current().is_none());
        assert!(!store.is_ready(500));
    }

    #[test]
    fn test_set_overwrites_full_state() {
        let mut store = StatusStore::new();
        store.set(500, RunStatus::New);

        let first = store.get(500).unwrap().clone();
        assert_eq!(first.run_no, 500);
        assert_eq!(first.status, RunStatus::New);

        store.set(500, RunStatus::Ready);
        let second = store.get(500).unwrap();
        assert_eq!(second.status, RunStatus::Ready);
        assert!(second.last_updated >= first.last_updated);
        assert!(store.is_ready(500));
    }

    #[test]
    fn test_current_tracks_last_write() {
        let mut store = StatusStore::new();
        store.set(500, RunStatus::New);
        store.set(501, RunStatus::Ready);
        assert_eq!(store.current().unwrap().run_no, 501);

        store.set(500, RunStatus::Ready);
        assert_eq!(store.current().unwrap().run_no, 500);
    }

    #[test]
    fn test_clear() {
        let mut store = StatusStore::new();
        store.set(500, RunStatus::Ready);
        store.clear();
        assert!(store.get(500).is_none());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_status_display_matches_wire_names() {
        assert_eq!(RunStatus::New.to_string(), "NEW");
        assert_eq!(RunStatus::Ready.to_string(), "READY");
        assert_eq!(serde_json::to_string(&RunStatus::Ready).unwrap(), "\"READY\"");
    }

    #[test]
    fn test_trigger_serialization() {
        let json = serde_json::to_string(&StatusTrigger::AfterUnitPick).unwrap();
        assert_eq!(json, "\"after-unit-pick\"");
        assert_eq!(StatusTrigger::ManualCheck.to_string(), "manual-check");
    }
}
