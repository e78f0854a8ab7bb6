//! The run record and its persistence.
//!
//! Three keys make up the durable record: the JSON-encoded results, the
//! station order they belong to, and whether a run is in flight. In memory the
//! record is a tagged state, so results produced by this process can be told
//! apart from results read back from disk.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::RunnerResult;
use crate::results::TestResult;
use crate::store::KvStore;

/// Key holding the JSON-encoded results.
pub const RESULTS_KEY: &str = "railway.run.results";

/// Key holding the station order of the run.
pub const ORDER_KEY: &str = "railway.run.order";

/// Key holding the in-flight flag.
pub const RUNNING_KEY: &str = "railway.run.is_running";

/// Where a run record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by a run this process started or observed finishing.
    Fresh,
    /// Read back from the store at startup.
    Restored,
    /// Fresh results whose verdict has already been handed out for reporting.
    Reported,
}

/// The run record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running {
        order: u32,
        origin: Origin,
    },
    Completed {
        order: u32,
        results: Vec<TestResult>,
        origin: Origin,
    },
}

impl RunState {
    /// Station order of the record, 0 when idle.
    pub fn order(&self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::Running { order, .. } | Self::Completed { order, .. } => *order,
        }
    }

    /// Results of a completed run; empty otherwise.
    pub fn results(&self) -> &[TestResult] {
        match self {
            Self::Completed { results, .. } => results,
            _ => &[],
        }
    }

    pub fn origin(&self) -> Option<Origin> {
        match self {
            Self::Idle => None,
            Self::Running { origin, .. } | Self::Completed { origin, .. } => Some(*origin),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn is_restored(&self) -> bool {
        self.origin() == Some(Origin::Restored)
    }

    /// True iff the record belongs to `order`, has results, and all passed.
    pub fn is_successful(&self, order: u32) -> bool {
        let results = self.results();
        self.order() == order && !results.is_empty() && results.iter().all(|r| r.is_passed)
    }
}

/// Reads and writes the run record in a [`KvStore`].
#[derive(Clone)]
pub struct RunStateRepository {
    store: Arc<dyn KvStore>,
}

impl RunStateRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Load the persisted record.
    ///
    /// Anything found is tagged [`Origin::Restored`]. Corrupt results are not
    /// an error: the keys are deleted and the record starts over as idle.
    pub fn load(&self) -> RunState {
        let results = match self.store.get_string(RESULTS_KEY) {
            Some(raw) if !raw.trim().is_empty() => {
                match serde_json::from_str::<Vec<TestResult>>(&raw) {
                    Ok(results) => results,
                    Err(e) => {
                        warn!("Discarding corrupt run results: {}", e);
                        if let Err(e) = self.clear() {
                            warn!("Failed to delete corrupt run state: {}", e);
                        }
                        return RunState::Idle;
                    }
                }
            }
            _ => Vec::new(),
        };

        let order = self
            .store
            .get_int(ORDER_KEY)
            .and_then(|o| u32::try_from(o).ok())
            .unwrap_or(0);
        let is_running = self.store.get_bool(RUNNING_KEY).unwrap_or(false);

        let state = if is_running {
            RunState::Running {
                order,
                origin: Origin::Restored,
            }
        } else if !results.is_empty() || order != 0 {
            RunState::Completed {
                order,
                results,
                origin: Origin::Restored,
            }
        } else {
            RunState::Idle
        };

        debug!("Loaded run state: {:?}", state);
        state
    }

    /// Persist a record.
    pub fn save(&self, state: &RunState) -> RunnerResult<()> {
        if let RunState::Idle = state {
            return self.clear();
        }

        let results = serde_json::to_string(state.results())?;
        self.store.set_many(&[
            (RESULTS_KEY, results),
            (ORDER_KEY, state.order().to_string()),
            (RUNNING_KEY, state.is_running().to_string()),
        ])
    }

    /// Delete the persisted record.
    pub fn clear(&self) -> RunnerResult<()> {
        self.store.delete_many(&[RESULTS_KEY, ORDER_KEY, RUNNING_KEY])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;

    fn repository() -> (Arc<MemoryKvStore>, RunStateRepository) {
        let store = Arc::new(MemoryKvStore::new());
        let repo = RunStateRepository::new(store.clone());
        (store, repo)
    }

    #[test]
    fn test_empty_store_is_idle() {
        let (_, repo) = repository();
        assert_eq!(repo.load(), RunState::Idle);
    }

    #[test]
    fn test_round_trip_marks_restored() {
        let (_, repo) = repository();
        let results = vec![TestResult::passed("/A"), TestResult::failed("/B", "nope")];
        repo.save(&RunState::Completed {
            order: 2,
            results: results.clone(),
            origin: Origin::Fresh,
        })
        .unwrap();

        let loaded = repo.load();
        assert_eq!(loaded.order(), 2);
        assert_eq!(loaded.results(), results.as_slice());
        assert!(!loaded.is_running());
        assert!(loaded.is_restored());
    }

    #[test]
    fn test_running_round_trip() {
        let (_, repo) = repository();
        repo.save(&RunState::Running {
            order: 4,
            origin: Origin::Fresh,
        })
        .unwrap();

        assert_eq!(
            repo.load(),
            RunState::Running {
                order: 4,
                origin: Origin::Restored
            }
        );
    }

    #[test]
    fn test_corrupt_results_reset_state() {
        let (store, repo) = repository();
        store.set_string(RESULTS_KEY, "[{\"path\": ").unwrap();
        store.set_int(ORDER_KEY, 3).unwrap();
        store.set_bool(RUNNING_KEY, true).unwrap();

        let state = repo.load();
        assert_eq!(state, RunState::Idle);
        assert_eq!(state.order(), 0);
        assert!(state.results().is_empty());
        assert!(!state.is_running());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_is_successful_rules() {
        let state = RunState::Completed {
            order: 1,
            results: vec![TestResult::passed("/A")],
            origin: Origin::Fresh,
        };
        assert!(state.is_successful(1));
        assert!(!state.is_successful(2));

        let empty = RunState::Completed {
            order: 1,
            results: Vec::new(),
            origin: Origin::Fresh,
        };
        assert!(!empty.is_successful(1));

        let failing = RunState::Completed {
            order: 1,
            results: vec![TestResult::passed("/A"), TestResult::failed("/B", "x")],
            origin: Origin::Fresh,
        };
        assert!(!failing.is_successful(1));
    }

    #[test]
    fn test_saving_idle_clears() {
        let (store, repo) = repository();
        repo.save(&RunState::Running {
            order: 1,
            origin: Origin::Fresh,
        })
        .unwrap();
        repo.save(&RunState::Idle).unwrap();
        assert!(store.entries().is_empty());
    }
}
