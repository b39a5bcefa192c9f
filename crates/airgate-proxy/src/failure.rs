//! Per-account transient failure memory
//!
//! An account that failed recently is skipped by selection while any
//! healthier candidate exists. Entries are never swept: a record simply stops
//! mattering once it is older than the window, and a later success clears it.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Default suppression window for a failed account
pub const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
pub struct FailureTracker {
    window: Duration,
    failures: Mutex<HashMap<u64, SystemTime>>,
}

impl FailureTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    pub fn is_failed(&self, account_id: u64) -> bool {
        self.is_failed_at(account_id, SystemTime::now())
    }

    /// Whether the account's last failure is still inside the window at `now`
    pub fn is_failed_at(&self, account_id: u64, now: SystemTime) -> bool {
        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);

        failures
            .get(&account_id)
            .is_some_and(|&failed_at| self.within_window(failed_at, now))
    }

    pub fn add_failed(&self, account_id: u64) {
        self.add_failed_at(account_id, SystemTime::now());
    }

    pub fn add_failed_at(&self, account_id: u64, now: SystemTime) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account_id, now);
    }

    pub fn remove_failed(&self, account_id: u64) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&account_id);
    }

    /// Currently suppressed accounts with their failure time, ordered by id
    pub fn failed_accounts(&self) -> Vec<(u64, SystemTime)> {
        self.failed_accounts_at(SystemTime::now())
    }

    pub fn failed_accounts_at(&self, now: SystemTime) -> Vec<(u64, SystemTime)> {
        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);

        let mut suppressed: Vec<_> = failures
            .iter()
            .filter(|&(_, &failed_at)| self.within_window(failed_at, now))
            .map(|(&id, &failed_at)| (id, failed_at))
            .collect();
        drop(failures);

        suppressed.sort_unstable_by_key(|&(id, _)| id);
        suppressed
    }

    fn within_window(&self, failed_at: SystemTime, now: SystemTime) -> bool {
        // a failure stamped after `now` counts as just happened
        match now.duration_since(failed_at) {
            Ok(elapsed) => elapsed < self.window,
            Err(_) => true,
        }
    }
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_WINDOW)
    }
}
