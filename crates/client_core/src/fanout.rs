//! Fan-out/fan-in aggregation of per-key list fetches into one view.
//!
//! Every [`FanOut::begin`] starts a new epoch. Results carry the epoch they
//! were dispatched under, so a late result from a superseded group can never
//! decrement the outstanding count of the current one.

use std::collections::{BTreeMap, BTreeSet};

use crate::{error::Failure, remote::Remote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanIn {
    /// Stale epoch, unknown key, duplicate key, or group already settled.
    Discarded,
    Pending { remaining: usize },
    Complete { total: usize },
    Aborted(Failure),
}

#[derive(Debug, Clone)]
pub struct FanOut<K, T> {
    epoch: Epoch,
    expected: BTreeSet<K>,
    per_key_results: BTreeMap<K, Vec<T>>,
    pending: usize,
    view: Remote<Vec<T>>,
}

impl<K, T> Default for FanOut<K, T> {
    fn default() -> Self {
        Self {
            epoch: Epoch::default(),
            expected: BTreeSet::new(),
            per_key_results: BTreeMap::new(),
            pending: 0,
            view: Remote::NotAsked,
        }
    }
}

impl<K: Ord + Copy, T: Clone> FanOut<K, T> {
    /// Resets the group and returns the new epoch plus the keys to fetch.
    /// An empty key set settles immediately as `Loaded([])`.
    pub fn begin(&mut self, keys: impl IntoIterator<Item = K>) -> (Epoch, Vec<K>) {
        self.epoch = self.epoch.next();
        self.expected = keys.into_iter().collect();
        self.per_key_results.clear();
        self.pending = self.expected.len();
        self.view = if self.pending == 0 {
            Remote::Loaded(Vec::new())
        } else {
            Remote::Loading
        };
        (self.epoch, self.expected.iter().copied().collect())
    }

    pub fn accept(&mut self, epoch: Epoch, key: K, result: Result<Vec<T>, Failure>) -> FanIn {
        if epoch != self.epoch || self.pending == 0 || !self.expected.contains(&key) {
            return FanIn::Discarded;
        }
        if self.per_key_results.contains_key(&key) {
            return FanIn::Discarded;
        }

        match result {
            Ok(items) => {
                self.per_key_results.insert(key, items);
                self.pending -= 1;
                if self.pending > 0 {
                    return FanIn::Pending {
                        remaining: self.pending,
                    };
                }
                let merged: Vec<T> = self
                    .per_key_results
                    .values()
                    .flat_map(|items| items.iter().cloned())
                    .collect();
                let total = merged.len();
                self.view = Remote::Loaded(merged);
                FanIn::Complete { total }
            }
            Err(failure) => {
                self.pending = 0;
                self.per_key_results.clear();
                self.view = Remote::Failed(failure.clone());
                FanIn::Aborted(failure)
            }
        }
    }

    /// Drops the group and advances the epoch so in-flight results are
    /// discarded on arrival.
    pub fn invalidate(&mut self) {
        self.epoch = self.epoch.next();
        self.expected.clear();
        self.per_key_results.clear();
        self.pending = 0;
        self.view = Remote::NotAsked;
    }
}

impl<K, T> FanOut<K, T> {
    pub fn view(&self) -> &Remote<Vec<T>> {
        &self.view
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn pending(&self) -> usize {
        self.pending
    }
}

#[cfg(test)]
#[path = "tests/fanout_tests.rs"]
mod tests;
