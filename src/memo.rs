//! Optional memoization in front of the simulators
//!
//! Results are keyed by the operation name and the canonical encoding of the
//! full parameter mapping. Concurrent requests for the same key wait on one
//! computation instead of repeating it. Failed computations are not cached,
//! so the next request for that key runs again. The number of keys is
//! bounded; once full, the oldest key is evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::params::{ParameterKey, ParameterSet};
use crate::series::ResultSeries;

/// Entries kept when no capacity is configured
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

type Key = (&'static str, ParameterKey);
type Slot = Arc<OnceCell<Arc<ResultSeries>>>;

/// Slots plus their insertion order, oldest first
#[derive(Debug, Default)]
struct Slots {
    map: HashMap<Key, Slot>,
    order: VecDeque<Key>,
}

impl Slots {
    fn remove(&mut self, key: &Key) {
        self.map.remove(key);
        self.order.retain(|queued| queued != key);
    }
}

#[derive(Debug)]
pub struct SimulationCache {
    slots: Mutex<Slots>,
    max_entries: usize,
    computations: AtomicUsize,
    evictions: AtomicUsize,
}

impl Default for SimulationCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl SimulationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `max_entries` keys; the oldest key goes first
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            max_entries: max_entries.max(1),
            computations: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Return the cached result for `(operation, params)`, computing it at most once
    pub async fn get_or_compute<F>(
        &self,
        operation: &'static str,
        params: &ParameterSet,
        compute: F,
    ) -> Result<Arc<ResultSeries>>
    where
        F: FnOnce(&ParameterSet) -> Result<ResultSeries>,
    {
        self.get_or_compute_keyed(operation, params.key(), params, compute).await
    }

    /// Like [`get_or_compute`](Self::get_or_compute) with a caller-chosen key,
    /// so inputs an operation never reads do not split its entries
    pub async fn get_or_compute_keyed<F>(
        &self,
        operation: &'static str,
        key: ParameterKey,
        params: &ParameterSet,
        compute: F,
    ) -> Result<Arc<ResultSeries>>
    where
        F: FnOnce(&ParameterSet) -> Result<ResultSeries>,
    {
        let key = (operation, key);
        let slot = self.slot(&key);

        let outcome = slot
            .get_or_try_init(|| async move {
                self.computations.fetch_add(1, Ordering::Relaxed);
                compute(params).map(Arc::new)
            })
            .await;
        match outcome {
            Ok(series) => Ok(Arc::clone(series)),
            Err(err) => {
                self.discard_failed(&key, &slot);
                Err(err)
            }
        }
    }

    fn slot(&self, key: &Key) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.map.get(key) {
            return Arc::clone(slot);
        }
        while slots.map.len() >= self.max_entries {
            let Some(oldest) = slots.order.pop_front() else {
                break;
            };
            slots.map.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log::debug!("evicted cached {} result", oldest.0);
        }
        let slot = Slot::default();
        slots.map.insert(key.clone(), Arc::clone(&slot));
        slots.order.push_back(key.clone());
        slot
    }

    /// Drop the slot of a failed computation unless a retry already filled or replaced it
    fn discard_failed(&self, key: &Key, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let stale = slots
            .map
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            slots.remove(key);
        }
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times a simulator was actually invoked
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    /// Number of keys dropped to stay within capacity
    pub fn evictions(&self) -> usize {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.map.clear();
        slots.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SimError, ValidationError};
    use crate::params::ParameterKind;
    use crate::policy::PolicySimulator;

    fn params(adoption: f64) -> ParameterSet {
        ParameterSet::from_pairs(
            ParameterKind::Policy,
            &[("adoption_rate", adoption), ("ev_growth_rate", 0.02), ("horizon_years", 5.0)],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_identical_requests_compute_once() {
        let cache = SimulationCache::new();
        let sim = PolicySimulator::default();
        let p = params(0.1);

        let (a, b, c) = tokio::join!(
            cache.get_or_compute("project", &p, |p| sim.project(p)),
            cache.get_or_compute("project", &p, |p| sim.project(p)),
            cache.get_or_compute("project", &p, |p| sim.project(p)),
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
        assert_eq!(cache.computations(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_share_one_result() {
        let cache = Arc::new(SimulationCache::new());
        let p = params(0.2);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let p = p.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute("project", &p, |p| PolicySimulator::default().project(p))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(cache.computations(), 1);
    }

    #[tokio::test]
    async fn test_distinct_inputs_and_operations_are_separate() {
        let cache = SimulationCache::new();
        let sim = PolicySimulator::default();
        cache.get_or_compute("project", &params(0.1), |p| sim.project(p)).await.unwrap();
        cache.get_or_compute("project", &params(0.3), |p| sim.project(p)).await.unwrap();
        cache.get_or_compute("other", &params(0.1), |p| sim.project(p)).await.unwrap();
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.computations(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = SimulationCache::new();
        let p = params(0.1);
        let failure = || -> Result<ResultSeries> {
            Err(SimError::Validation(ValidationError::Missing {
                parameter: "adoption_rate".into(),
            }))
        };
        assert!(cache.get_or_compute("project", &p, |_| failure()).await.is_err());
        let series = cache
            .get_or_compute("project", &p, |p| PolicySimulator::default().project(p))
            .await
            .unwrap();
        assert_eq!(series.len(), 6);
        assert_eq!(cache.computations(), 2);
    }

    #[tokio::test]
    async fn test_failed_computation_leaves_no_slot() {
        let cache = SimulationCache::new();
        let result = cache
            .get_or_compute("project", &params(0.1), |_| {
                Err(SimError::Validation(ValidationError::Missing {
                    parameter: "adoption_rate".into(),
                }))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_bounds_distinct_inputs() {
        let cache = SimulationCache::with_capacity(16);
        let sim = PolicySimulator::default();
        for step in 0..1000 {
            let p = params(step as f64 / 1000.0);
            cache.get_or_compute("project", &p, |p| sim.project(p)).await.unwrap();
        }
        assert_eq!(cache.len(), 16);
        assert_eq!(cache.evictions(), 1000 - 16);

        // newest entries survive, oldest were evicted
        let before = cache.computations();
        cache.get_or_compute("project", &params(0.999), |p| sim.project(p)).await.unwrap();
        assert_eq!(cache.computations(), before);
        cache.get_or_compute("project", &params(0.0), |p| sim.project(p)).await.unwrap();
        assert_eq!(cache.computations(), before + 1);
        assert_eq!(cache.len(), 16);
    }

    #[tokio::test]
    async fn test_caller_key_shares_entries() {
        let cache = SimulationCache::new();
        let sim = PolicySimulator::default();
        let short = params(0.1);
        let long = ParameterSet::from_pairs(
            ParameterKind::Policy,
            &[("adoption_rate", 0.1), ("ev_growth_rate", 0.02), ("horizon_years", 9.0)],
        )
        .unwrap();
        let key = short.key_for(&["adoption_rate"]);
        assert_eq!(key, long.key_for(&["adoption_rate"]));

        let first = cache
            .get_or_compute_keyed("project", key.clone(), &short, |p| sim.project(p))
            .await
            .unwrap();
        let second = cache
            .get_or_compute_keyed("project", key, &long, |p| sim.project(p))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.computations(), 1);
    }
}
