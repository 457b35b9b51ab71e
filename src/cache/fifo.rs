//! Insertion-ordered cache.
//!
//! When an insert pushes the size past capacity, the oldest inserted entry is
//! evicted. Reads never change the order, and overwriting a key keeps its
//! original position.

use crate::cache::Cache;
use crate::cache::flush::{FlushTask, spawn_flush_task};
use crate::error::MapperResult;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

struct FifoState<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V> FifoState<K, V> {
    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

pub struct FifoCache<K, V> {
    state: Arc<Mutex<FifoState<K, V>>>,
    capacity: usize,
    _flush_task: Option<FlushTask>,
}

impl<K, V> FifoCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// A cache without a TTL timer.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Arc::new(Mutex::new(FifoState {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            })),
            capacity,
            _flush_task: None,
        }
    }

    /// A cache fully cleared every `ttl`. Must be called within a tokio runtime.
    ///
    /// Fails with a configuration error when `ttl` is zero.
    pub fn with_ttl(capacity: usize, ttl: Duration) -> MapperResult<Self> {
        let mut cache = Self::new(capacity);
        let flush: fn(&Mutex<FifoState<K, V>>) = |state| state.lock().clear();
        cache._flush_task = Some(spawn_flush_task(Arc::downgrade(&cache.state), ttl, flush)?);
        Ok(cache)
    }
}

impl<K, V> Cache<K, V> for FifoCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn set(&self, key: K, value: V) {
        let mut state = self.state.lock();
        if let Some(existing) = state.entries.get_mut(&key) {
            *existing = value;
            return;
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, value);
        while state.entries.len() > self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.state.lock().entries.get(key).cloned()
    }

    fn flush(&self) {
        self.state.lock().clear();
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
