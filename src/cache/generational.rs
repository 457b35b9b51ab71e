//! Read-frequency cache with generational decay.
//!
//! Each entry owns a slot in `[0, capacity)`; slots are recycled on eviction.
//! Reads are counted per slot in two arrays, the current generation and the
//! previous one. Every [`GENERATION`] reads (hits and misses both count) the
//! current counts become the previous counts and a fresh current generation
//! starts, so an entry's score decays once it stops being read.
//!
//! At capacity, inserting a new key evicts the entry with the lowest score
//! (current + previous reads), ties broken by earliest creation. The ranking
//! heap is maintained lazily: reads push a fresh entry and stale ones are
//! skipped when popped.

use crate::cache::Cache;
use crate::cache::flush::{FlushTask, spawn_flush_task};
use crate::error::MapperResult;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Reads per generation.
pub const GENERATION: usize = 10;

struct Entry<V> {
    value: V,
    slot: usize,
    /// Creation order within this cache; breaks score ties.
    ordinal: u64,
}

/// (score, ordinal, slot), min-first through `Reverse`.
type Rank = Reverse<(u64, u64, usize)>;

struct GenerationalState<K, V> {
    entries: HashMap<K, Entry<V>>,
    slot_keys: Vec<Option<K>>,
    free_slots: Vec<usize>,
    current_reads: Vec<u32>,
    previous_reads: Vec<u32>,
    ranking: BinaryHeap<Rank>,
    read_count: usize,
    next_ordinal: u64,
}

impl<K: Eq + Hash + Clone, V> GenerationalState<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            slot_keys: vec![None; capacity],
            free_slots: (0..capacity).rev().collect(),
            current_reads: vec![0; capacity],
            previous_reads: vec![0; capacity],
            ranking: BinaryHeap::with_capacity(capacity),
            read_count: 0,
            next_ordinal: 0,
        }
    }

    fn score(&self, slot: usize) -> u64 {
        u64::from(self.current_reads[slot]) + u64::from(self.previous_reads[slot])
    }

    fn is_current(&self, &Reverse((score, ordinal, slot)): &Rank) -> bool {
        self.slot_keys[slot]
            .as_ref()
            .and_then(|key| self.entries.get(key))
            .is_some_and(|entry| entry.ordinal == ordinal && self.score(slot) == score)
    }

    fn rebuild_ranking(&mut self) {
        let ranks: Vec<Rank> = self
            .entries
            .values()
            .map(|entry| Reverse((self.score(entry.slot), entry.ordinal, entry.slot)))
            .collect();
        self.ranking = BinaryHeap::from(ranks);
    }

    fn rotate_generation(&mut self) {
        std::mem::swap(&mut self.current_reads, &mut self.previous_reads);
        self.current_reads.fill(0);
        self.read_count = 0;
        self.rebuild_ranking();
    }

    fn evict_lowest(&mut self) {
        if self.ranking.is_empty() {
            self.rebuild_ranking();
        }
        while let Some(rank) = self.ranking.pop() {
            if !self.is_current(&rank) {
                continue;
            }
            let Reverse((_, _, slot)) = rank;
            if let Some(key) = self.slot_keys[slot].take() {
                self.entries.remove(&key);
                self.free_slots.push(slot);
            }
            return;
        }
    }

    fn clear(&mut self) {
        let capacity = self.slot_keys.len();
        self.entries.clear();
        self.slot_keys.iter_mut().for_each(|key| *key = None);
        self.free_slots = (0..capacity).rev().collect();
        self.current_reads.fill(0);
        self.previous_reads.fill(0);
        self.ranking.clear();
        self.read_count = 0;
    }
}

pub struct GenerationalCache<K, V> {
    state: Arc<Mutex<GenerationalState<K, V>>>,
    capacity: usize,
    _flush_task: Option<FlushTask>,
}

impl<K, V> GenerationalCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// A cache without a TTL timer.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Arc::new(Mutex::new(GenerationalState::new(capacity))),
            capacity,
            _flush_task: None,
        }
    }

    /// A cache fully reset every `ttl`. Must be called within a tokio runtime.
    ///
    /// Fails with a configuration error when `ttl` is zero.
    pub fn with_ttl(capacity: usize, ttl: Duration) -> MapperResult<Self> {
        let mut cache = Self::new(capacity);
        let flush: fn(&Mutex<GenerationalState<K, V>>) = |state| state.lock().clear();
        cache._flush_task = Some(spawn_flush_task(Arc::downgrade(&cache.state), ttl, flush)?);
        Ok(cache)
    }

    /// Reads counted in the current generation so far.
    pub fn generation_reads(&self) -> usize {
        self.state.lock().read_count
    }
}

impl<K, V> Cache<K, V> for GenerationalCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn set(&self, key: K, value: V) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            return;
        }
        if state.entries.len() >= self.capacity {
            state.evict_lowest();
        }
        let Some(slot) = state.free_slots.pop() else {
            return;
        };

        let ordinal = state.next_ordinal;
        state.next_ordinal += 1;
        state.current_reads[slot] = 0;
        state.previous_reads[slot] = 0;
        state.slot_keys[slot] = Some(key.clone());
        state.entries.insert(
            key,
            Entry {
                value,
                slot,
                ordinal,
            },
        );
        state.ranking.push(Reverse((0, ordinal, slot)));
    }

    fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.read_count == GENERATION {
            state.rotate_generation();
        }
        state.read_count += 1;

        let (slot, ordinal, value) = {
            let entry = state.entries.get(key)?;
            (entry.slot, entry.ordinal, entry.value.clone())
        };
        state.current_reads[slot] = state.current_reads[slot].saturating_add(1);
        let score = state.score(slot);
        state.ranking.push(Reverse((score, ordinal, slot)));
        Some(value)
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
