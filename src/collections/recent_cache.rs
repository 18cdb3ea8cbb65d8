use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Bounded least-recently-used cache.
///
/// Recency is a monotonically increasing tick per access; the ordered tick
/// map makes both eviction and oldest-first iteration `O(log n)` per entry.
#[derive(Debug, Clone)]
pub struct RecentViewCache<K, V> {
    capacity: usize,
    entries: HashMap<K, (V, u64)>,
    recency: BTreeMap<u64, K>,
    tick: u64,
}

impl<K, V> RecentViewCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// A capacity of zero keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
            tick: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.next_tick();
        let (_, last_used) = self.entries.get_mut(key)?;
        self.recency.remove(&*last_used);
        self.recency.insert(tick, key.clone());
        *last_used = tick;

        self.entries.get(key).map(|(value, _)| value)
    }

    /// Insert or overwrite `key`, returning any evicted entry.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.capacity == 0 {
            return None;
        }

        let tick = self.next_tick();
        if let Some((existing, last_used)) = self.entries.get_mut(&key) {
            *existing = value;
            self.recency.remove(&*last_used);
            self.recency.insert(tick, key);
            *last_used = tick;
            return None;
        }

        self.entries.insert(key.clone(), (value, tick));
        self.recency.insert(tick, key);

        if self.entries.len() > self.capacity {
            return self.evict_oldest();
        }
        None
    }

    /// Replace the value of a cached key without touching its recency.
    /// Returns `false`, storing nothing, when `key` is not cached.
    pub fn refresh(&mut self, key: &K, value: V) -> bool {
        match self.entries.get_mut(key) {
            Some((existing, _)) => {
                *existing = value;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached values, least recently used first.
    pub fn recent(&self) -> Vec<&V> {
        self.recency
            .values()
            .filter_map(|key| self.entries.get(key).map(|(value, _)| value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) -> Option<(K, V)> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key).map(|(value, _)| (key, value))
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
