use std::hash::Hash;

use hashbrown::HashMap;

/// Small least-recently-used map.
///
/// Eviction scans all entries, which is fine for the handful of spatial
/// indexes kept in memory at once.
#[derive(Debug)]
pub(crate) struct LruCache<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::with_capacity(capacity),
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Looks up `key` and marks it most recently used
    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.next_tick();
        let (value, last_used) = self.entries.get_mut(key)?;
        *last_used = tick;
        Some(value)
    }

    /// Inserts `value`, returning the key evicted to make room for it
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<K> {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            *entry = (value, tick);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (_, last_used))| *last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = &oldest {
                self.entries.remove(oldest);
            }
            oldest
        } else {
            None
        };

        self.entries.insert(key, (value, tick));
        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Keys from most to least recently used
    pub(crate) fn keys_by_recency(&self) -> Vec<K> {
        let mut keys: Vec<_> = self
            .entries
            .iter()
            .map(|(k, (_, last_used))| (k.clone(), *last_used))
            .collect();
        keys.sort_unstable_by(|a, b| b.1.cmp(&a.1));
        keys.into_iter().map(|(k, _)| k).collect()
    }
}
