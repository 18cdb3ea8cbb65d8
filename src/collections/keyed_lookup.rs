/// Bucket count used by [`KeyedLookup::new`].
pub const DEFAULT_BUCKETS: usize = 100;

/// Only this many leading characters participate in the bucket hash.
const HASHED_PREFIX_CHARS: usize = 100;

const HASH_BASE: u64 = 31;

/// String-keyed hash table with separate chaining.
///
/// Keys map to a bucket through a base-31 polynomial rolling hash reduced
/// modulo the bucket count. Colliding keys share a bucket and are found by a
/// linear scan, so nothing is ever evicted.
#[derive(Debug, Clone)]
pub struct KeyedLookup<V> {
    buckets: Vec<Vec<(String, V)>>,
    len: usize,
}

impl<V> KeyedLookup<V> {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// A bucket count of zero is treated as one.
    pub fn with_buckets(buckets: usize) -> Self {
        let buckets = buckets.max(1);
        Self {
            buckets: (0..buckets).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket index for `key`.
    pub fn bucket_for(&self, key: &str) -> usize {
        bucket_index(key, self.buckets.len())
    }

    /// Store `value` under `key`, returning the value it replaced.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        let index = self.bucket_for(&key);
        let bucket = &mut self.buckets[index];

        if let Some(slot) = bucket.iter_mut().find(|(existing, _)| *existing == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }

        bucket.push((key, value));
        self.len += 1;
        None
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.buckets[self.bucket_for(key)]
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let index = self.bucket_for(key);
        self.buckets[index]
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Values in bucket order, then insertion order within a bucket.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter().map(|(_, value)| value))
    }
}

impl<V> Default for KeyedLookup<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket_index(key: &str, buckets: usize) -> usize {
    let modulus = buckets as u64;
    let hash = key
        .chars()
        .take(HASHED_PREFIX_CHARS)
        .fold(0u64, |hash, ch| (hash * HASH_BASE + ch as u64) % modulus);
    hash as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_inserted_values() {
        let mut lookup = KeyedLookup::new();
        lookup.set("app-001", "Jane");
        lookup.set("app-002", "Ravi");

        assert_eq!(lookup.get("app-001"), Some(&"Jane"));
        assert_eq!(lookup.get("app-002"), Some(&"Ravi"));
        assert_eq!(lookup.get("app-404"), None);
        assert_eq!(lookup.len(), 2);
    }

    #[test]
    fn set_overwrites_existing_keys() {
        let mut lookup = KeyedLookup::new();
        assert_eq!(lookup.set("app-001", 1), None);
        assert_eq!(lookup.set("app-001", 2), Some(1));

        assert_eq!(lookup.get("app-001"), Some(&2));
        assert_eq!(lookup.len(), 1);
    }

    #[test]
    fn colliding_keys_share_a_bucket_without_eviction() {
        let mut lookup = KeyedLookup::with_buckets(1);
        for index in 0..50 {
            lookup.set(format!("key-{index}"), index);
        }

        for index in 0..50 {
            assert_eq!(lookup.get(&format!("key-{index}")), Some(&index));
        }
        assert_eq!(lookup.values().count(), 50);
    }

    #[test]
    fn hash_is_a_base_31_polynomial_over_the_bucket_count() {
        let lookup: KeyedLookup<()> = KeyedLookup::with_buckets(100);
        // ((0 * 31 + 'a') * 31 + 'b') % 100, reduced each step
        let expected = ((97 % 100) * 31 + 98) % 100;
        assert_eq!(lookup.bucket_for("ab"), expected as usize);
        assert_eq!(lookup.bucket_for(""), 0);
    }

    #[test]
    fn only_the_first_hundred_characters_are_hashed() {
        let lookup: KeyedLookup<()> = KeyedLookup::with_buckets(97);
        let prefix = "x".repeat(100);
        let left = format!("{prefix}left");
        let right = format!("{prefix}right");

        assert_eq!(lookup.bucket_for(&left), lookup.bucket_for(&right));
    }

    #[test]
    fn long_keys_remain_distinct_when_prefixes_match() {
        let mut lookup = KeyedLookup::new();
        let prefix = "y".repeat(120);
        lookup.set(format!("{prefix}-a"), 'a');
        lookup.set(format!("{prefix}-b"), 'b');

        assert_eq!(lookup.get(&format!("{prefix}-a")), Some(&'a'));
        assert_eq!(lookup.get(&format!("{prefix}-b")), Some(&'b'));
    }

    #[test]
    fn zero_buckets_falls_back_to_one() {
        let mut lookup = KeyedLookup::with_buckets(0);
        lookup.set("only", 7);
        assert_eq!(lookup.bucket_count(), 1);
        assert_eq!(lookup.get("only"), Some(&7));
    }
}
