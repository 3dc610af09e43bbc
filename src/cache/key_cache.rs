use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use jsonwebtoken::DecodingKey;

/// One fetched key set: key id -> verification key.
pub struct KeySet {
    pub keys: HashMap<String, DecodingKey>,
    pub fetched_at: i64, // UNIX TIMESTAMP
}

impl KeySet {
    pub fn new(keys: HashMap<String, DecodingKey>, fetched_at: i64) -> Self {
        Self { keys, fetched_at }
    }

    pub fn empty() -> Self {
        Self::new(HashMap::new(), 0)
    }

    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySet")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

/// Key set cache owned by one resolver. Never evicts single entries;
/// a refresh swaps the whole set.
#[derive(Debug)]
pub struct JwksCache {
    inner: RwLock<Arc<KeySet>>,
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new()
    }
}

impl JwksCache {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Arc::new(KeySet::empty())) }
    }

    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.snapshot().get(kid).cloned()
    }

    pub fn snapshot(&self) -> Arc<KeySet> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn replace(&self, key_set: Arc<KeySet>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = key_set;
    }

    pub fn fetched_at(&self) -> i64 {
        self.snapshot().fetched_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_swaps_the_whole_set() {
        let cache = JwksCache::new();
        assert!(cache.get("k1").is_none());

        let mut first = HashMap::new();
        first.insert("k1".to_string(), DecodingKey::from_secret(b"one"));
        cache.replace(Arc::new(KeySet::new(first, 10)));
        assert!(cache.get("k1").is_some());
        assert_eq!(cache.fetched_at(), 10);

        let mut second = HashMap::new();
        second.insert("k2".to_string(), DecodingKey::from_secret(b"two"));
        cache.replace(Arc::new(KeySet::new(second, 20)));
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert_eq!(cache.snapshot().len(), 1);
    }
}
