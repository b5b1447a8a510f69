use log::debug;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Session-scoped memo of LLM responses keyed by a digest of their inputs.
///
/// Owned by whoever drives the pipeline and passed in explicitly. Entries are
/// never evicted.
#[derive(Debug, Default, Clone)]
pub struct MemoStore {
    entries: HashMap<String, String>,
    hits: u64,
    misses: u64,
}

impl MemoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hex SHA-256 over the parts, each length-prefixed so that
    /// `("ab", "c")` and `("a", "bc")` differ.
    pub fn key(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    /// Return the cached value for `parts`, or compute and remember it.
    /// Failed computations are not cached.
    pub fn get_or_try_insert_with<E, F>(&mut self, parts: &[&str], compute: F) -> Result<String, E>
    where
        F: FnOnce() -> Result<String, E>,
    {
        let key = Self::key(parts);
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            debug!("memo hit {}", &key[..12]);
            return Ok(hit.clone());
        }
        self.misses += 1;
        debug!("memo miss {}", &key[..12]);
        let value = compute()?;
        self.entries.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
