use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat string key-value storage that survives between ticks.
///
/// Writes are not transactional across keys. Anything read back through this
/// trait must tolerate a partially written tick and be rebuilt on decode failure.
pub trait MemoryStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String);

    fn remove(&mut self, key: &str);

    /// Keys beginning with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct InMemoryStore {
    data: BTreeMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl MemoryStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.data.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.data
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Join key segments with the `.` separator used for memory paths.
pub fn memory_path(segments: &[&str]) -> String {
    segments.join(".")
}
