use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::storage::{decode, DocumentSink, DocumentSource, LoadError, Loaded};

/// An in-memory site: a source and a sink over the same set of documents.
#[derive(Debug, Default)]
pub struct MemorySite {
    files: Mutex<FxHashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemorySite {
    pub fn new() -> Self {
        MemorySite::default()
    }

    pub fn with<I, K, V>(files: I) -> Self
        where I: IntoIterator<Item = (K, V)>, K: Into<String>, V: Into<Vec<u8>>
    {
        let site = MemorySite::new();
        for (id, bytes) in files {
            site.insert(id, bytes);
        }

        site
    }

    pub fn insert<K: Into<String>, V: Into<Vec<u8>>>(&self, id: K, bytes: V) {
        self.files.lock().insert(id.into(), bytes.into());
    }

    /// The current content of `id`, if it exists and is UTF-8.
    pub fn get(&self, id: &str) -> Option<String> {
        let files = self.files.lock();
        files.get(id).and_then(|bytes| String::from_utf8(bytes.clone()).ok())
    }

    /// Every document id, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.files.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The number of stores that wrote something.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl DocumentSource for MemorySite {
    fn load(&self, id: &str) -> Result<Loaded, LoadError> {
        let bytes = self.files.lock().get(id).cloned();
        match bytes {
            Some(bytes) => decode(id, bytes),
            None => Err(LoadError::NotFound(id.into())),
        }
    }
}

impl DocumentSink for MemorySite {
    fn store(&self, id: &str, markup: &str) -> Result<bool> {
        let mut files = self.files.lock();
        if files.get(id).map_or(false, |bytes| bytes == markup.as_bytes()) {
            return Ok(false);
        }

        files.insert(id.into(), markup.as_bytes().to_vec());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }
}
