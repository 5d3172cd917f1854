//! Object cache for fetched documents and built WSDL definitions
//!
//! Entries are shared behind `Arc` so concurrent readers see the same
//! loaded object. A `put` only ever happens after a fully successful
//! fetch and parse, so a cancelled or failed load never publishes a
//! partial entry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::document::Document;
use crate::wsdl::Definitions;

/// A cached object.
#[derive(Clone)]
pub enum CacheEntry {
    Document(Arc<Document>),
    Definitions(Arc<Definitions>),
}

impl CacheEntry {
    pub fn document(&self) -> Option<Arc<Document>> {
        match self {
            CacheEntry::Document(d) => Some(Arc::clone(d)),
            _ => None,
        }
    }

    pub fn definitions(&self) -> Option<Arc<Definitions>> {
        match self {
            CacheEntry::Definitions(d) => Some(Arc::clone(d)),
            _ => None,
        }
    }
}

/// Cache of parsed documents and definitions, keyed by mangled id.
pub trait ObjectCache {
    fn get(&self, id: &str) -> Option<CacheEntry>;
    fn put(&self, id: &str, entry: CacheEntry);
}

/// A cache that stores nothing.
#[derive(Debug, Default)]
pub struct NoCache;

impl ObjectCache for NoCache {
    fn get(&self, _id: &str) -> Option<CacheEntry> {
        None
    }

    fn put(&self, _id: &str, _entry: CacheEntry) {}
}

/// An in-process cache. Reads are concurrent once a WSDL is loaded.
#[derive(Default)]
pub struct MemCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectCache for MemCache {
    fn get(&self, id: &str) -> Option<CacheEntry> {
        match self.entries.read() {
            Ok(entries) => entries.get(id).cloned(),
            Err(_) => None,
        }
    }

    fn put(&self, id: &str, entry: CacheEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(id.to_string(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memcache_roundtrip() {
        let cache = MemCache::new();
        let doc = Arc::new(Document::new());
        cache.put("k", CacheEntry::Document(Arc::clone(&doc)));
        let got = cache.get("k").and_then(|e| e.document()).unwrap();
        assert!(Arc::ptr_eq(&doc, &got));
    }

    #[test]
    fn test_entry_kind_mismatch() {
        let cache = MemCache::new();
        cache.put("k", CacheEntry::Document(Arc::new(Document::new())));
        assert!(cache.get("k").and_then(|e| e.definitions()).is_none());
    }

    #[test]
    fn test_nocache_stores_nothing() {
        let cache = NoCache;
        cache.put("k", CacheEntry::Document(Arc::new(Document::new())));
        assert!(cache.get("k").is_none());
    }
}
