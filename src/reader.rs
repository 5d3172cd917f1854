//! Document and definitions readers
//!
//! Load order is cache, then the in-memory document store, then the
//! transport. Cache ids mangle the URL through SHA-1 so unbounded names
//! stay fixed-width. Building the same WSDL is a critical section per
//! cache id, so two concurrent loads of one URL build it once.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::cache::CacheEntry;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::plugin::DocumentContext;
use crate::transport::Request;
use crate::wsdl::Definitions;
use crate::xsd::schema::SchemaLoader;

/// A stable cache id for a named object: `<sha1-hex>-<kind>`.
pub fn mangle(name: &str, kind: &str) -> String {
    let digest = Sha1::digest(name.as_bytes());
    let mut id = String::with_capacity(digest.len() * 2 + kind.len() + 1);
    for byte in digest {
        let _ = write!(id, "{byte:02x}");
    }
    id.push('-');
    id.push_str(kind);
    id
}

/// Per-cache-id build locks shared by all definitions readers.
static BUILD_LOCKS: Lazy<Mutex<HashMap<String, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn build_lock(id: &str) -> Arc<Mutex<()>> {
    let mut locks = BUILD_LOCKS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(locks.entry(id.to_string()).or_default())
}

/// Fetches and parses XML documents through the configured collaborators.
pub struct DocumentReader<'o> {
    options: &'o mut Options,
}

impl<'o> DocumentReader<'o> {
    pub fn new(options: &'o mut Options) -> Self {
        Self { options }
    }

    /// Open the document at a URL: cache, then store, then transport.
    pub fn open(&mut self, url: &str) -> Result<Arc<Document>> {
        let id = mangle(url, "document");
        if self.options.caching {
            if let Some(document) = self.options.cache.get(&id).and_then(|e| e.document()) {
                debug!(url, "document cache hit");
                return Ok(document);
            }
        }
        let bytes = self.fetch(url)?;
        let mut ctx = DocumentContext {
            url: url.to_string(),
            bytes,
            document: None,
        };
        self.options.plugins.loaded(&mut ctx);
        ctx.document = Some(Document::parse(&ctx.bytes)?);
        self.options.plugins.parsed(&mut ctx);
        let document = ctx
            .document
            .take()
            .ok_or_else(|| Error::Parse(format!("plugin discarded the document: {url}")))?;
        let document = Arc::new(document);
        if self.options.caching {
            self.options
                .cache
                .put(&id, CacheEntry::Document(Arc::clone(&document)));
        }
        Ok(document)
    }

    fn fetch(&mut self, url: &str) -> Result<Vec<u8>> {
        if let Some(bytes) = self.options.document_store.get(url) {
            debug!(url, "served from document store");
            return Ok(bytes.clone());
        }
        self.options.transport.open(&Request::new(url))
    }
}

impl SchemaLoader for DocumentReader<'_> {
    fn load(&mut self, location: &str) -> Result<Document> {
        self.open(location).map(|document| (*document).clone())
    }
}

/// Resolve a possibly relative location against a base URL.
pub fn resolve_location(base: &str, location: &str) -> Result<String> {
    match url::Url::parse(location) {
        Ok(absolute) => Ok(absolute.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = url::Url::parse(base)?;
            Ok(base.join(location)?.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// A schema loader that resolves import locations relative to the WSDL
/// they were referenced from.
struct WsdlLoader<'o> {
    reader: DocumentReader<'o>,
    base: String,
}

impl SchemaLoader for WsdlLoader<'_> {
    fn load(&mut self, location: &str) -> Result<Document> {
        let resolved = resolve_location(&self.base, location)?;
        self.reader.load(&resolved)
    }
}

/// Loads and caches parsed WSDL definitions.
pub struct DefinitionsReader<'o> {
    options: &'o mut Options,
}

impl<'o> DefinitionsReader<'o> {
    pub fn new(options: &'o mut Options) -> Self {
        Self { options }
    }

    pub fn open(&mut self, url: &str) -> Result<Arc<Definitions>> {
        let id = mangle(url, "wsdl");
        if let Some(definitions) = self.cached(&id) {
            debug!(url, "definitions cache hit");
            return Ok(definitions);
        }
        let lock = build_lock(&id);
        let _guard = lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another reader may have completed the build while we waited.
        if let Some(definitions) = self.cached(&id) {
            return Ok(definitions);
        }
        let document = DocumentReader::new(self.options).open(url)?;
        let mut loader = WsdlLoader {
            reader: DocumentReader::new(self.options),
            base: url.to_string(),
        };
        let definitions = Definitions::parse(&document, url, &mut loader)?;
        let definitions = Arc::new(definitions);
        if self.options.caching {
            self.options
                .cache
                .put(&id, CacheEntry::Definitions(Arc::clone(&definitions)));
        }
        Ok(definitions)
    }

    fn cached(&self, id: &str) -> Option<Arc<Definitions>> {
        if !self.options.caching {
            return None;
        }
        self.options.cache.get(id).and_then(|e| e.definitions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_is_stable_and_kinded() {
        let a = mangle("http://example.com/x?wsdl", "wsdl");
        let b = mangle("http://example.com/x?wsdl", "wsdl");
        let c = mangle("http://example.com/x?wsdl", "document");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with("-wsdl"));
        assert_eq!(a.len(), 40 + 1 + 4);
    }

    #[test]
    fn test_store_beats_transport() {
        let mut options = Options::new()
            .with_document("mem://a.xml", b"<a/>".to_vec())
            .with_caching(false);
        let document = DocumentReader::new(&mut options).open("mem://a.xml").unwrap();
        assert_eq!(document.root().map(|r| r.name.as_str()), Some("a"));
    }

    #[test]
    fn test_resolve_location() {
        let base = "http://example.com/svc/service.wsdl";
        assert_eq!(
            resolve_location(base, "types.xsd").unwrap(),
            "http://example.com/svc/types.xsd"
        );
        assert_eq!(
            resolve_location(base, "http://other.com/a.xsd").unwrap(),
            "http://other.com/a.xsd"
        );
    }

    #[test]
    fn test_definitions_cached_by_url() {
        let wsdl = crate::wsdl::tests::PRICE_WSDL.as_bytes().to_vec();
        let mut options = Options::new().with_document("mem://price.wsdl", wsdl);
        let first = DefinitionsReader::new(&mut options).open("mem://price.wsdl").unwrap();
        // Emptying the store proves the second open is served by the cache.
        options.document_store.clear();
        let second = DefinitionsReader::new(&mut options).open("mem://price.wsdl").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
