//! Scan result cache
//!
//! Keeps recent OCR results keyed by the SHA-256 of the image bytes, so a
//! re-uploaded image is not sent through the engine again.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::ocr::OcrResult;

/// Compute SHA-256 hash of data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// LRU cache of OCR results
pub struct ScanCache {
    /// `None` when caching is disabled
    entries: Option<Mutex<LruCache<String, OcrResult>>>,
}

impl ScanCache {
    /// Create a cache holding up to `capacity` results (0 disables caching)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn get(&self, key: &str) -> Option<OcrResult> {
        self.entries.as_ref()?.lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, result: OcrResult) {
        if let Some(entries) = &self.entries {
            entries.lock().put(key, result);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map(|e| e.lock().len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrProvider;

    fn result(text: &str) -> OcrResult {
        OcrResult {
            text: text.to_string(),
            confidence: 80.0,
            provider: OcrProvider::Tesseract,
        }
    }

    #[test]
    fn test_compute_hash() {
        assert_eq!(
            compute_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_evicts_least_recent() {
        let cache = ScanCache::with_capacity(2);
        cache.insert("a".to_string(), result("one"));
        cache.insert("b".to_string(), result("two"));
        assert!(cache.get("a").is_some()); // a is now most recent
        cache.insert("c".to_string(), result("three"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").unwrap().text, "one");
    }

    #[test]
    fn test_disabled_cache() {
        let cache = ScanCache::with_capacity(0);
        assert!(!cache.is_enabled());
        cache.insert("a".to_string(), result("one"));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }
}
