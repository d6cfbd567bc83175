//! Shared extraction cache keyed by document fingerprint.

use super::{ExtractedText, ExtractionError, TextExtractor};
use crate::processing::Document;
use async_trait::async_trait;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::UNIX_EPOCH;
use tokio::sync::OnceCell;

/// Identity of a document on disk: path, size and modification time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentFingerprint(String);

impl DocumentFingerprint {
    /// Hash the identifying attributes of `document`.
    pub fn of(document: &Document) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(document.path().to_string_lossy().as_bytes());
        hasher.update(document.byte_size().to_le_bytes());
        let modified_nanos = document
            .modified()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);
        hasher.update(modified_nanos.to_le_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex-encoded digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Number of documents kept when no capacity is given.
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Decorator that extracts each distinct fingerprint at most once.
///
/// Concurrent callers for the same fingerprint wait on a single extraction. Failures are not
/// cached, so a later call retries. At most `capacity` documents are retained; the least
/// recently used one is evicted first.
pub struct CachingExtractor<E> {
    inner: E,
    entries: Mutex<LruCache<DocumentFingerprint, Arc<OnceCell<ExtractedText>>>>,
}

impl<E> CachingExtractor<E> {
    /// Wrap `inner` with an empty cache of [`DEFAULT_CACHE_CAPACITY`] entries.
    pub fn new(inner: E) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::with_capacity(inner, capacity)
    }

    /// Wrap `inner` with an empty cache holding at most `capacity` documents.
    pub fn with_capacity(inner: E, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<DocumentFingerprint, Arc<OnceCell<ExtractedText>>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cell_for(&self, fingerprint: DocumentFingerprint) -> Arc<OnceCell<ExtractedText>> {
        self.entries()
            .get_or_insert(fingerprint, || Arc::new(OnceCell::new()))
            .clone()
    }

    fn forget(&self, fingerprint: &DocumentFingerprint, cell: &Arc<OnceCell<ExtractedText>>) {
        let mut entries = self.entries();
        // A newer cell may already sit under this key after an eviction.
        if entries
            .peek(fingerprint)
            .is_some_and(|current| Arc::ptr_eq(current, cell) && !current.initialized())
        {
            entries.pop(fingerprint);
        }
    }

    /// Number of documents currently tracked.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the cache tracks no document.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<E> TextExtractor for CachingExtractor<E>
where
    E: TextExtractor,
{
    async fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError> {
        let fingerprint = DocumentFingerprint::of(document);
        let cell = self.cell_for(fingerprint.clone());
        if cell.initialized() {
            tracing::debug!(fingerprint = fingerprint.as_str(), "Extraction cache hit");
        }
        match cell.get_or_try_init(|| self.inner.extract(document)).await {
            Ok(extracted) => Ok(extracted.clone()),
            Err(error) => {
                self.forget(&fingerprint, &cell);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingExtractor {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl TextExtractor for CountingExtractor {
        async fn extract(&self, _document: &Document) -> Result<ExtractedText, ExtractionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && call == 0 {
                return Err(ExtractionError::Malformed("first call fails".into()));
            }
            Ok(ExtractedText {
                text: "cached".into(),
                page_count: 1,
            })
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl TextExtractor for FailingExtractor {
        async fn extract(&self, _document: &Document) -> Result<ExtractedText, ExtractionError> {
            Err(ExtractionError::Malformed("truncated trailer".into()))
        }
    }

    #[test]
    fn fingerprint_changes_with_size() {
        let a = Document::new("/tmp/a.pdf", 10, None);
        let b = Document::new("/tmp/a.pdf", 11, None);
        assert_ne!(DocumentFingerprint::of(&a), DocumentFingerprint::of(&b));
        assert_eq!(DocumentFingerprint::of(&a), DocumentFingerprint::of(&a.clone()));
    }

    #[tokio::test]
    async fn concurrent_requests_extract_once() {
        let cache = Arc::new(CachingExtractor::new(CountingExtractor {
            calls: AtomicUsize::new(0),
            fail_first: false,
        }));
        let document = Document::new("/tmp/shared.pdf", 42, None);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let document = document.clone();
            handles.push(tokio::spawn(
                async move { cache.extract(&document).await },
            ));
        }
        for handle in handles {
            let extracted = handle.await.expect("join").expect("extract");
            assert_eq!(extracted.text, "cached");
        }
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = CachingExtractor::new(CountingExtractor {
            calls: AtomicUsize::new(0),
            fail_first: true,
        });
        let document = Document::new("/tmp/flaky.pdf", 7, None);

        assert!(cache.extract(&document).await.is_err());
        assert!(cache.extract(&document).await.is_ok());
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_extractions_leave_no_entries() {
        let cache = CachingExtractor::new(FailingExtractor);

        for index in 0..100u64 {
            let document = Document::new(format!("/tmp/broken-{index}.pdf"), index, None);
            assert!(cache.extract(&document).await.is_err());
        }

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = CachingExtractor::with_capacity(
            CountingExtractor {
                calls: AtomicUsize::new(0),
                fail_first: false,
            },
            NonZeroUsize::new(2).expect("non-zero"),
        );
        let first = Document::new("/tmp/first.pdf", 1, None);
        let second = Document::new("/tmp/second.pdf", 2, None);
        let third = Document::new("/tmp/third.pdf", 3, None);

        cache.extract(&first).await.expect("first");
        cache.extract(&second).await.expect("second");
        cache.extract(&first).await.expect("first again");
        cache.extract(&third).await.expect("third");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 3);

        // `second` was least recently used and must be extracted again.
        cache.extract(&second).await.expect("second again");
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 4);
        cache.extract(&third).await.expect("third again");
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 4);
    }
}
