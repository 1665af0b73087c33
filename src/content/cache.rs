use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use sha2::{Digest, Sha256};

use super::render_body;

/// Default number of rendered bodies kept in memory.
pub const DEFAULT_CAPACITY: usize = 256;

type CacheKey = [u8; 32];

/// Memoizes [`render_body`] output.
///
/// Entries are keyed by a SHA-256 digest over the body text and every media
/// reference, so an edit to either produces a new key and stale markup is
/// never served. Rendering is pure, which makes this safe to share across
/// tasks.
pub struct RenderCache {
    entries: Mutex<LruCache<CacheKey, Arc<str>>>,
}

impl RenderCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Render `body` with `media`, reusing a previous result when available.
    pub fn render(&self, body: &str, media: &[String]) -> Arc<str> {
        let key = cache_key(body, media);

        if let Some(hit) = self.lock().get(&key) {
            tracing::trace!("Render cache hit");
            return Arc::clone(hit);
        }

        // Render outside the lock; a concurrent miss on the same key just
        // renders twice and stores identical markup.
        let html: Arc<str> = Arc::from(render_body(body, media));
        self.lock().put(key, Arc::clone(&html));
        html
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, Arc<str>>> {
        // A poisoned cache only holds pure render output, so keep using it.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Length-prefixed digest so `("ab", ["c"])` and `("a", ["bc"])` differ.
fn cache_key(body: &str, media: &[String]) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update((body.len() as u64).to_le_bytes());
    hasher.update(body.as_bytes());
    hasher.update((media.len() as u64).to_le_bytes());
    for url in media {
        hasher.update((url.len() as u64).to_le_bytes());
        hasher.update(url.as_bytes());
    }
    hasher.finalize().into()
}
