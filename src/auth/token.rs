//! Cached bearer token and the clock it is judged against.

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn advance_ms(&self, delta: u64) {
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A token with its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    pub expires_at_ms: u64,
}

impl CachedToken {
    /// Valid while `now < expires_at - margin`.
    pub fn is_valid_at(&self, now_ms: u64, margin_ms: u64) -> bool {
        now_ms.saturating_add(margin_ms) < self.expires_at_ms
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("token", &"[redacted]")
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

/// Process-wide slot for one upstream identity's token.
///
/// Starts empty, is overwritten on each successful acquisition, and is never
/// cleared. Reads are lock-free.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: ArcSwapOption<CachedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<CachedToken>> {
        self.slot.load_full()
    }

    pub fn store(&self, token: CachedToken) {
        self.slot.store(Some(Arc::new(token)));
    }

    /// The cached token if it is still valid at `now_ms`.
    pub fn valid_token(&self, now_ms: u64, margin_ms: u64) -> Option<String> {
        self.get()
            .filter(|t| t.is_valid_at(now_ms, margin_ms))
            .map(|t| t.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARGIN: u64 = 60_000;

    #[test]
    fn test_empty_cache_has_no_token() {
        let cache = TokenCache::new();
        assert!(cache.get().is_none());
        assert_eq!(cache.valid_token(0, MARGIN), None);
    }

    #[test]
    fn test_refresh_margin_boundary() {
        let cache = TokenCache::new();
        cache.store(CachedToken {
            token: "t".into(),
            expires_at_ms: 1_000_000,
        });

        // More than a minute left
        assert_eq!(cache.valid_token(1_000_000 - 60_001, MARGIN).as_deref(), Some("t"));
        // Exactly a minute left is already invalid
        assert_eq!(cache.valid_token(1_000_000 - 60_000, MARGIN), None);
        // Less than a minute left
        assert_eq!(cache.valid_token(1_000_000 - 30_000, MARGIN), None);
        // Past expiry
        assert_eq!(cache.valid_token(2_000_000, MARGIN), None);
    }

    #[test]
    fn test_store_supersedes() {
        let cache = TokenCache::new();
        cache.store(CachedToken { token: "old".into(), expires_at_ms: 10 });
        cache.store(CachedToken { token: "new".into(), expires_at_ms: 500_000 });
        assert_eq!(cache.valid_token(0, MARGIN).as_deref(), Some("new"));
    }

    #[test]
    fn test_debug_hides_token() {
        let t = CachedToken { token: "very-secret".into(), expires_at_ms: 1 };
        assert!(!format!("{:?}", t).contains("very-secret"));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(5);
        clock.advance_ms(10);
        assert_eq!(clock.now_ms(), 15);
        clock.set_ms(1);
        assert_eq!(clock.now_ms(), 1);
    }
}
