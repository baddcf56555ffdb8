//! Revalidation cache for rendered pages
//!
//! Rendered HTML is kept per route with a freshness window. A stale page
//! is still served while a single re-render runs; a route that was never
//! rendered reports `Pending` until its first render lands.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// State of one cached route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// First render in progress
    Pending,
    Ready { html: String, rendered_at: Instant },
    Failed { not_found: bool, message: String, failed_at: Instant },
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Nothing cached and nothing rendering
    Missing,
    Pending,
    Fresh(String),
    /// Past its window; serve it but render again
    Stale(String),
    Failed { not_found: bool, message: String },
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashSet<String>,
}

/// Route-keyed render cache
#[derive(Debug, Default)]
pub struct RenderCache {
    inner: Mutex<Inner>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `route`, judging freshness against `ttl`
    ///
    /// Failures outside the window are dropped, so the route reads as
    /// `Missing` and is retried.
    pub fn lookup(&self, route: &str, ttl: Duration) -> Lookup {
        self.lookup_at(route, ttl, Instant::now())
    }

    fn lookup_at(&self, route: &str, ttl: Duration, now: Instant) -> Lookup {
        let mut inner = self.lock();
        inner.entries.retain(|_, entry| match entry {
            CacheEntry::Failed { failed_at, .. } => now.duration_since(*failed_at) < ttl,
            _ => true,
        });

        match inner.entries.get(route) {
            None => Lookup::Missing,
            Some(CacheEntry::Pending) => Lookup::Pending,
            Some(CacheEntry::Ready { html, rendered_at }) => {
                if now.duration_since(*rendered_at) < ttl {
                    Lookup::Fresh(html.clone())
                } else {
                    Lookup::Stale(html.clone())
                }
            }
            Some(CacheEntry::Failed { not_found, message, .. }) => Lookup::Failed {
                not_found: *not_found,
                message: message.clone(),
            },
        }
    }

    /// Claim the render of `route`
    ///
    /// Returns `false` if a render is already running. A route with no
    /// entry becomes `Pending`; an existing entry stays readable.
    pub fn begin(&self, route: &str) -> bool {
        let mut inner = self.lock();
        if !inner.in_flight.insert(route.to_string()) {
            return false;
        }
        let replace = !matches!(inner.entries.get(route), Some(CacheEntry::Ready { .. }));
        if replace {
            inner.entries.insert(route.to_string(), CacheEntry::Pending);
        }
        true
    }

    /// Store a finished render
    pub fn store(&self, route: &str, html: String) {
        let mut inner = self.lock();
        inner.in_flight.remove(route);
        inner.entries.insert(
            route.to_string(),
            CacheEntry::Ready {
                html,
                rendered_at: Instant::now(),
            },
        );
    }

    /// Record a failed render
    ///
    /// A failed re-render of a ready page keeps the stale page unless the
    /// content is gone.
    pub fn fail(&self, route: &str, not_found: bool, message: &str) {
        let mut inner = self.lock();
        inner.in_flight.remove(route);
        let keep_stale = !not_found && matches!(inner.entries.get(route), Some(CacheEntry::Ready { .. }));
        if keep_stale {
            tracing::warn!("Re-render of {} failed, keeping stale page: {}", route, message);
            return;
        }
        inner.entries.insert(
            route.to_string(),
            CacheEntry::Failed {
                not_found,
                message: message.to_string(),
                failed_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, route: &str) -> Option<CacheEntry> {
        self.lock().entries.get(route).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_missing_then_pending_then_ready() {
        let cache = RenderCache::new();
        assert_eq!(cache.lookup("/post/a", MINUTE), Lookup::Missing);

        assert!(cache.begin("/post/a"));
        assert!(!cache.begin("/post/a"));
        assert_eq!(cache.lookup("/post/a", MINUTE), Lookup::Pending);

        cache.store("/post/a", "<p>a</p>".to_string());
        assert_eq!(
            cache.lookup("/post/a", MINUTE),
            Lookup::Fresh("<p>a</p>".to_string())
        );
    }

    #[test]
    fn test_stale_page_is_still_served() {
        let cache = RenderCache::new();
        cache.begin("/");
        cache.store("/", "home".to_string());

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(
            cache.lookup_at("/", MINUTE, later),
            Lookup::Stale("home".to_string())
        );

        // Re-render keeps the old page readable
        assert!(cache.begin("/"));
        assert_eq!(
            cache.lookup_at("/", MINUTE, later),
            Lookup::Stale("home".to_string())
        );
    }

    #[test]
    fn test_failed_rerender_keeps_stale_page() {
        let cache = RenderCache::new();
        cache.begin("/");
        cache.store("/", "home".to_string());

        cache.begin("/");
        cache.fail("/", false, "CMS unreachable");
        assert!(matches!(cache.get("/"), Some(CacheEntry::Ready { .. })));
        assert!(cache.begin("/"));
    }

    #[test]
    fn test_not_found_expires() {
        let cache = RenderCache::new();
        cache.begin("/post/gone");
        cache.fail("/post/gone", true, "gone");

        assert_eq!(
            cache.lookup("/post/gone", MINUTE),
            Lookup::Failed {
                not_found: true,
                message: "gone".to_string()
            }
        );
        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(cache.lookup_at("/post/gone", MINUTE, later), Lookup::Missing);
        assert!(cache.get("/post/gone").is_none());
    }

    #[test]
    fn test_expired_failures_are_evicted() {
        let cache = RenderCache::new();
        cache.store("/", "home".to_string());
        for uid in ["x", "y", "z"] {
            let route = format!("/post/{}", uid);
            cache.begin(&route);
            cache.fail(&route, true, "gone");
        }
        assert_eq!(cache.len(), 4);

        // Any lookup sweeps every failure past the window
        let later = Instant::now() + Duration::from_secs(61);
        assert!(matches!(cache.lookup_at("/", MINUTE, later), Lookup::Stale(_)));
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }
}
