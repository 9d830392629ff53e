//! Duplicate link suppression
//!
//! The launch URL is observed twice on cold start: once as the initial URL
//! and again as a URL event shortly after. Only the first delivery runs.
//! Deliveries are matched on the raw URI and on the path it resolves to, so
//! two encodings of the same link count as one.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::path::CanonicalPath;

#[derive(Debug)]
pub struct LinkDeduplicator {
    window: Duration,
    seen: HashMap<String, Instant>,
}

impl Default for LinkDeduplicator {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl LinkDeduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// `true` if this delivery of `uri`, resolved to `path`, should be handled
    pub fn should_handle(&mut self, uri: &str, path: &CanonicalPath, now: Instant) -> bool {
        let window = self.window;
        self.seen
            .retain(|_, at| now.saturating_duration_since(*at) < window);

        let mut keys = vec![format!("uri:{}", uri.trim())];
        if !path.is_error() {
            keys.push(format!("path:{}", path));
        }
        if keys.iter().any(|key| self.seen.contains_key(key)) {
            debug!("Dropping duplicate delivery of {}", uri.trim());
            return false;
        }
        for key in keys {
            self.seen.insert(key, now);
        }
        true
    }
}
