//! Memoization of validation results.
//!
//! Entries are keyed by a SHA-256 digest over `(path, platform tag,
//! effective timeout)`. Callback and cancellation-token identity never
//! enter the key. Entries expire after a TTL and are evicted LRU-first under
//! capacity pressure. Callers always receive copies; stored values are never
//! mutated after insertion.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::models::ValidationResult;
use crate::platform::PlatformProfile;
use crate::Result;

/// Tunables for [`ValidationCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum number of stored results.
    pub max_entries: usize,
    /// Lifetime of an entry from insertion.
    pub ttl: Duration,
    /// Whether a read pushes the expiry out by another `ttl`.
    pub refresh_on_read: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(300),
            refresh_on_read: false,
        }
    }
}

/// A stored validation result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Digest key.
    pub key: String,
    /// Input path the key was derived from.
    pub path: String,
    /// Stored result.
    pub value: ValidationResult,
    /// Insertion time.
    pub inserted_at: Instant,
    /// Lifetime granted at insertion.
    pub ttl: Duration,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
    last_access: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    fn matches_path(&self, path: &str) -> bool {
        self.path == path || self.value.normalized_path() == Some(path)
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_rate: f64,
    /// Live entries.
    pub size: usize,
    /// Capacity.
    pub max_entries: usize,
    /// Entries dropped for capacity.
    pub evictions: u64,
    /// Entries dropped for age.
    pub expirations: u64,
    /// Uncached validations measured.
    pub validations: u64,
    /// Mean wall time of an uncached validation, in milliseconds.
    pub average_validation_time_ms: f64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    clock: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    validations: u64,
    validation_time: Duration,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .values()
            .min_by_key(|entry| entry.last_access)
            .map(|entry| entry.key.clone());
        if let Some(key) = oldest {
            debug!(key, "evicting least recently used cache entry");
            self.entries.remove(&key);
            self.evictions += 1;
        }
    }
}

/// Thread-safe LRU + TTL cache of validation results.
#[derive(Debug)]
pub struct ValidationCache {
    settings: CacheSettings,
    state: Mutex<CacheState>,
}

/// Derive the cache key for a validation request.
#[must_use]
pub fn cache_key(path: &str, profile: &PlatformProfile, timeout_ms: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update([0]);
    hasher.update(profile.tag().as_bytes());
    hasher.update([0]);
    hasher.update(timeout_ms.to_le_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

impl ValidationCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`, returning a copy of the stored result.
    ///
    /// Expired entries are dropped and count as a miss.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ValidationResult> {
        let now = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;
        let stamp = state.tick();

        match state.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.last_access = stamp;
                if self.settings.refresh_on_read {
                    entry.expires_at = now.checked_add(entry.ttl);
                }
                state.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                state.entries.remove(key);
                state.expirations += 1;
                state.misses += 1;
                None
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store `value` under `key` for input `path`.
    pub fn set(&self, key: String, path: &str, value: ValidationResult) {
        if self.settings.max_entries == 0 {
            return;
        }
        let now = Instant::now();
        let mut state = self.lock();
        let stamp = state.tick();

        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.settings.max_entries {
                state.evict_lru();
            }
        }

        let entry = CacheEntry {
            key: key.clone(),
            path: path.to_owned(),
            value,
            inserted_at: now,
            ttl: self.settings.ttl,
            expires_at: now.checked_add(self.settings.ttl),
            last_access: stamp,
        };
        state.entries.insert(key, entry);
    }

    /// Drop every entry whose input or normalized path equals `path`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_path(&self, path: &str) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.matches_path(path));
        before - state.entries.len()
    }

    /// Drop every entry whose input or normalized path matches `pattern`.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` if `pattern` is not a valid regex.
    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| {
            let normalized_hit = entry
                .value
                .normalized_path()
                .is_some_and(|normalized| regex.is_match(normalized));
            !(regex.is_match(&entry.path) || normalized_hit)
        });
        Ok(before - state.entries.len())
    }

    /// Drop all entries. Counters are kept.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Drop entries whose TTL has elapsed. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.entries.len();
        state.expirations += u64::try_from(removed).unwrap_or(u64::MAX);
        removed
    }

    /// Number of stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record the wall time of one uncached validation.
    pub fn record_validation(&self, elapsed: Duration) {
        let mut state = self.lock();
        state.validations += 1;
        state.validation_time += elapsed;
    }

    /// Snapshot of the counters.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let lookups = state.hits + state.misses;
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
            size: state.entries.len(),
            max_entries: self.settings.max_entries,
            evictions: state.evictions,
            expirations: state.expirations,
            validations: state.validations,
            average_validation_time_ms: if state.validations == 0 {
                0.0
            } else {
                state.validation_time.as_secs_f64() * 1000.0 / state.validations as f64
            },
        }
    }
}

impl Default for ValidationCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
