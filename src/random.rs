//! # Random Source Module
//!
//! Cached entropy stream with a deterministic-progress guarantee: every
//! operation completes from cache-or-fallback data without ever blocking on
//! the network. The cache is a buffer of lowercase hexadecimal digits,
//! optionally hydrated from durable storage at startup and persisted after
//! every consumption.
//!
//! ## Refill protocol
//!
//! When a consumption leaves the cache under `capacity × refill_threshold`, a
//! detached refill task is spawned against the external entropy service. The
//! triggering call never awaits it; at most one refill is in flight at a time
//! (reentrant triggers are no-ops). Refill failures and timeouts are absorbed
//! by synthesizing the shortfall from the local CSPRNG.

use crate::entropy::{EntropyClient, EntropyError};
use crate::storage::{persist_best_effort, KeyValueStorage, NullStorage};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Digits consumed per [`RandomSource::float`] call: a full 64-bit word.
const FLOAT_DIGITS: usize = 16;

/// Caller contract violations. Everything else this module encounters is
/// recovered internally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RandomError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Tuning knobs for the entropy cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Maximum number of hex digits held in the cache.
    pub capacity: usize,
    /// Refill triggers when the cache drops under `capacity * refill_threshold`.
    pub refill_threshold: f64,
    /// Storage key the cache is persisted under.
    pub storage_key: String,
    /// Bound on each refill attempt against the entropy service.
    pub refill_timeout_secs: u64,
    /// Entropy service endpoint; `None` uses the default service.
    pub entropy_base_url: Option<String>,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            refill_threshold: 0.25,
            storage_key: "mixflow.entropy-cache".to_string(),
            refill_timeout_secs: 5,
            entropy_base_url: None,
        }
    }
}

/// Snapshot of the cache state.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    /// Fill level, 0..=100.
    pub percentage: f64,
    pub is_refilling: bool,
}

struct Inner {
    cache: Mutex<String>,
    refilling: AtomicBool,
    config: RandomConfig,
    entropy: EntropyClient,
    storage: Arc<dyn KeyValueStorage>,
}

/// The session's randomness source.
///
/// Cloning is cheap and shares the underlying cache; construct one source per
/// engine and inject it rather than reaching for a global.
#[derive(Clone)]
pub struct RandomSource {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomSource")
            .field("capacity", &self.inner.config.capacity)
            .finish_non_exhaustive()
    }
}

impl RandomSource {
    /// Build a source with in-memory-only caching.
    pub fn new(config: RandomConfig) -> Result<Self, EntropyError> {
        Self::with_storage(config, Arc::new(NullStorage))
    }

    /// Build a source backed by a durable storage adapter. The cache is
    /// hydrated from storage immediately; a missing or corrupt persisted
    /// value degrades to an empty cache.
    pub fn with_storage(
        config: RandomConfig,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self, EntropyError> {
        let timeout = Duration::from_secs(config.refill_timeout_secs);
        let entropy = match &config.entropy_base_url {
            Some(url) => EntropyClient::with_base_url(url, timeout)?,
            None => EntropyClient::new(timeout)?,
        };

        let mut cache = match storage.get_item(&config.storage_key) {
            Ok(Some(persisted)) => {
                if persisted.bytes().all(|b| b.is_ascii_hexdigit()) {
                    debug!("Hydrated {} cached entropy digits from storage", persisted.len());
                    persisted.to_lowercase()
                } else {
                    warn!("Persisted entropy cache is not hexadecimal, discarding");
                    String::new()
                }
            }
            Ok(None) => String::new(),
            Err(e) => {
                warn!("Failed to hydrate entropy cache: {e:#}");
                String::new()
            }
        };
        cache.truncate(config.capacity);

        Ok(Self {
            inner: Arc::new(Inner {
                cache: Mutex::new(cache),
                refilling: AtomicBool::new(false),
                config,
                entropy,
                storage,
            }),
        })
    }

    /// Return `length` lowercase hex digits.
    ///
    /// Consumes the cache first and synthesizes any shortfall locally, so
    /// the call never waits on the network. Persists the residual cache and
    /// triggers a background refill when under the threshold.
    ///
    /// # Errors
    ///
    /// [`RandomError::InvalidArgument`] iff `length` is zero.
    pub async fn hexadecimal(&self, length: usize) -> Result<String, RandomError> {
        if length == 0 {
            return Err(RandomError::InvalidArgument(
                "hexadecimal length must be positive".to_string(),
            ));
        }

        let needs_refill;
        let result;
        {
            let mut cache = self.inner.cache.lock().await;
            let cached = length.min(cache.len());
            let mut digits: String = cache.drain(..cached).collect();

            if digits.len() < length {
                let shortfall = length - digits.len();
                debug!("Entropy cache short by {shortfall} digits, using local fallback");
                digits.push_str(&fallback_hex(shortfall));
            }

            persist_best_effort(
                self.inner.storage.as_ref(),
                &self.inner.config.storage_key,
                &cache,
            );

            needs_refill = (cache.len() as f64)
                < self.inner.config.capacity as f64 * self.inner.config.refill_threshold;
            result = digits;
        }

        if needs_refill {
            self.trigger_refill();
        }
        Ok(result)
    }

    /// Uniform float in `[0, 1)`: 16 hex digits read as a u64, divided by 16^16.
    pub async fn float(&self) -> Result<f64, RandomError> {
        let digits = self.hexadecimal(FLOAT_DIGITS).await?;
        // The digits are guaranteed hex, so the parse cannot fail.
        let word = u64::from_str_radix(&digits, 16).unwrap_or_default();
        // Keep the top 53 bits so the quotient is exact in f64 and strictly
        // below one even for the all-ones word.
        Ok((word >> 11) as f64 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[min, max]` inclusive.
    pub async fn integer(&self, min: i64, max: i64) -> Result<i64, RandomError> {
        if min > max {
            return Err(RandomError::InvalidArgument(format!(
                "integer range inverted: min {min} > max {max}"
            )));
        }
        let span = (max - min + 1) as f64;
        let offset = (self.float().await? * span).floor() as i64;
        Ok(min + offset)
    }

    /// Uniform pick from a non-empty slice.
    pub async fn choice<'a, T>(&self, items: &'a [T]) -> Result<&'a T, RandomError> {
        if items.is_empty() {
            return Err(RandomError::InvalidArgument(
                "cannot choose from an empty slice".to_string(),
            ));
        }
        let index = self.integer(0, items.len() as i64 - 1).await? as usize;
        Ok(&items[index])
    }

    /// `count` distinct elements, via shuffle-then-take.
    pub async fn unique_choices<T: Clone>(
        &self,
        items: &[T],
        count: usize,
    ) -> Result<Vec<T>, RandomError> {
        if count > items.len() {
            return Err(RandomError::InvalidArgument(format!(
                "requested {count} unique choices from {} items",
                items.len()
            )));
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut shuffled = self.shuffle(items).await?;
        shuffled.truncate(count);
        Ok(shuffled)
    }

    /// Fisher–Yates shuffle into a new vector; the input is untouched.
    pub async fn shuffle<T: Clone>(&self, items: &[T]) -> Result<Vec<T>, RandomError> {
        let mut shuffled = items.to_vec();
        for i in (1..shuffled.len()).rev() {
            let j = self.integer(0, i as i64).await? as usize;
            shuffled.swap(i, j);
        }
        Ok(shuffled)
    }

    /// Fair coin.
    pub async fn boolean(&self) -> Result<bool, RandomError> {
        Ok(self.float().await? < 0.5)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        let cache = self.inner.cache.lock().await;
        let size = cache.len();
        let max_size = self.inner.config.capacity;
        CacheStats {
            size,
            max_size,
            percentage: if max_size == 0 {
                0.0
            } else {
                size as f64 / max_size as f64 * 100.0
            },
            is_refilling: self.inner.refilling.load(Ordering::SeqCst),
        }
    }

    /// Drop the cache and its persisted copy. Subsequent requests run on the
    /// fallback path until a refill lands.
    pub async fn clear_cache(&self) {
        let mut cache = self.inner.cache.lock().await;
        cache.clear();
        if let Err(e) = self
            .inner
            .storage
            .remove_item(&self.inner.config.storage_key)
        {
            warn!("Failed to remove persisted entropy cache: {e:#}");
        }
    }

    /// Launch the detached refill task unless one is already in flight.
    fn trigger_refill(&self) {
        if self.inner.refilling.swap(true, Ordering::SeqCst) {
            return; // refill already racing
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            refill(&inner).await;
            inner.refilling.store(false, Ordering::SeqCst);
        });
    }
}

/// One refill attempt: fetch the shortfall from the entropy service, or
/// synthesize it locally when the service fails. Either way the cache ends
/// replenished and persisted.
async fn refill(inner: &Inner) {
    let shortfall = {
        let cache = inner.cache.lock().await;
        inner.config.capacity.saturating_sub(cache.len())
    };
    if shortfall == 0 {
        return;
    }

    let digits = match inner.entropy.fetch(shortfall).await {
        Ok(digits) => {
            info!("Refilled entropy cache with {} service digits", digits.len());
            digits
        }
        Err(e) => {
            debug!("Entropy refill failed ({e}), synthesizing {shortfall} digits locally");
            fallback_hex(shortfall)
        }
    };

    let mut cache = inner.cache.lock().await;
    cache.push_str(&digits);
    cache.truncate(inner.config.capacity);
    persist_best_effort(inner.storage.as_ref(), &inner.config.storage_key, &cache);
}

/// Synthesize lowercase hex digits from the local CSPRNG (`thread_rng` is
/// cryptographically strong).
fn fallback_hex(count: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
        .collect()
}
