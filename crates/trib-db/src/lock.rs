//! Keyed retry mutex
//!
//! Serializes access per key (typically a database file path) without
//! serializing unrelated keys. Acquisition retries with jittered exponential
//! backoff instead of blocking on a condition.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Retry and backoff settings for [`KeyedRetryMutex::try_lock`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Acquisition attempts made by `try_lock` before it gives up
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound of the delay before jitter
    pub max_delay: Duration,

    /// Growth factor per attempt
    pub factor: f64,

    /// Relative jitter, `0.2` perturbs delays by up to ±20%
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 200,
            base_delay: Duration::from_nanos(10),
            max_delay: Duration::from_millis(100),
            factor: 1.1,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let max = self.max_delay.as_secs_f64();
        let mut delay = self.base_delay.as_secs_f64();
        for _ in 0..attempt {
            if delay >= max {
                break;
            }
            delay *= self.factor;
        }
        delay = delay.min(max);

        if self.jitter > 0.0 {
            let unit: f64 = rand::random();
            delay *= 1.0 + self.jitter * (unit * 2.0 - 1.0);
        }
        Duration::from_secs_f64(delay.max(0.0))
    }
}

/// An exclusive lock striped by key.
///
/// Held keys live in one set behind one internal lock, which is taken only
/// for the instant of a check-and-insert. There is no ownership tracking:
/// [`unlock`](Self::unlock) releases the key whoever holds it.
#[derive(Debug)]
pub struct KeyedRetryMutex<K = String> {
    held: Mutex<HashSet<K>>,
    policy: RetryPolicy,
}

impl<K: Eq + Hash + Clone> Default for KeyedRetryMutex<K> {
    fn default() -> Self {
        Self::with_policy(RetryPolicy::default())
    }
}

impl<K: Eq + Hash + Clone> KeyedRetryMutex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn try_acquire(&self, key: &K) -> bool {
        let mut held = self.held.lock().unwrap_or_else(|p| p.into_inner());
        if held.contains(key) {
            return false;
        }
        held.insert(key.clone());
        true
    }

    /// Acquire `key`, retrying with backoff while another caller holds it.
    ///
    /// Returns `false` once all retries are exhausted.
    pub fn try_lock(&self, key: &K) -> bool {
        for attempt in 0..self.policy.max_retries {
            if self.try_acquire(key) {
                return true;
            }
            if attempt + 1 < self.policy.max_retries {
                thread::sleep(self.policy.backoff(attempt));
            }
        }
        log::debug!("Lock still held after {} attempts", self.policy.max_retries);
        false
    }

    /// Acquire `key`, re-entering the retry loop until it succeeds
    pub fn lock(&self, key: &K) {
        while !self.try_lock(key) {
            // a zero-attempt policy still has to make progress
            if self.try_acquire(key) {
                return;
            }
        }
    }

    /// Release `key`
    pub fn unlock(&self, key: &K) {
        let mut held = self.held.lock().unwrap_or_else(|p| p.into_inner());
        held.remove(key);
    }

    /// Whether `key` is currently held
    pub fn is_locked(&self, key: &K) -> bool {
        let held = self.held.lock().unwrap_or_else(|p| p.into_inner());
        held.contains(key)
    }
}

/// Holds a database key until dropped
#[derive(Debug)]
pub struct DatabaseGuard {
    mutex: Arc<KeyedRetryMutex>,
    key: String,
}

impl DatabaseGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for DatabaseGuard {
    fn drop(&mut self) {
        self.mutex.unlock(&self.key);
    }
}

/// Block until `key` is acquired on `mutex`; the key is released when the guard drops.
///
/// This blocks the calling thread. From async code call it through
/// `tokio::task::spawn_blocking`.
pub fn lock_database(mutex: &Arc<KeyedRetryMutex>, key: impl Into<String>) -> DatabaseGuard {
    let key = key.into();
    mutex.lock(&key);
    DatabaseGuard {
        mutex: Arc::clone(mutex),
        key,
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
