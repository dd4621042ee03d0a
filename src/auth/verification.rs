use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::db::PendingVerification;

/// In-memory store of pending registrations plus a sliding-window limiter
/// on registration attempts per email.
///
/// Pending records expire lazily: an expired record reads as absent but is
/// only reclaimed by an explicit delete or overwrite. Attempt windows are
/// pruned lazily on every check and reclaimed by `sweep_attempts`.
pub struct VerificationStore {
    codes: RwLock<HashMap<String, PendingVerification>>,
    attempts: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
    window: Duration,
    max_attempts: usize,
}

impl VerificationStore {
    pub fn new() -> Self {
        Self::with_limits(Duration::seconds(60), 3)
    }

    /// Custom window and attempt ceiling, used by tests to age attempts
    /// quickly.
    pub fn with_limits(window: Duration, max_attempts: usize) -> Self {
        Self {
            codes: RwLock::new(HashMap::new()),
            attempts: RwLock::new(HashMap::new()),
            window,
            max_attempts,
        }
    }

    /// Sliding-window admission check. Prune-and-append runs under one
    /// write lock so concurrent callers cannot exceed the limit.
    pub async fn can_register(&self, email: &str) -> bool {
        let mut attempts = self.attempts.write().await;
        let now = Utc::now();
        let cutoff = now - self.window;

        let window = attempts.entry(email.to_string()).or_default();
        window.retain(|ts| *ts > cutoff);

        if window.len() >= self.max_attempts {
            return false;
        }

        window.push(now);
        true
    }

    /// Upsert the pending record for its email; a later registration
    /// replaces any prior one.
    pub async fn save(&self, record: PendingVerification) {
        self.codes.write().await.insert(record.email.clone(), record);
    }

    /// Returns the live pending record. An expired record reads as absent
    /// and is not deleted here.
    pub async fn get_by_email(&self, email: &str) -> Option<PendingVerification> {
        let codes = self.codes.read().await;
        codes.get(email).filter(|record| !record.is_expired()).cloned()
    }

    /// Removes an expired pending record, reporting whether one was there.
    /// Lets the caller tell a stale registration apart from a missing one.
    pub async fn purge_expired(&self, email: &str) -> bool {
        let mut codes = self.codes.write().await;
        match codes.get(email) {
            Some(record) if record.is_expired() => {
                codes.remove(email);
                true
            }
            _ => false,
        }
    }

    /// Unconditional delete, idempotent.
    pub async fn delete(&self, email: &str) {
        self.codes.write().await.remove(email);
    }

    /// Sweep body: prunes every attempt window and drops empty entries.
    /// Reclaims memory only; `can_register` re-prunes lazily regardless.
    pub async fn sweep_attempts(&self) {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, window| {
            window.retain(|ts| *ts > cutoff);
            !window.is_empty()
        });
    }

    /// Number of emails currently tracked by the attempt limiter.
    pub async fn tracked_attempts(&self) -> usize {
        self.attempts.read().await.len()
    }
}

impl Default for VerificationStore {
    fn default() -> Self {
        Self::new()
    }
}
