//! Side-effect intents waiting for delivery to the stock and accounting
//! ledgers.
//!
//! An order is committed before its intents are queued here; the relay
//! delivers them afterwards. Intents are keyed by idempotency key, so
//! queueing the same plan twice is harmless.

pub mod relay;

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use uuid::Uuid;

use tradeflow_orders::{PlannedEffect, SideEffect};

use crate::error::{StoreError, StoreResult};

pub use relay::{Relay, RelayHandle, RelayReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Pending,
    Delivered,
    DeadLettered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub id: Uuid,
    pub idempotency_key: String,
    pub effect: SideEffect,
    pub status: IntentStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total delivery attempts before an intent is dead-lettered.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay after the given failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

#[derive(Debug, Default)]
struct OutboxState {
    intents: Vec<Intent>,
    keys: HashSet<String>,
}

impl OutboxState {
    fn pending_mut(&mut self, id: Uuid) -> Option<&mut Intent> {
        self.intents
            .iter_mut()
            .find(|i| i.id == id && i.status == IntentStatus::Pending)
    }
}

#[derive(Debug, Default)]
pub struct Outbox {
    state: RwLock<OutboxState>,
    wake: Notify,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue planned effects. Keys already queued are skipped; returns the
    /// number of new intents.
    pub fn enqueue(&self, planned: Vec<PlannedEffect>) -> StoreResult<usize> {
        let now = Utc::now();
        let mut state = self.write()?;
        let mut added = 0;
        for p in planned {
            if !state.keys.insert(p.idempotency_key.clone()) {
                tracing::debug!(idempotency_key = %p.idempotency_key, "intent already queued");
                continue;
            }
            state.intents.push(Intent {
                id: Uuid::now_v7(),
                idempotency_key: p.idempotency_key,
                effect: p.effect,
                status: IntentStatus::Pending,
                attempts: 0,
                last_error: None,
                created_at: now,
                updated_at: now,
                next_attempt_at: now,
            });
            added += 1;
        }
        drop(state);

        if added > 0 {
            self.wake.notify_one();
        }
        Ok(added)
    }

    /// Pending intents whose next attempt is due, oldest first.
    pub fn due(&self, now: DateTime<Utc>) -> StoreResult<Vec<Intent>> {
        let state = self.read()?;
        Ok(state
            .intents
            .iter()
            .filter(|i| i.status == IntentStatus::Pending && i.next_attempt_at <= now)
            .cloned()
            .collect())
    }

    /// Settle a pending intent as delivered. Returns `false`, changing
    /// nothing, when the intent is unknown or already settled.
    pub fn mark_delivered(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.write()?;
        let Some(intent) = state.pending_mut(id) else {
            return Ok(false);
        };
        intent.attempts += 1;
        intent.status = IntentStatus::Delivered;
        intent.last_error = None;
        intent.updated_at = Utc::now();
        Ok(true)
    }

    /// Record a failed attempt on a pending intent and return its new
    /// status. Non-retryable failures and exhausted attempts dead-letter the
    /// intent. `None` when the intent is unknown or already settled.
    pub fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        retryable: bool,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<IntentStatus>> {
        let mut state = self.write()?;
        let Some(intent) = state.pending_mut(id) else {
            return Ok(None);
        };

        intent.attempts += 1;
        intent.last_error = Some(error.to_string());
        intent.updated_at = now;
        if retryable && policy.should_retry(intent.attempts) {
            let delay = policy.delay_for_attempt(intent.attempts);
            intent.next_attempt_at = now + chrono::Duration::from_std(delay).unwrap_or_default();
        } else {
            intent.status = IntentStatus::DeadLettered;
        }
        Ok(Some(intent.status))
    }

    pub fn list(&self) -> StoreResult<Vec<Intent>> {
        Ok(self.read()?.intents.clone())
    }

    /// Resolves after the next successful enqueue.
    pub async fn notified(&self) {
        self.wake.notified().await
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, OutboxState>> {
        self.state.read().map_err(|_| StoreError::Poisoned("outbox"))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, OutboxState>> {
        self.state.write().map_err(|_| StoreError::Poisoned("outbox"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradeflow_accounting::LedgerPosting;

    fn posting(key: &str) -> PlannedEffect {
        PlannedEffect {
            idempotency_key: key.to_string(),
            effect: SideEffect::Ledger(LedgerPosting::purchase(1, dec!(50.00))),
        }
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(500));
    }

    #[test]
    fn enqueue_skips_known_keys() {
        let outbox = Outbox::new();
        assert_eq!(outbox.enqueue(vec![posting("PURCHASE-1:posting")]).unwrap(), 1);
        assert_eq!(outbox.enqueue(vec![posting("PURCHASE-1:posting")]).unwrap(), 0);
        assert_eq!(outbox.list().unwrap().len(), 1);
    }

    #[test]
    fn failures_back_off_then_dead_letter() {
        let outbox = Outbox::new();
        let policy = RetryPolicy::new(2, Duration::from_secs(10), Duration::from_secs(60));
        outbox.enqueue(vec![posting("PURCHASE-1:posting")]).unwrap();
        let now = Utc::now();
        let id = outbox.due(now).unwrap()[0].id;

        let status = outbox.mark_failed(id, "down", true, &policy, now).unwrap();
        assert_eq!(status, Some(IntentStatus::Pending));
        assert!(outbox.due(now).unwrap().is_empty());
        assert_eq!(outbox.due(now + chrono::Duration::seconds(11)).unwrap().len(), 1);

        let status = outbox.mark_failed(id, "down", true, &policy, now).unwrap();
        assert_eq!(status, Some(IntentStatus::DeadLettered));
        let intent = &outbox.list().unwrap()[0];
        assert_eq!(intent.attempts, 2);
        assert_eq!(intent.last_error.as_deref(), Some("down"));
    }

    #[test]
    fn rejection_dead_letters_immediately() {
        let outbox = Outbox::new();
        outbox.enqueue(vec![posting("SALE-3:posting")]).unwrap();
        let id = outbox.list().unwrap()[0].id;
        let status = outbox
            .mark_failed(id, "400", false, &RetryPolicy::default(), Utc::now())
            .unwrap();
        assert_eq!(status, Some(IntentStatus::DeadLettered));
    }

    #[test]
    fn settled_intents_ignore_late_outcomes() {
        let outbox = Outbox::new();
        let policy = RetryPolicy::new(1, Duration::from_secs(1), Duration::from_secs(1));
        outbox.enqueue(vec![posting("PURCHASE-4:posting")]).unwrap();
        let id = outbox.list().unwrap()[0].id;

        assert!(outbox.mark_delivered(id).unwrap());
        assert!(!outbox.mark_delivered(id).unwrap());
        assert_eq!(outbox.mark_failed(id, "timeout", true, &policy, Utc::now()).unwrap(), None);

        let intent = &outbox.list().unwrap()[0];
        assert_eq!(intent.status, IntentStatus::Delivered);
        assert_eq!(intent.attempts, 1);
        assert_eq!(intent.last_error, None);

        assert!(!outbox.mark_delivered(Uuid::now_v7()).unwrap());
    }

    #[test]
    fn intent_serializes_status_in_caps() {
        let outbox = Outbox::new();
        outbox.enqueue(vec![posting("PURCHASE-9:posting")]).unwrap();
        let id = outbox.list().unwrap()[0].id;
        assert!(outbox.mark_delivered(id).unwrap());
        let json = serde_json::to_value(&outbox.list().unwrap()[0]).unwrap();
        assert_eq!(json["status"], "DELIVERED");
        assert_eq!(json["idempotencyKey"], "PURCHASE-9:posting");
        assert_eq!(json["attempts"], 1);
    }
}
