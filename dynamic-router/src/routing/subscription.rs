//! Subscription model shared by the registry, the routing engine and the control surface.

use crate::routing::predicate::CompiledPredicate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Match counters for one subscription.
///
/// Shared by every snapshot that contains the subscription; replacing the subscription
/// starts fresh statistics.
#[derive(Debug)]
pub struct SubscriptionStatistics {
    matched: AtomicU64,
    window: Mutex<MatchWindow>,
}

#[derive(Clone, Copy, Debug)]
struct MatchWindow {
    first_matched_at: Option<DateTime<Utc>>,
    last_matched_at: Option<DateTime<Utc>>,
    last_active_at: DateTime<Utc>,
}

impl SubscriptionStatistics {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            matched: AtomicU64::new(0),
            window: Mutex::new(MatchWindow {
                first_matched_at: None,
                last_matched_at: None,
                last_active_at: now,
            }),
        }
    }

    pub(crate) fn record_match(&self, at: DateTime<Utc>) {
        self.matched.fetch_add(1, Ordering::Relaxed);
        // A poisoned window only means another recorder panicked mid-update; keep counting.
        let mut window = self.window.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        window.first_matched_at.get_or_insert(at);
        window.last_matched_at = Some(at);
        window.last_active_at = at;
    }

    pub fn matched_count(&self) -> u64 {
        self.matched.load(Ordering::Relaxed)
    }

    fn window(&self) -> MatchWindow {
        *self.window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn first_matched_at(&self) -> Option<DateTime<Utc>> {
        self.window().first_matched_at
    }

    pub fn last_matched_at(&self) -> Option<DateTime<Utc>> {
        self.window().last_matched_at
    }

    /// Latest of subscription time and last match; drives idle eviction.
    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.window().last_active_at
    }
}

/// A validated subscription request, before the registry assigns ordering.
#[derive(Clone, Debug)]
pub struct SubscriptionRequest {
    pub channel: String,
    pub subscription_id: String,
    pub destination_uri: String,
    pub priority: i32,
    pub predicate: CompiledPredicate,
}

/// One registered subscription. Cheap to clone; snapshots hold clones.
#[derive(Clone, Debug)]
pub struct Subscription {
    channel: Arc<str>,
    subscription_id: Arc<str>,
    destination_uri: Arc<str>,
    priority: i32,
    sequence: u64,
    predicate: CompiledPredicate,
    created_at: DateTime<Utc>,
    statistics: Arc<SubscriptionStatistics>,
}

impl Subscription {
    pub(crate) fn new(request: SubscriptionRequest, sequence: u64, now: DateTime<Utc>) -> Self {
        Self {
            channel: request.channel.into(),
            subscription_id: request.subscription_id.into(),
            destination_uri: request.destination_uri.into(),
            priority: request.priority,
            sequence,
            predicate: request.predicate,
            created_at: now,
            statistics: Arc::new(SubscriptionStatistics::new(now)),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn destination_uri(&self) -> &str {
        &self.destination_uri
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Registry-wide insertion sequence; breaks priority ties in subscription order.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn predicate(&self) -> &CompiledPredicate {
        &self.predicate
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn statistics(&self) -> &SubscriptionStatistics {
        &self.statistics
    }

    pub(crate) fn ordering_key(&self) -> (i32, u64) {
        (self.priority, self.sequence)
    }

    pub fn view(&self) -> SubscriptionView {
        SubscriptionView {
            channel: self.channel.to_string(),
            subscription_id: self.subscription_id.to_string(),
            destination_uri: self.destination_uri.to_string(),
            priority: self.priority,
            predicate: self.predicate.describe(),
            created_at: self.created_at,
        }
    }

    pub fn statistics_view(&self) -> SubscriptionStatisticsView {
        let statistics = self.statistics();
        SubscriptionStatisticsView {
            channel: self.channel.to_string(),
            subscription_id: self.subscription_id.to_string(),
            matched_count: statistics.matched_count(),
            first_matched_at: statistics.first_matched_at(),
            last_matched_at: statistics.last_matched_at(),
        }
    }
}

/// Serializable projection of a subscription for `list`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    #[serde(rename = "subscribeChannel")]
    pub channel: String,
    pub subscription_id: String,
    pub destination_uri: String,
    pub priority: i32,
    pub predicate: String,
    pub created_at: DateTime<Utc>,
}

/// Serializable projection of subscription statistics for `statistics`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatisticsView {
    #[serde(rename = "subscribeChannel")]
    pub channel: String,
    pub subscription_id: String,
    pub matched_count: u64,
    pub first_matched_at: Option<DateTime<Utc>>,
    pub last_matched_at: Option<DateTime<Utc>>,
}
