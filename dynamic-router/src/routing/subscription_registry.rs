/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Copy-on-write subscription registry.
//!
//! Every mutation builds a new immutable table and publishes it with one atomic store.
//! Readers load the current table without locking and keep using the channel snapshot they
//! took, whatever happens to the registry afterwards.

use crate::error::ControlError;
use crate::observability::events;
use crate::routing::subscription::{Subscription, SubscriptionRequest};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

const COMPONENT: &str = "subscription_registry";

#[derive(Default)]
struct RegistryTable {
    version: u64,
    next_sequence: u64,
    channels: HashMap<String, Arc<[Subscription]>>,
}

/// Priority-ordered, immutable view of one channel's subscriptions.
#[derive(Clone, Debug)]
pub struct ChannelSnapshot {
    version: u64,
    subscriptions: Arc<[Subscription]>,
}

impl ChannelSnapshot {
    /// Registry version the snapshot was taken from.
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl Deref for ChannelSnapshot {
    type Target = [Subscription];

    fn deref(&self) -> &Self::Target {
        &self.subscriptions
    }
}

/// In-memory subscription store keyed by channel.
pub struct SubscriptionRegistry {
    table: ArcSwap<RegistryTable>,
    // Serializes writers only; readers never take it.
    write_lock: Mutex<()>,
    idle_timeout: Option<Duration>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SubscriptionRegistry {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            table: ArcSwap::from_pointee(RegistryTable::default()),
            write_lock: Mutex::new(()),
            idle_timeout,
        }
    }

    fn validate(request: &SubscriptionRequest) -> Result<(), ControlError> {
        let required = [
            ("subscribeChannel", &request.channel),
            ("subscriptionId", &request.subscription_id),
            ("destinationUri", &request.destination_uri),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ControlError::InvalidSubscription(format!(
                    "{name} must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// Inserts a subscription, replacing any entry with the same id on the same channel.
    ///
    /// Returns the replaced subscription. The replacement is re-sequenced, so among equal
    /// priorities it now sorts after subscriptions that were registered earlier.
    pub fn add(&self, request: SubscriptionRequest) -> Result<Option<Subscription>, ControlError> {
        self.store(request, false)
    }

    /// Like [`add`][Self::add], but fails with `SubscriptionNotFound` unless the id is
    /// already registered on the channel. The check and the swap happen under one write.
    pub fn replace(&self, request: SubscriptionRequest) -> Result<Subscription, ControlError> {
        let channel = request.channel.clone();
        let subscription_id = request.subscription_id.clone();
        self.store(request, true)?
            .ok_or(ControlError::SubscriptionNotFound {
                channel,
                subscription_id,
            })
    }

    fn store(
        &self,
        request: SubscriptionRequest,
        require_existing: bool,
    ) -> Result<Option<Subscription>, ControlError> {
        Self::validate(&request)?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.table.load_full();

        let channel = request.channel.clone();
        let subscription = Subscription::new(request, current.next_sequence, Utc::now());

        let mut entries: Vec<Subscription> = current
            .channels
            .get(&channel)
            .map(|existing| existing.to_vec())
            .unwrap_or_default();
        let replaced = entries
            .iter()
            .position(|entry| entry.subscription_id() == subscription.subscription_id())
            .map(|index| entries.remove(index));
        if require_existing && replaced.is_none() {
            return Ok(None);
        }
        let insert_at =
            entries.partition_point(|entry| entry.ordering_key() <= subscription.ordering_key());

        debug!(
            event = if replaced.is_some() {
                events::SUBSCRIPTION_REPLACED
            } else {
                events::SUBSCRIPTION_ADDED
            },
            component = COMPONENT,
            channel = channel.as_str(),
            subscription_id = subscription.subscription_id(),
            destination_uri = subscription.destination_uri(),
            priority = subscription.priority(),
            predicate = %subscription.predicate().describe(),
            version = current.version + 1,
            "subscription stored"
        );

        entries.insert(insert_at, subscription);
        let mut channels = current.channels.clone();
        channels.insert(channel, entries.into());

        self.table.store(Arc::new(RegistryTable {
            version: current.version + 1,
            next_sequence: current.next_sequence + 1,
            channels,
        }));

        Ok(replaced)
    }

    /// Removes a subscription. Returns `false`, and changes nothing, when it is unknown.
    pub fn remove(&self, channel: &str, subscription_id: &str) -> bool {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.table.load_full();

        let Some(existing) = current.channels.get(channel) else {
            debug!(
                event = events::SUBSCRIPTION_REMOVE_MISSING,
                component = COMPONENT,
                channel,
                subscription_id,
                "no such channel"
            );
            return false;
        };
        if !existing
            .iter()
            .any(|entry| entry.subscription_id() == subscription_id)
        {
            debug!(
                event = events::SUBSCRIPTION_REMOVE_MISSING,
                component = COMPONENT,
                channel,
                subscription_id,
                "no such subscription"
            );
            return false;
        }

        let remaining: Vec<Subscription> = existing
            .iter()
            .filter(|entry| entry.subscription_id() != subscription_id)
            .cloned()
            .collect();
        let mut channels = current.channels.clone();
        if remaining.is_empty() {
            channels.remove(channel);
        } else {
            channels.insert(channel.to_string(), remaining.into());
        }

        self.table.store(Arc::new(RegistryTable {
            version: current.version + 1,
            next_sequence: current.next_sequence,
            channels,
        }));

        debug!(
            event = events::SUBSCRIPTION_REMOVED,
            component = COMPONENT,
            channel,
            subscription_id,
            version = current.version + 1,
            "subscription removed"
        );
        true
    }

    /// Lock-free, priority-ordered view of one channel. Empty for unknown channels.
    pub fn snapshot(&self, channel: &str) -> ChannelSnapshot {
        let table = self.table.load();
        ChannelSnapshot {
            version: table.version,
            subscriptions: table
                .channels
                .get(channel)
                .cloned()
                .unwrap_or_else(|| Arc::from(Vec::new())),
        }
    }

    /// All subscriptions of one channel, or of every channel ordered by channel name.
    pub fn list(&self, channel: Option<&str>) -> Vec<Subscription> {
        if let Some(channel) = channel {
            return self.snapshot(channel).to_vec();
        }

        let table = self.table.load();
        let mut names: Vec<&String> = table.channels.keys().collect();
        names.sort();
        names
            .into_iter()
            .flat_map(|name| table.channels[name].iter().cloned())
            .collect()
    }

    pub fn contains(&self, channel: &str, subscription_id: &str) -> bool {
        self.table
            .load()
            .channels
            .get(channel)
            .is_some_and(|entries| {
                entries
                    .iter()
                    .any(|entry| entry.subscription_id() == subscription_id)
            })
    }

    pub fn version(&self) -> u64 {
        self.table.load().version
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Removes subscriptions idle for longer than the configured timeout.
    ///
    /// Returns the number of evicted subscriptions; always zero without an idle timeout.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let Some(idle_timeout) = self.idle_timeout else {
            return 0;
        };
        let Ok(idle_timeout) = chrono::Duration::from_std(idle_timeout) else {
            return 0;
        };

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.table.load_full();

        let mut evicted = 0;
        let mut channels = HashMap::with_capacity(current.channels.len());
        for (channel, entries) in &current.channels {
            let (idle, active): (Vec<&Subscription>, Vec<&Subscription>) = entries
                .iter()
                .partition(|entry| now - entry.statistics().last_active_at() > idle_timeout);

            for subscription in &idle {
                info!(
                    event = events::SUBSCRIPTION_EVICTED_IDLE,
                    component = COMPONENT,
                    channel = channel.as_str(),
                    subscription_id = subscription.subscription_id(),
                    "evicting idle subscription"
                );
            }
            evicted += idle.len();

            if idle.is_empty() {
                channels.insert(channel.clone(), entries.clone());
            } else if !active.is_empty() {
                let kept: Vec<Subscription> = active.into_iter().cloned().collect();
                channels.insert(channel.clone(), kept.into());
            }
        }

        if evicted > 0 {
            self.table.store(Arc::new(RegistryTable {
                version: current.version + 1,
                next_sequence: current.next_sequence,
                channels,
            }));
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::SubscriptionRegistry;
    use crate::error::ControlError;
    use crate::routing::predicate::CompiledPredicate;
    use crate::routing::subscription::SubscriptionRequest;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn request(channel: &str, id: &str, destination: &str, priority: i32) -> SubscriptionRequest {
        SubscriptionRequest {
            channel: channel.to_string(),
            subscription_id: id.to_string(),
            destination_uri: destination.to_string(),
            priority,
            predicate: CompiledPredicate::always(),
        }
    }

    fn ids(registry: &SubscriptionRegistry, channel: &str) -> Vec<String> {
        registry
            .snapshot(channel)
            .iter()
            .map(|entry| entry.subscription_id().to_string())
            .collect()
    }

    #[test]
    fn snapshot_orders_by_priority_then_insertion() {
        let registry = SubscriptionRegistry::default();
        registry.add(request("orders", "A", "d1", 10)).unwrap();
        registry.add(request("orders", "B", "d2", 5)).unwrap();
        registry.add(request("orders", "C", "d3", 5)).unwrap();
        registry.add(request("orders", "D", "d4", 1)).unwrap();

        assert_eq!(ids(&registry, "orders"), ["D", "B", "C", "A"]);
    }

    #[test]
    fn add_replaces_existing_id_atomically() {
        let registry = SubscriptionRegistry::default();
        registry.add(request("orders", "X", "d1", 1)).unwrap();
        registry.add(request("orders", "Y", "d2", 1)).unwrap();

        let replaced = registry
            .add(request("orders", "X", "d3", 1))
            .unwrap()
            .expect("X should be replaced");

        assert_eq!(replaced.destination_uri(), "d1");
        let snapshot = registry.snapshot("orders");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].subscription_id(), "Y");
        assert_eq!(snapshot[1].subscription_id(), "X");
        assert_eq!(snapshot[1].destination_uri(), "d3");
    }

    #[test]
    fn replace_requires_existing_subscription() {
        let registry = SubscriptionRegistry::default();

        assert_eq!(
            registry.replace(request("orders", "A", "d1", 1)).unwrap_err(),
            ControlError::SubscriptionNotFound {
                channel: "orders".to_string(),
                subscription_id: "A".to_string(),
            }
        );
        assert_eq!(registry.version(), 0);

        registry.add(request("orders", "A", "d1", 1)).unwrap();
        let previous = registry.replace(request("orders", "A", "d2", 3)).unwrap();

        assert_eq!(previous.destination_uri(), "d1");
        assert_eq!(registry.snapshot("orders")[0].destination_uri(), "d2");
    }

    #[test]
    fn add_rejects_empty_identifiers() {
        let registry = SubscriptionRegistry::default();

        for bad in [
            request("orders", "", "d1", 1),
            request("orders", "A", " ", 1),
            request("", "A", "d1", 1),
        ] {
            assert!(matches!(
                registry.add(bad),
                Err(ControlError::InvalidSubscription(_))
            ));
        }
        assert_eq!(registry.version(), 0);
        assert!(registry.list(None).is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = SubscriptionRegistry::default();
        registry.add(request("orders", "A", "d1", 1)).unwrap();
        let version = registry.version();

        assert!(!registry.remove("orders", "missing"));
        assert!(!registry.remove("unknown", "A"));
        assert_eq!(registry.version(), version);

        assert!(registry.remove("orders", "A"));
        assert!(!registry.remove("orders", "A"));
        assert!(registry.snapshot("orders").is_empty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutations() {
        let registry = SubscriptionRegistry::default();
        registry.add(request("orders", "A", "d1", 1)).unwrap();
        let snapshot = registry.snapshot("orders");

        registry.remove("orders", "A");
        registry.add(request("orders", "B", "d2", 0)).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].subscription_id(), "A");
        assert!(snapshot.version() < registry.version());
    }

    #[test]
    fn list_filters_by_channel_and_orders_channels_by_name() {
        let registry = SubscriptionRegistry::default();
        registry.add(request("payments", "P", "d1", 1)).unwrap();
        registry.add(request("orders", "O2", "d2", 2)).unwrap();
        registry.add(request("orders", "O1", "d3", 1)).unwrap();

        let all: Vec<String> = registry
            .list(None)
            .iter()
            .map(|entry| entry.subscription_id().to_string())
            .collect();
        assert_eq!(all, ["O1", "O2", "P"]);
        assert_eq!(registry.list(Some("payments")).len(), 1);
        assert!(registry.list(Some("unknown")).is_empty());
        assert!(registry.contains("orders", "O1"));
        assert!(!registry.contains("payments", "O1"));
    }

    #[test]
    fn concurrent_adds_on_distinct_ids_are_all_kept() {
        let registry = Arc::new(SubscriptionRegistry::default());
        let writers: Vec<_> = (0..8)
            .map(|writer| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for n in 0..50 {
                        registry
                            .add(request("orders", &format!("{writer}-{n}"), "d", n % 3))
                            .expect("valid subscription");
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread should finish");
        }

        let snapshot = registry.snapshot("orders");
        assert_eq!(snapshot.len(), 400);
        assert!(snapshot
            .windows(2)
            .all(|pair| pair[0].ordering_key() < pair[1].ordering_key()));
    }

    #[test]
    fn evict_idle_removes_only_idle_subscriptions() {
        let registry = SubscriptionRegistry::new(Some(Duration::from_secs(60)));
        registry.add(request("orders", "idle", "d1", 1)).unwrap();
        registry.add(request("orders", "busy", "d2", 2)).unwrap();
        registry.add(request("audit", "idle-too", "d3", 1)).unwrap();

        let later = Utc::now() + ChronoDuration::seconds(120);
        registry.snapshot("orders")[1]
            .statistics()
            .record_match(later - ChronoDuration::seconds(5));

        assert_eq!(registry.evict_idle(later), 2);
        assert_eq!(ids(&registry, "orders"), ["busy"]);
        assert!(registry.list(Some("audit")).is_empty());
        assert_eq!(registry.evict_idle(later), 0);
    }

    #[test]
    fn evict_idle_is_noop_without_timeout() {
        let registry = SubscriptionRegistry::default();
        registry.add(request("orders", "A", "d1", 1)).unwrap();

        assert_eq!(
            registry.evict_idle(Utc::now() + ChronoDuration::days(365)),
            0
        );
        assert_eq!(registry.list(None).len(), 1);
    }
}
