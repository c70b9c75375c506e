/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
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

//! Router configuration and per-route routing options.
//!
//! All types deserialize from the `json5`/`json` config files read by the router binaries.
//! Durations are expressed in milliseconds on the wire.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_EGRESS_WORKERS: usize = 4;
const DEFAULT_EGRESS_QUEUE_SIZE: usize = 1024;

/// Which of the matching subscriptions receive a message.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// Deliver to the highest-priority match only.
    #[default]
    FirstMatch,
    /// Deliver to every match, in priority order.
    Multicast,
}

/// What happens to a message that matches no subscription.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnroutablePolicy {
    #[default]
    Drop,
    Fail,
}

/// How long a synchronous multicast waits.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MulticastAggregation {
    /// Wait for every matching destination.
    #[default]
    WaitAll,
    /// Wait for the highest-priority destination; the others are delivered asynchronously.
    WaitFirst,
}

/// Routing behavior applied to one routed message.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteOptions {
    pub dispatch_policy: DispatchPolicy,
    pub unroutable_policy: UnroutablePolicy,
    pub multicast_aggregation: MulticastAggregation,
    pub synchronous: bool,
    #[serde(rename = "delivery_timeout_ms", with = "duration_ms")]
    pub delivery_timeout: Duration,
    /// Log dropped messages at `warn` instead of `debug`.
    pub warn_dropped_messages: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            dispatch_policy: DispatchPolicy::default(),
            unroutable_policy: UnroutablePolicy::default(),
            multicast_aggregation: MulticastAggregation::default(),
            synchronous: false,
            delivery_timeout: Duration::from_millis(DEFAULT_DELIVERY_TIMEOUT_MS),
            warn_dropped_messages: false,
        }
    }
}

impl RouteOptions {
    pub fn with_dispatch_policy(mut self, dispatch_policy: DispatchPolicy) -> Self {
        self.dispatch_policy = dispatch_policy;
        self
    }

    pub fn with_unroutable_policy(mut self, unroutable_policy: UnroutablePolicy) -> Self {
        self.unroutable_policy = unroutable_policy;
        self
    }

    pub fn with_multicast_aggregation(mut self, aggregation: MulticastAggregation) -> Self {
        self.multicast_aggregation = aggregation;
        self
    }

    pub fn with_synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    pub fn with_delivery_timeout(mut self, delivery_timeout: Duration) -> Self {
        self.delivery_timeout = delivery_timeout;
        self
    }
}

/// Sizing of the asynchronous delivery worker pool.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EgressConfig {
    pub workers: usize,
    pub queue_size: usize,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_EGRESS_WORKERS,
            queue_size: DEFAULT_EGRESS_QUEUE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Defaults for [`DynamicRouter::route`][crate::DynamicRouter::route].
    pub route: RouteOptions,
    pub egress: EgressConfig,
    /// Subscriptions that neither match nor get re-subscribed within this window are evicted.
    #[serde(rename = "idle_timeout_ms", with = "optional_duration_ms")]
    pub idle_timeout: Option<Duration>,
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|millis| millis.map(Duration::from_millis))
    }
}
