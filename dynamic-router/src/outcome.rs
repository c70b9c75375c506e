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

//! Results of a single routing decision.

use serde::Serialize;

/// A delivery that completed successfully.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub subscription_id: String,
    pub destination_uri: String,
}

/// Terminal state of a routed message that did not fail.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoutingOutcome {
    /// Synchronous delivery finished for every awaited subscription.
    ///
    /// Under `WaitFirst` aggregation the remaining matches were handed off asynchronously
    /// and are listed in `dispatched`.
    Delivered {
        delivered: Vec<DeliveryReport>,
        dispatched: Vec<String>,
    },
    /// Asynchronous hand-off to the egress workers; holds destination URIs in priority order.
    Dispatched { destinations: Vec<String> },
    /// Nothing matched and the unroutable policy is to drop.
    Dropped,
}

impl RoutingOutcome {
    /// Destination URIs the message went to (or was handed off to), in priority order.
    pub fn destinations(&self) -> Vec<&str> {
        match self {
            RoutingOutcome::Delivered {
                delivered,
                dispatched,
            } => delivered
                .iter()
                .map(|report| report.destination_uri.as_str())
                .chain(dispatched.iter().map(String::as_str))
                .collect(),
            RoutingOutcome::Dispatched { destinations } => {
                destinations.iter().map(String::as_str).collect()
            }
            RoutingOutcome::Dropped => Vec::new(),
        }
    }
}
