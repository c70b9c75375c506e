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

//! Error taxonomy shared by the control surface and the routing engine.
//!
//! Every error is scoped to a single control command or a single message.

use crate::outcome::DeliveryReport;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// A named predicate or an inline expression could not be turned into a compiled predicate.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PredicateResolutionError {
    #[error("no predicate registered under name '{0}'")]
    UnknownPredicate(String),
    #[error("unsupported expression language '{0}'")]
    UnsupportedLanguage(String),
    #[error("unable to compile expression '{expression}': {reason}")]
    Parse { expression: String, reason: String },
}

/// Failures reported to the caller of the control surface.
///
/// None of these leave partial state behind in the registry.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ControlError {
    #[error("invalid subscription: {0}")]
    InvalidSubscription(String),
    #[error(transparent)]
    PredicateResolution(#[from] PredicateResolutionError),
    #[error("subscription '{subscription_id}' not found on channel '{channel}'")]
    SubscriptionNotFound {
        channel: String,
        subscription_id: String,
    },
    #[error("unknown control command '{0}'")]
    UnknownCommand(String),
    #[error("malformed control command: {0}")]
    MalformedCommand(String),
}

/// Raised by a [`Predicate`][crate::Predicate] that cannot decide on a message.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("predicate evaluation failed: {0}")]
pub struct PredicateError(pub String);

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DeliveryError {
    #[error("destination rejected message: {0}")]
    Rejected(String),
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
    #[error("egress queue is full")]
    QueueFull,
    #[error("egress worker is unavailable")]
    WorkerUnavailable,
}

/// One failed delivery attempt for one subscription.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeliveryFailure {
    pub message_id: Uuid,
    pub channel: String,
    pub subscription_id: String,
    pub destination_uri: String,
    pub error: DeliveryError,
}

impl Display for DeliveryFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "delivery of message {} to '{}' (subscription '{}' on channel '{}') failed: {}",
            self.message_id, self.destination_uri, self.subscription_id, self.channel, self.error
        )
    }
}

impl std::error::Error for DeliveryFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Failures surfaced to the originator of a routed message.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RoutingError {
    #[error("no matching subscription on channel '{channel}'")]
    NoMatchingSubscription { channel: String },
    #[error(
        "{} of {} deliveries failed",
        .failures.len(),
        .failures.len() + .delivered.len()
    )]
    DeliveryFailed {
        failures: Vec<DeliveryFailure>,
        delivered: Vec<DeliveryReport>,
    },
}

#[cfg(test)]
mod tests {
    use super::{
        ControlError, DeliveryError, DeliveryFailure, PredicateResolutionError, RoutingError,
    };
    use crate::outcome::DeliveryReport;
    use std::error::Error;
    use uuid::Uuid;

    fn failure() -> DeliveryFailure {
        DeliveryFailure {
            message_id: Uuid::nil(),
            channel: "orders".to_string(),
            subscription_id: "A".to_string(),
            destination_uri: "mock:a".to_string(),
            error: DeliveryError::Rejected("boom".to_string()),
        }
    }

    #[test]
    fn predicate_resolution_error_is_transparent_in_control_error() {
        let error = ControlError::from(PredicateResolutionError::UnknownPredicate(
            "isGold".to_string(),
        ));

        assert_eq!(
            error.to_string(),
            "no predicate registered under name 'isGold'"
        );
    }

    #[test]
    fn delivery_failure_exposes_display_and_source() {
        let failure = failure();

        assert!(failure.to_string().contains("mock:a"));
        assert!(failure.source().is_some());
    }

    #[test]
    fn delivery_failed_display_counts_attempts() {
        let error = RoutingError::DeliveryFailed {
            failures: vec![failure()],
            delivered: vec![DeliveryReport {
                subscription_id: "B".to_string(),
                destination_uri: "mock:b".to_string(),
            }],
        };

        assert_eq!(error.to_string(), "1 of 2 deliveries failed");
    }
}
