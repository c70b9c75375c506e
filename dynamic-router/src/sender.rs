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

use crate::error::DeliveryFailure;
use crate::message::Message;
use crate::observability::events;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

///
/// [`MessageSender`] is the outbound transport boundary of the router.
///
/// The router hands each selected message to `send` together with the subscription's
/// `destination_uri`. The URI is opaque to the router; interpreting it is the sender's job.
/// An `Err` is reported as a delivery failure for that subscription and is never retried.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use dynamic_router::{Message, MessageSender};
///
/// struct PrintSender;
///
/// #[async_trait]
/// impl MessageSender for PrintSender {
///     async fn send(&self, destination_uri: &str, message: Arc<Message>) -> Result<(), String> {
///         println!("{destination_uri} <- {}", message.body());
///         Ok(())
///     }
/// }
///
/// let sender: Arc<dyn MessageSender> = Arc::new(PrintSender);
/// ```
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, destination_uri: &str, message: Arc<Message>) -> Result<(), String>;
}

/// Side channel for delivery failures of asynchronously routed messages.
pub trait DeliveryFailureListener: Send + Sync {
    fn on_delivery_failure(&self, failure: DeliveryFailure);
}

/// Default listener: logs each failure and drops it.
pub struct LoggingFailureListener;

impl DeliveryFailureListener for LoggingFailureListener {
    fn on_delivery_failure(&self, failure: DeliveryFailure) {
        warn!(
            event = events::ASYNC_DELIVERY_FAILED,
            component = "failure_listener",
            msg_id = %failure.message_id,
            channel = failure.channel.as_str(),
            subscription_id = failure.subscription_id.as_str(),
            destination_uri = failure.destination_uri.as_str(),
            err = %failure.error,
            "asynchronous delivery failed"
        );
    }
}
