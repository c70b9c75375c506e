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

use async_trait::async_trait;
use dynamic_router::{Message, MessageSender};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// One message accepted by a test sender.
#[derive(Clone, Debug)]
pub struct Delivery {
    pub destination_uri: String,
    pub message: Arc<Message>,
}

/// Accepts every message and keeps it for inspection.
#[derive(Clone, Default)]
pub struct RecordingSender {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn destinations(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|delivery| delivery.destination_uri.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, destination_uri: &str, message: Arc<Message>) -> Result<(), String> {
        debug!(destination_uri, msg_id = %message.id(), "within recording_sender!");
        self.deliveries.lock().unwrap().push(Delivery {
            destination_uri: destination_uri.to_string(),
            message,
        });
        Ok(())
    }
}

/// Rejects messages for the configured destinations and records the rest.
#[derive(Clone, Default)]
pub struct FailingSender {
    failing: Arc<HashSet<String>>,
    accepted: RecordingSender,
}

impl FailingSender {
    pub fn new<'a>(failing: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            failing: Arc::new(failing.into_iter().map(str::to_string).collect()),
            accepted: RecordingSender::new(),
        }
    }

    pub fn accepted(&self) -> &RecordingSender {
        &self.accepted
    }
}

#[async_trait]
impl MessageSender for FailingSender {
    async fn send(&self, destination_uri: &str, message: Arc<Message>) -> Result<(), String> {
        if self.failing.contains(destination_uri) {
            return Err(format!("{destination_uri} refused the message"));
        }
        self.accepted.send(destination_uri, message).await
    }
}

/// Delays delivery to the configured destinations, then records every message.
#[derive(Clone, Default)]
pub struct SlowSender {
    slow: Arc<HashSet<String>>,
    delay: Duration,
    accepted: RecordingSender,
}

impl SlowSender {
    pub fn new<'a>(slow: impl IntoIterator<Item = &'a str>, delay: Duration) -> Self {
        Self {
            slow: Arc::new(slow.into_iter().map(str::to_string).collect()),
            delay,
            accepted: RecordingSender::new(),
        }
    }

    pub fn accepted(&self) -> &RecordingSender {
        &self.accepted
    }
}

#[async_trait]
impl MessageSender for SlowSender {
    async fn send(&self, destination_uri: &str, message: Arc<Message>) -> Result<(), String> {
        if self.slow.contains(destination_uri) {
            tokio::time::sleep(self.delay).await;
        }
        self.accepted.send(destination_uri, message).await
    }
}
