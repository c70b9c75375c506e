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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

///
/// [`Message`] is the unit routed by the [`DynamicRouter`][crate::DynamicRouter].
///
/// The routing channel is a fixed field of the message; the router never inspects
/// headers or body to find it. Headers and body are only read by predicates.
///
/// # Examples
///
/// ```
/// use dynamic_router::Message;
///
/// let message = Message::new("orders", "{\"total\": 42}")
///     .with_header("region", "emea")
///     .with_header("priority", "high");
///
/// assert_eq!(message.channel(), "orders");
/// assert_eq!(message.header("region"), Some("emea"));
/// assert_eq!(message.header("missing"), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    channel: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: String,
}

impl Message {
    pub fn new(channel: &str, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}
