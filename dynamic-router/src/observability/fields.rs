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

//! Canonical structured field keys and value-format helpers.

use crate::message::Message;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const WORKER_ID: &str = "worker_id";
pub const WORKER_THREAD: &str = "worker_thread";

pub const MSG_ID: &str = "msg_id";
pub const CHANNEL: &str = "channel";
pub const SUBSCRIPTION_ID: &str = "subscription_id";
pub const DESTINATION_URI: &str = "destination_uri";
pub const PRIORITY: &str = "priority";

pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const REASON_QUEUE_CLOSED: &str = "queue_closed";
pub const REASON_INVALID_THREAD_NAME: &str = "invalid_thread_name";
pub const DEFAULT_WORKER_THREAD: &str = "unknown-thread";

const MAX_BODY_PREVIEW_CHARS: usize = 64;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkerContext {
    pub worker_id: String,
    pub worker_thread: String,
}

impl WorkerContext {
    pub fn with_current_thread(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_thread: current_thread_name_or_default(),
        }
    }
}

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_WORKER_THREAD).to_string()
}

pub fn current_thread_name_or_default() -> String {
    thread_name_or_default(std::thread::current().name())
}

pub fn format_message_id(message: &Message) -> String {
    message.id().hyphenated().to_string()
}

/// Truncated body for debug logs; keeps log lines bounded for large payloads.
pub fn format_body_preview(message: &Message) -> String {
    let body = message.body();
    if body.chars().count() <= MAX_BODY_PREVIEW_CHARS {
        body.to_string()
    } else {
        let mut preview: String = body.chars().take(MAX_BODY_PREVIEW_CHARS).collect();
        preview.push_str("...");
        preview
    }
}
