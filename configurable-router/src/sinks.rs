/********************************************************************************
 * Copyright (c) 2025 Contributors to the Eclipse Foundation
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

//! Built-in destinations: `log:<name>` and `stdout:<name>`.

use async_trait::async_trait;
use dynamic_router::{Message, MessageSender};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

const LOG_SCHEME: &str = "log";
const STDOUT_SCHEME: &str = "stdout";

pub(crate) struct SinkSender;

#[derive(Serialize)]
struct StdoutRecord<'a> {
    destination: &'a str,
    message: &'a Message,
}

#[async_trait]
impl MessageSender for SinkSender {
    async fn send(&self, destination_uri: &str, message: Arc<Message>) -> Result<(), String> {
        let (scheme, target) = destination_uri
            .split_once(':')
            .ok_or_else(|| format!("destination '{destination_uri}' has no scheme"))?;

        match scheme {
            LOG_SCHEME => {
                info!(
                    target_sink = target,
                    msg_id = %message.id(),
                    channel = message.channel(),
                    body = message.body(),
                    "message delivered"
                );
                Ok(())
            }
            STDOUT_SCHEME => {
                let record = StdoutRecord {
                    destination: target,
                    message: &message,
                };
                let line = serde_json::to_string(&record).map_err(|err| err.to_string())?;
                println!("{line}");
                Ok(())
            }
            other => Err(format!("unsupported destination scheme '{other}'")),
        }
    }
}
