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

use dynamic_router::{ControlCommand, Message, SubscriptionParameters};

pub fn message_on(channel: &str, body: &str) -> Message {
    Message::new(channel, body)
}

/// An `orders` message with the `tier` and `amount` headers most tests filter on.
pub fn order_message(tier: &str, amount: u32) -> Message {
    Message::new("orders", format!("{{\"tier\":\"{tier}\",\"amount\":{amount}}}"))
        .with_header("tier", tier)
        .with_header("amount", amount.to_string())
}

/// `subscribe` with an optional inline expression.
pub fn subscribe_command(
    channel: &str,
    subscription_id: &str,
    destination_uri: &str,
    priority: i32,
    predicate: Option<&str>,
) -> ControlCommand {
    let parameters =
        SubscriptionParameters::new(channel, subscription_id, destination_uri, priority);
    ControlCommand::Subscribe(match predicate {
        Some(expression) => parameters.with_predicate(expression),
        None => parameters,
    })
}
