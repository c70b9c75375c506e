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

mod config;
mod sinks;

use crate::config::{Config, ConfigError};
use crate::sinks::SinkSender;
use clap::Parser;
use dynamic_router::{ControlCommand, DynamicRouter, Message};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command()]
struct RouterArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

/// One line read from stdin.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum InputLine {
    Control(ControlCommand),
    Route {
        message: Message,
        #[serde(default)]
        synchronous: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    info!("Started configurable-router");

    let args = RouterArgs::parse();
    let config = Config::load(&args.config)?;
    let predicates = config.predicate_registry()?;

    let router = Arc::new(DynamicRouter::new(
        &config.router_name,
        config.router.clone(),
        Arc::new(SinkSender),
        predicates,
    ));

    for parameters in config.subscriptions.iter().cloned() {
        let subscription_id = parameters.subscription_id.clone();
        router
            .control(ControlCommand::Subscribe(parameters))
            .map_err(|source| ConfigError::Subscription {
                subscription_id,
                source,
            })?;
    }

    if config.router.idle_timeout.is_some() {
        let router = router.clone();
        let mut ticker = tokio::time::interval(config.eviction_interval());
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let evicted = router.evict_idle();
                if evicted > 0 {
                    info!(evicted, "evicted idle subscriptions");
                }
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(err = %err, "unable to read stdin; stopping");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        handle_line(&router, &line).await;
    }

    info!("stdin closed; configurable-router exiting");
    Ok(())
}

async fn handle_line(router: &DynamicRouter, line: &str) {
    let input: InputLine = match serde_json::from_str(line) {
        Ok(input) => input,
        Err(err) => {
            emit_error(&format!("malformed input line: {err}"));
            return;
        }
    };

    match input {
        InputLine::Control(command) => match router.control(command) {
            Ok(response) => match response.to_json() {
                Ok(json) => println!("{json}"),
                Err(err) => emit_error(&format!("unable to encode response: {err}")),
            },
            Err(err) => emit_error(&err.to_string()),
        },
        InputLine::Route {
            message,
            synchronous,
        } => {
            let synchronous =
                synchronous.unwrap_or(router.default_route_options().synchronous);
            match router.route(message, synchronous).await {
                Ok(outcome) => match serde_json::to_string(&outcome) {
                    Ok(json) => println!("{json}"),
                    Err(err) => emit_error(&format!("unable to encode outcome: {err}")),
                },
                Err(err) => emit_error(&err.to_string()),
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorLine<'a> {
    error: &'a str,
}

fn emit_error(error: &str) {
    match serde_json::to_string(&ErrorLine { error }) {
        Ok(json) => println!("{json}"),
        Err(err) => warn!(err = %err, "unable to encode error line"),
    }
}
