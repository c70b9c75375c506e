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

use dynamic_router::{
    ControlError, Expression, PredicateRegistry, PredicateResolutionError, RouterConfig,
    SubscriptionParameters,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_ROUTER_NAME: &str = "dynamic-router";
const DEFAULT_EVICTION_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("unable to parse config file '{path}': {source}")]
    Parse { path: String, source: json5::Error },
    #[error("invalid predicate '{name}': {source}")]
    Predicate {
        name: String,
        source: PredicateResolutionError,
    },
    #[error("invalid initial subscription '{subscription_id}': {source}")]
    Subscription {
        subscription_id: String,
        source: ControlError,
    },
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_router_name")]
    pub(crate) router_name: String,
    #[serde(default)]
    pub(crate) router: RouterConfig,
    #[serde(default = "default_eviction_interval_ms")]
    pub(crate) eviction_interval_ms: u64,
    /// Named inline expressions, registered as predicate beans.
    #[serde(default)]
    pub(crate) predicates: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) subscriptions: Vec<SubscriptionParameters>,
}

fn default_router_name() -> String {
    DEFAULT_ROUTER_NAME.to_string()
}

fn default_eviction_interval_ms() -> u64 {
    DEFAULT_EVICTION_INTERVAL_MS
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        json5::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms.max(1))
    }

    pub fn predicate_registry(&self) -> Result<PredicateRegistry, ConfigError> {
        let registry = PredicateRegistry::new();
        for (name, text) in &self.predicates {
            let expression = Expression::compile(text).map_err(|source| ConfigError::Predicate {
                name: name.clone(),
                source,
            })?;
            registry.register(name, Arc::new(expression));
        }
        Ok(registry)
    }
}
