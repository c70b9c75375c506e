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

use crate::config::{RouteOptions, RouterConfig};
use crate::control_plane::command::{ControlCommand, ControlResponse};
use crate::control_plane::control_surface::ControlSurface;
use crate::data_plane::egress_pool::EgressPool;
use crate::data_plane::routing_engine::RoutingEngine;
use crate::error::{ControlError, RoutingError};
use crate::message::Message;
use crate::outcome::RoutingOutcome;
use crate::routing::predicate::PredicateRegistry;
use crate::routing::subscription::Subscription;
use crate::routing::subscription_registry::SubscriptionRegistry;
use crate::sender::{DeliveryFailureListener, LoggingFailureListener, MessageSender};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

const DYNAMIC_ROUTER_TAG: &str = "DynamicRouter:";

/// Content-based router over a live subscription table.
///
/// Control commands and routed messages can be issued concurrently from any number of tasks;
/// each routed message sees one consistent snapshot of its channel.
pub struct DynamicRouter {
    name: String,
    defaults: RouteOptions,
    registry: Arc<SubscriptionRegistry>,
    control: ControlSurface,
    engine: RoutingEngine,
}

impl DynamicRouter {
    /// Creates a router that logs asynchronous delivery failures.
    pub fn new(
        name: &str,
        config: RouterConfig,
        sender: Arc<dyn MessageSender>,
        predicates: PredicateRegistry,
    ) -> Self {
        Self::with_failure_listener(
            name,
            config,
            sender,
            predicates,
            Arc::new(LoggingFailureListener),
        )
    }

    /// Creates a router that hands asynchronous delivery failures to `failure_listener`.
    pub fn with_failure_listener(
        name: &str,
        config: RouterConfig,
        sender: Arc<dyn MessageSender>,
        predicates: PredicateRegistry,
        failure_listener: Arc<dyn DeliveryFailureListener>,
    ) -> Self {
        let name = format!("{DYNAMIC_ROUTER_TAG}{name}");
        let registry = Arc::new(SubscriptionRegistry::new(config.idle_timeout));
        let egress = EgressPool::new(&config.egress, sender.clone(), failure_listener);
        info!(
            component = "dynamic_router",
            router = name.as_str(),
            egress_workers = egress.worker_count(),
            idle_timeout_ms = config.idle_timeout.map(|timeout| timeout.as_millis() as u64),
            "dynamic router started"
        );

        Self {
            control: ControlSurface::new(&name, registry.clone(), predicates),
            engine: RoutingEngine::new(registry.clone(), sender, egress),
            defaults: config.route,
            registry,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing options used by [`route`][Self::route].
    pub fn default_route_options(&self) -> &RouteOptions {
        &self.defaults
    }

    /// Executes one control command.
    pub fn control(&self, command: ControlCommand) -> Result<ControlResponse, ControlError> {
        self.control.handle(command)
    }

    /// Routes with the configured defaults, overriding only the delivery mode.
    pub async fn route(
        &self,
        message: Message,
        synchronous: bool,
    ) -> Result<RoutingOutcome, RoutingError> {
        let options = self.defaults.clone().with_synchronous(synchronous);
        self.route_with(message, &options).await
    }

    pub async fn route_with(
        &self,
        message: Message,
        options: &RouteOptions,
    ) -> Result<RoutingOutcome, RoutingError> {
        self.engine.route(Arc::new(message), options).await
    }

    /// Current subscriptions, optionally limited to one channel.
    pub fn subscriptions(&self, channel: Option<&str>) -> Vec<Subscription> {
        self.registry.list(channel)
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Evicts subscriptions idle longer than the configured idle timeout.
    pub fn evict_idle(&self) -> usize {
        self.registry.evict_idle(Utc::now())
    }
}
