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

//! # dynamic-router
//!
//! `dynamic-router` is a content-based router whose subscription table can change while
//! messages are being routed.
//!
//! Each subscription pairs a predicate (a named [`Predicate`] or an inline expression) with
//! a destination URI and a priority. A routed message is evaluated against the subscriptions
//! of its channel in priority order and forwarded to the first match, or to every match in
//! multicast mode. Delivery goes through a caller supplied [`MessageSender`].
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use dynamic_router::{
//!     ControlCommand, DynamicRouter, Message, MessageSender, PredicateRegistry, RouterConfig,
//!     SubscriptionParameters,
//! };
//!
//! struct PrintSender;
//!
//! #[async_trait]
//! impl MessageSender for PrintSender {
//!     async fn send(&self, destination_uri: &str, message: Arc<Message>) -> Result<(), String> {
//!         println!("{destination_uri} <- {}", message.body());
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let predicates = PredicateRegistry::new();
//! predicates.register_fn("isGold", |message| message.header("tier") == Some("gold"));
//!
//! let router = DynamicRouter::new(
//!     "quick-start",
//!     RouterConfig::default(),
//!     Arc::new(PrintSender),
//!     predicates,
//! );
//!
//! router
//!     .control(ControlCommand::Subscribe(
//!         SubscriptionParameters::new("orders", "gold", "mock:gold", 1)
//!             .with_predicate_bean("isGold"),
//!     ))
//!     .unwrap();
//! router
//!     .control(ControlCommand::subscribe("orders", "rest", "mock:rest", 10))
//!     .unwrap();
//!
//! let gold = Message::new("orders", "{}").with_header("tier", "gold");
//! let outcome = router.route(gold, true).await.unwrap();
//! assert_eq!(outcome.destinations(), ["mock:gold"]);
//!
//! let silver = Message::new("orders", "{}").with_header("tier", "silver");
//! let outcome = router.route(silver, true).await.unwrap();
//! assert_eq!(outcome.destinations(), ["mock:rest"]);
//! # });
//! ```
//!
//! ## Routing contract
//!
//! - Subscriptions are ordered by ascending priority; equal priorities keep subscription
//!   order, and a re-subscribe moves the subscription behind its peers.
//! - A message that matches nothing is dropped, or fails with
//!   [`RoutingError::NoMatchingSubscription`] under [`UnroutablePolicy::Fail`].
//! - Synchronous delivery is bounded by the delivery timeout. A timed out first match is
//!   reported as a failure; the message is not offered to the next subscription.
//! - Asynchronous delivery failures go to the [`DeliveryFailureListener`].
//!
//! ## Internal architecture map
//!
//! - API facade: outward `DynamicRouter` surface
//! - Control plane: subscription lifecycle commands and their single dispatcher
//! - Routing: subscription model, copy-on-write registry, predicates and expressions
//! - Data plane: routing engine, delivery attempts and egress worker pool
//! - Runtime: worker thread and tokio runtime boundaries
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not unconditionally initialize a global
//! subscriber. Binaries/tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

mod config;
pub use config::{
    DispatchPolicy, EgressConfig, MulticastAggregation, RouteOptions, RouterConfig,
    UnroutablePolicy,
};

mod error;
pub use error::{
    ControlError, DeliveryError, DeliveryFailure, PredicateError, PredicateResolutionError,
    RoutingError,
};

mod message;
pub use message::Message;

mod outcome;
pub use outcome::{DeliveryReport, RoutingOutcome};

mod sender;
pub use sender::{DeliveryFailureListener, LoggingFailureListener, MessageSender};

mod control_plane;
pub use control_plane::command::{ControlCommand, ControlResponse, SubscriptionParameters};

mod data_plane;

#[doc(hidden)]
pub mod observability;

mod routing;
pub use routing::expression::Expression;
pub use routing::predicate::{
    CompiledPredicate, Predicate, PredicateRegistry, PredicateSpec, SIMPLE_LANGUAGE,
};
pub use routing::subscription::{
    Subscription, SubscriptionStatistics, SubscriptionStatisticsView, SubscriptionView,
};
pub use routing::subscription_registry::{ChannelSnapshot, SubscriptionRegistry};

mod runtime;

mod router;
pub use router::DynamicRouter;
