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

//! Control-plane layer.
//!
//! Owns the subscription lifecycle commands (`subscribe`, `update`, `unsubscribe`,
//! `list`, `statistics`). A command either commits completely or leaves the registry
//! untouched: predicates are resolved and compiled before the registry is written.
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use dynamic_router::{
//!     ControlCommand, ControlResponse, DynamicRouter, Message, MessageSender, PredicateRegistry,
//!     RouterConfig, SubscriptionParameters,
//! };
//!
//! struct NoopSender;
//!
//! #[async_trait]
//! impl MessageSender for NoopSender {
//!     async fn send(&self, _destination_uri: &str, _message: Arc<Message>) -> Result<(), String> {
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let router = DynamicRouter::new(
//!     "control-plane-doc",
//!     RouterConfig::default(),
//!     Arc::new(NoopSender),
//!     PredicateRegistry::new(),
//! );
//!
//! let subscribe = ControlCommand::Subscribe(
//!     SubscriptionParameters::new("orders", "gold", "mock:gold", 1)
//!         .with_predicate("${header.tier} == 'gold'"),
//! );
//! router.control(subscribe).unwrap();
//!
//! // Unknown predicate beans are rejected and nothing is registered.
//! let broken = ControlCommand::Subscribe(
//!     SubscriptionParameters::new("orders", "x", "mock:x", 1).with_predicate_bean("missing"),
//! );
//! assert!(router.control(broken).is_err());
//!
//! let ControlResponse::Subscriptions { subscriptions } =
//!     router.control(ControlCommand::list(None)).unwrap()
//! else {
//!     unreachable!()
//! };
//! assert_eq!(subscriptions.len(), 1);
//! # });
//! ```

pub(crate) mod command;
pub(crate) mod control_surface;
