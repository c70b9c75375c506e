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

mod support;

use dynamic_router::{
    ControlCommand, ControlError, ControlResponse, Message, Predicate, PredicateError,
    PredicateRegistry, PredicateResolutionError, RouterConfig, SubscriptionParameters,
};
use integration_test_utils::{message_on, order_message, subscribe_command, RecordingSender};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use support::{assert_control_ok, list_ids, make_router, make_router_with_listener};

struct PanickingPredicate;

impl Predicate for PanickingPredicate {
    fn evaluate(&self, _message: &Message) -> Result<bool, PredicateError> {
        panic!("predicate bug");
    }
}

fn wire(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

#[tokio::test]
async fn wire_parameters_drive_subscribe_and_unsubscribe() {
    integration_test_utils::init_logging();

    let sender = RecordingSender::new();
    let router = make_router("wire", RouterConfig::default(), Arc::new(sender.clone()));

    let subscribe = ControlCommand::from_parameters(
        "subscribe",
        &wire(&[
            ("subscribeChannel", "orders"),
            ("subscriptionId", "gold"),
            ("destinationUri", "mock:gold"),
            ("priority", "1"),
            ("predicate", "${header.tier} == 'gold'"),
            ("predicateBean", ""),
        ]),
    )
    .expect("wire parameters should parse");
    assert_eq!(
        assert_control_ok(&router, subscribe),
        ControlResponse::Subscribed { replaced: false }
    );

    router
        .route(order_message("gold", 1), true)
        .await
        .expect("gold order should be delivered");
    assert_eq!(sender.destinations(), ["mock:gold"]);

    let unsubscribe = ControlCommand::from_parameters(
        "unsubscribe",
        &wire(&[("subscribeChannel", "orders"), ("subscriptionId", "gold")]),
    )
    .expect("wire parameters should parse");
    assert_eq!(
        assert_control_ok(&router, unsubscribe),
        ControlResponse::Unsubscribed { removed: true }
    );
    assert!(list_ids(&router, None).is_empty());
}

#[tokio::test]
async fn both_predicate_sources_are_rejected() {
    integration_test_utils::init_logging();

    let router = make_router("xor", RouterConfig::default(), Arc::new(RecordingSender::new()));
    let command = ControlCommand::Subscribe(
        SubscriptionParameters::new("orders", "A", "d1", 1)
            .with_predicate("true")
            .with_predicate_bean("isGold"),
    );

    assert!(matches!(
        router.control(command),
        Err(ControlError::InvalidSubscription(_))
    ));
    assert!(list_ids(&router, None).is_empty());
}

#[tokio::test]
async fn subscribe_without_priority_is_rejected() {
    integration_test_utils::init_logging();

    for priority in [None, Some(""), Some("  ")] {
        let mut pairs = vec![
            ("subscribeChannel", "orders"),
            ("subscriptionId", "A"),
            ("destinationUri", "d1"),
        ];
        if let Some(priority) = priority {
            pairs.push(("priority", priority));
        }
        assert_eq!(
            ControlCommand::from_parameters("subscribe", &wire(&pairs)).unwrap_err(),
            ControlError::InvalidSubscription("missing parameter priority".to_string())
        );
    }

    let json = r#"{"action":"subscribe","subscribeChannel":"orders","subscriptionId":"A","destinationUri":"d1"}"#;
    assert!(matches!(
        ControlCommand::from_json(json),
        Err(ControlError::MalformedCommand(_))
    ));
}

#[tokio::test]
async fn deeply_nested_predicate_is_rejected_without_side_effects() {
    integration_test_utils::init_logging();

    let router = make_router("nesting", RouterConfig::default(), Arc::new(RecordingSender::new()));
    assert_control_ok(&router, subscribe_command("orders", "kept", "d0", 1, None));

    for predicate in [
        format!("{}true{}", "(".repeat(20_000), ")".repeat(20_000)),
        format!("{}true", "!".repeat(20_000)),
        vec!["true"; 20_000].join(" && "),
    ] {
        let command = ControlCommand::Subscribe(
            SubscriptionParameters::new("orders", "A", "d1", 1).with_predicate(&predicate),
        );
        assert!(matches!(
            router.control(command),
            Err(ControlError::PredicateResolution(
                PredicateResolutionError::Parse { .. }
            ))
        ));
    }

    assert_eq!(list_ids(&router, None), ["kept"]);
}

#[tokio::test]
async fn update_of_missing_subscription_commits_nothing() {
    integration_test_utils::init_logging();

    let router = make_router("update", RouterConfig::default(), Arc::new(RecordingSender::new()));
    let update = ControlCommand::Update(SubscriptionParameters::new("orders", "A", "d1", 1));

    assert_eq!(
        router.control(update.clone()).unwrap_err(),
        ControlError::SubscriptionNotFound {
            channel: "orders".to_string(),
            subscription_id: "A".to_string(),
        }
    );
    assert!(list_ids(&router, None).is_empty());

    assert_control_ok(&router, subscribe_command("orders", "A", "d0", 1, None));
    assert_eq!(assert_control_ok(&router, update), ControlResponse::Updated);
    assert_eq!(router.subscriptions(Some("orders"))[0].destination_uri(), "d1");
}

#[tokio::test]
async fn statistics_count_matches_per_subscription() {
    integration_test_utils::init_logging();

    let router = make_router("stats", RouterConfig::default(), Arc::new(RecordingSender::new()));
    assert_control_ok(
        &router,
        subscribe_command("orders", "gold", "d1", 1, Some("${header.tier} == 'gold'")),
    );
    assert_control_ok(&router, subscribe_command("orders", "rest", "d2", 2, None));

    for tier in ["gold", "silver", "gold", "bronze", "gold"] {
        router
            .route(order_message(tier, 1), true)
            .await
            .expect("every order has a destination");
    }

    let ControlResponse::Statistics { statistics } =
        assert_control_ok(&router, ControlCommand::statistics(Some("orders")))
    else {
        panic!("statistics should answer with statistics");
    };
    let counts: Vec<(&str, u64)> = statistics
        .iter()
        .map(|view| (view.subscription_id.as_str(), view.matched_count))
        .collect();
    assert_eq!(counts, [("gold", 3), ("rest", 2)]);
    assert!(statistics[0].first_matched_at <= statistics[0].last_matched_at);
}

#[tokio::test]
async fn panicking_predicate_is_a_non_match() {
    integration_test_utils::init_logging();

    let predicates = PredicateRegistry::new();
    predicates.register("buggy", Arc::new(PanickingPredicate));
    let sender = RecordingSender::new();
    let (router, _listener) = make_router_with_listener(
        "panic",
        RouterConfig::default(),
        Arc::new(sender.clone()),
        predicates,
    );
    assert_control_ok(
        &router,
        ControlCommand::Subscribe(
            SubscriptionParameters::new("orders", "buggy", "d-buggy", 1)
                .with_predicate_bean("buggy"),
        ),
    );
    assert_control_ok(&router, subscribe_command("orders", "safe", "d-safe", 2, None));

    router
        .route(message_on("orders", "{}"), true)
        .await
        .expect("routing continues past the panicking predicate");

    assert_eq!(sender.destinations(), ["d-safe"]);
}

#[tokio::test]
async fn idle_subscriptions_are_evicted() {
    integration_test_utils::init_logging();

    let config = RouterConfig {
        idle_timeout: Some(Duration::from_millis(50)),
        ..RouterConfig::default()
    };
    let router = make_router("idle", config, Arc::new(RecordingSender::new()));
    assert_control_ok(
        &router,
        subscribe_command("orders", "idle", "d1", 1, Some("${header.tier} == 'never'")),
    );
    assert_control_ok(&router, subscribe_command("orders", "busy", "d2", 2, None));

    tokio::time::sleep(Duration::from_millis(120)).await;
    router
        .route(message_on("orders", "{}"), true)
        .await
        .expect("busy matches");

    assert_eq!(router.evict_idle(), 1);
    assert_eq!(list_ids(&router, None), ["busy"]);
}

#[test]
fn control_responses_serialize_as_tagged_json() {
    let response = serde_json::to_value(ControlResponse::Unsubscribed { removed: true })
        .expect("response should serialize");

    assert_eq!(response["response"], "unsubscribed");
    assert_eq!(response["removed"], true);
}
