//! Per-message routing: snapshot, priority walk, dispatch policy and delivery.

use crate::config::{DispatchPolicy, MulticastAggregation, RouteOptions, UnroutablePolicy};
use crate::data_plane::delivery::DeliveryJob;
use crate::data_plane::egress_pool::EgressPool;
use crate::error::{DeliveryError, DeliveryFailure, RoutingError};
use crate::message::Message;
use crate::observability::{events, fields};
use crate::outcome::{DeliveryReport, RoutingOutcome};
use crate::routing::subscription_registry::SubscriptionRegistry;
use crate::sender::MessageSender;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn, Level};

const COMPONENT: &str = "routing_engine";

pub(crate) struct RoutingEngine {
    registry: Arc<SubscriptionRegistry>,
    sender: Arc<dyn MessageSender>,
    egress: EgressPool,
}

impl RoutingEngine {
    pub(crate) fn new(
        registry: Arc<SubscriptionRegistry>,
        sender: Arc<dyn MessageSender>,
        egress: EgressPool,
    ) -> Self {
        Self {
            registry,
            sender,
            egress,
        }
    }

    /// Routes one message against the channel snapshot taken when routing starts.
    pub(crate) async fn route(
        &self,
        message: Arc<Message>,
        options: &RouteOptions,
    ) -> Result<RoutingOutcome, RoutingError> {
        let msg_id = tracing::enabled!(Level::DEBUG).then(|| fields::format_message_id(&message));
        if let Some(msg_id) = msg_id.as_deref() {
            debug!(
                event = events::ROUTE_RECEIVED,
                component = COMPONENT,
                msg_id,
                channel = message.channel(),
                body = %fields::format_body_preview(&message),
                "message received"
            );
        }

        let snapshot = self.registry.snapshot(message.channel());
        if let Some(msg_id) = msg_id.as_deref() {
            debug!(
                event = events::ROUTE_CHANNEL_RESOLVED,
                component = COMPONENT,
                msg_id,
                channel = message.channel(),
                subscriptions = snapshot.len(),
                version = snapshot.version(),
                "channel snapshot taken"
            );
        }

        let now = Utc::now();
        let mut jobs = Vec::new();
        for subscription in snapshot.iter() {
            if !subscription.predicate().evaluate(&message) {
                continue;
            }
            subscription.statistics().record_match(now);
            if let Some(msg_id) = msg_id.as_deref() {
                debug!(
                    event = events::ROUTE_SUBSCRIPTION_MATCHED,
                    component = COMPONENT,
                    msg_id,
                    channel = message.channel(),
                    subscription_id = subscription.subscription_id(),
                    destination_uri = subscription.destination_uri(),
                    priority = subscription.priority(),
                    "subscription matched"
                );
            }
            jobs.push(DeliveryJob::new(
                message.clone(),
                subscription,
                options.delivery_timeout,
            ));
            if options.dispatch_policy == DispatchPolicy::FirstMatch {
                break;
            }
        }

        if jobs.is_empty() {
            return self.unroutable(&message, options);
        }

        let outcome = if !options.synchronous {
            Ok(RoutingOutcome::Dispatched {
                destinations: self.dispatch_all(jobs),
            })
        } else if options.dispatch_policy == DispatchPolicy::Multicast
            && options.multicast_aggregation == MulticastAggregation::WaitFirst
        {
            let rest = jobs.split_off(1);
            let dispatched = self.dispatch_all(rest);
            self.deliver_all(jobs)
                .await
                .map(|delivered| RoutingOutcome::Delivered {
                    delivered,
                    dispatched,
                })
        } else {
            self.deliver_all(jobs)
                .await
                .map(|delivered| RoutingOutcome::Delivered {
                    delivered,
                    dispatched: Vec::new(),
                })
        };

        if let (Some(msg_id), Ok(outcome)) = (msg_id.as_deref(), outcome.as_ref()) {
            debug!(
                event = events::ROUTE_FORWARDED,
                component = COMPONENT,
                msg_id,
                channel = message.channel(),
                destinations = ?outcome.destinations(),
                "message forwarded"
            );
        }
        outcome
    }

    fn unroutable(
        &self,
        message: &Message,
        options: &RouteOptions,
    ) -> Result<RoutingOutcome, RoutingError> {
        match options.unroutable_policy {
            UnroutablePolicy::Drop => {
                if options.warn_dropped_messages {
                    warn!(
                        event = events::ROUTE_UNROUTABLE_DROPPED,
                        component = COMPONENT,
                        msg_id = %fields::format_message_id(message),
                        channel = message.channel(),
                        "no matching subscription; message dropped"
                    );
                } else {
                    debug!(
                        event = events::ROUTE_UNROUTABLE_DROPPED,
                        component = COMPONENT,
                        msg_id = %fields::format_message_id(message),
                        channel = message.channel(),
                        "no matching subscription; message dropped"
                    );
                }
                Ok(RoutingOutcome::Dropped)
            }
            UnroutablePolicy::Fail => {
                debug!(
                    event = events::ROUTE_UNROUTABLE_FAILED,
                    component = COMPONENT,
                    msg_id = %fields::format_message_id(message),
                    channel = message.channel(),
                    "no matching subscription"
                );
                Err(RoutingError::NoMatchingSubscription {
                    channel: message.channel().to_string(),
                })
            }
        }
    }

    /// Hands jobs to the egress pool; returns the destinations that were enqueued.
    fn dispatch_all(&self, jobs: Vec<DeliveryJob>) -> Vec<String> {
        jobs.into_iter()
            .filter_map(|job| {
                let destination_uri = job.destination_uri.to_string();
                self.egress.dispatch(job).then_some(destination_uri)
            })
            .collect()
    }

    /// Delivers concurrently and waits for every result.
    async fn deliver_all(&self, jobs: Vec<DeliveryJob>) -> Result<Vec<DeliveryReport>, RoutingError> {
        let results = join_all(jobs.iter().map(|job| job.execute(self.sender.as_ref()))).await;

        let mut delivered = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(report) => {
                    debug!(
                        event = events::DELIVERY_SEND_OK,
                        component = COMPONENT,
                        subscription_id = report.subscription_id.as_str(),
                        destination_uri = report.destination_uri.as_str(),
                        "delivery succeeded"
                    );
                    delivered.push(report);
                }
                Err(failure) => {
                    log_delivery_failure(&failure);
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Ok(delivered)
        } else {
            Err(RoutingError::DeliveryFailed {
                failures,
                delivered,
            })
        }
    }
}

fn log_delivery_failure(failure: &DeliveryFailure) {
    let event = match failure.error {
        DeliveryError::Timeout(_) => events::DELIVERY_SEND_TIMEOUT,
        _ => events::DELIVERY_SEND_FAILED,
    };
    warn!(
        event = event,
        component = COMPONENT,
        msg_id = %failure.message_id,
        channel = failure.channel.as_str(),
        subscription_id = failure.subscription_id.as_str(),
        destination_uri = failure.destination_uri.as_str(),
        err = %failure.error,
        "delivery failed"
    );
}
