//! Single dispatcher for control commands.

use crate::control_plane::command::{ControlCommand, ControlResponse, SubscriptionParameters};
use crate::error::ControlError;
use crate::observability::events;
use crate::routing::predicate::{CompiledPredicate, PredicateRegistry};
use crate::routing::subscription::SubscriptionRequest;
use crate::routing::subscription_registry::SubscriptionRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "control_surface";

pub(crate) struct ControlSurface {
    router_name: String,
    registry: Arc<SubscriptionRegistry>,
    predicates: PredicateRegistry,
}

impl ControlSurface {
    pub(crate) fn new(
        router_name: &str,
        registry: Arc<SubscriptionRegistry>,
        predicates: PredicateRegistry,
    ) -> Self {
        Self {
            router_name: router_name.to_string(),
            registry,
            predicates,
        }
    }

    /// Executes one command. A failed command leaves the registry untouched.
    pub(crate) fn handle(&self, command: ControlCommand) -> Result<ControlResponse, ControlError> {
        let verb = command.verb();
        debug!(
            event = events::CONTROL_COMMAND_RECEIVED,
            component = COMPONENT,
            router = self.router_name.as_str(),
            command = verb,
            "control command received"
        );

        let result = self.execute(command);
        if let Err(err) = &result {
            warn!(
                event = events::CONTROL_COMMAND_REJECTED,
                component = COMPONENT,
                router = self.router_name.as_str(),
                command = verb,
                err = %err,
                "control command rejected"
            );
        }
        result
    }

    fn execute(&self, command: ControlCommand) -> Result<ControlResponse, ControlError> {
        match command {
            ControlCommand::Subscribe(parameters) => {
                let replaced = self.registry.add(self.compile(parameters)?)?;
                if let Some(previous) = &replaced {
                    info!(
                        event = events::SUBSCRIPTION_REPLACED,
                        component = COMPONENT,
                        router = self.router_name.as_str(),
                        channel = previous.channel(),
                        subscription_id = previous.subscription_id(),
                        "subscription replaced"
                    );
                }
                Ok(ControlResponse::Subscribed {
                    replaced: replaced.is_some(),
                })
            }
            ControlCommand::Update(parameters) => {
                let previous = self.registry.replace(self.compile(parameters)?)?;
                info!(
                    event = events::SUBSCRIPTION_REPLACED,
                    component = COMPONENT,
                    router = self.router_name.as_str(),
                    channel = previous.channel(),
                    subscription_id = previous.subscription_id(),
                    "subscription updated"
                );
                Ok(ControlResponse::Updated)
            }
            ControlCommand::Unsubscribe {
                channel,
                subscription_id,
            } => Ok(ControlResponse::Unsubscribed {
                removed: self.registry.remove(&channel, &subscription_id),
            }),
            ControlCommand::List { channel } => Ok(ControlResponse::Subscriptions {
                subscriptions: self
                    .registry
                    .list(channel.as_deref())
                    .iter()
                    .map(|subscription| subscription.view())
                    .collect(),
            }),
            ControlCommand::Statistics { channel } => Ok(ControlResponse::Statistics {
                statistics: self
                    .registry
                    .list(channel.as_deref())
                    .iter()
                    .map(|subscription| subscription.statistics_view())
                    .collect(),
            }),
        }
    }

    fn compile(&self, parameters: SubscriptionParameters) -> Result<SubscriptionRequest, ControlError> {
        let predicate = CompiledPredicate::compile(&parameters.predicate_spec()?, &self.predicates)?;
        Ok(SubscriptionRequest {
            channel: parameters.channel,
            subscription_id: parameters.subscription_id,
            destination_uri: parameters.destination_uri,
            priority: parameters.priority,
            predicate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ControlSurface;
    use crate::control_plane::command::{ControlCommand, ControlResponse, SubscriptionParameters};
    use crate::error::{ControlError, PredicateResolutionError};
    use crate::routing::predicate::PredicateRegistry;
    use crate::routing::subscription_registry::SubscriptionRegistry;
    use std::sync::Arc;

    fn surface() -> (ControlSurface, Arc<SubscriptionRegistry>) {
        let registry = Arc::new(SubscriptionRegistry::default());
        let predicates = PredicateRegistry::new();
        predicates.register_fn("isGold", |message| message.header("tier") == Some("gold"));
        (
            ControlSurface::new("test-router", registry.clone(), predicates),
            registry,
        )
    }

    #[test]
    fn subscribe_reports_replacement() {
        let (surface, _) = surface();

        assert_eq!(
            surface
                .handle(ControlCommand::subscribe("orders", "A", "mock:a", 1))
                .unwrap(),
            ControlResponse::Subscribed { replaced: false }
        );
        assert_eq!(
            surface
                .handle(ControlCommand::subscribe("orders", "A", "mock:b", 1))
                .unwrap(),
            ControlResponse::Subscribed { replaced: true }
        );
    }

    #[test]
    fn failed_predicate_resolution_commits_nothing() {
        let (surface, registry) = surface();

        let unknown_bean = ControlCommand::Subscribe(
            SubscriptionParameters::new("orders", "A", "mock:a", 1).with_predicate_bean("isSilver"),
        );
        let bad_expression = ControlCommand::Subscribe(
            SubscriptionParameters::new("orders", "B", "mock:b", 1).with_predicate("${body} ==="),
        );

        assert_eq!(
            surface.handle(unknown_bean).unwrap_err(),
            ControlError::PredicateResolution(PredicateResolutionError::UnknownPredicate(
                "isSilver".to_string()
            ))
        );
        assert!(matches!(
            surface.handle(bad_expression),
            Err(ControlError::PredicateResolution(
                PredicateResolutionError::Parse { .. }
            ))
        ));
        assert_eq!(registry.version(), 0);
    }

    #[test]
    fn update_requires_existing_subscription() {
        let (surface, registry) = surface();
        let update = ControlCommand::Update(
            SubscriptionParameters::new("orders", "A", "mock:a", 1).with_predicate_bean("isGold"),
        );

        assert!(matches!(
            surface.handle(update.clone()),
            Err(ControlError::SubscriptionNotFound { .. })
        ));
        assert!(registry.list(None).is_empty());

        surface
            .handle(ControlCommand::subscribe("orders", "A", "mock:old", 1))
            .unwrap();
        assert_eq!(surface.handle(update).unwrap(), ControlResponse::Updated);
        assert_eq!(registry.snapshot("orders")[0].predicate().describe(), "bean:isGold");
    }

    #[test]
    fn list_and_unsubscribe_reflect_registry() {
        let (surface, _) = surface();
        surface
            .handle(ControlCommand::subscribe("orders", "A", "mock:a", 1))
            .unwrap();

        assert_eq!(
            surface
                .handle(ControlCommand::unsubscribe("orders", "A"))
                .unwrap(),
            ControlResponse::Unsubscribed { removed: true }
        );
        assert_eq!(
            surface
                .handle(ControlCommand::unsubscribe("orders", "A"))
                .unwrap(),
            ControlResponse::Unsubscribed { removed: false }
        );
        assert_eq!(
            surface.handle(ControlCommand::list(Some("orders"))).unwrap(),
            ControlResponse::Subscriptions {
                subscriptions: Vec::new()
            }
        );
    }
}
