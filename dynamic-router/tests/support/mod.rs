use dynamic_router::{
    ControlCommand, ControlResponse, DynamicRouter, MessageSender, PredicateRegistry,
    RouterConfig, SubscriptionView,
};
use integration_test_utils::RecordingFailureListener;
use std::sync::Arc;

pub(crate) fn make_router(name: &str, config: RouterConfig, sender: Arc<dyn MessageSender>) -> DynamicRouter {
    DynamicRouter::new(name, config, sender, PredicateRegistry::new())
}

#[allow(dead_code)]
pub(crate) fn make_router_with_listener(
    name: &str,
    config: RouterConfig,
    sender: Arc<dyn MessageSender>,
    predicates: PredicateRegistry,
) -> (DynamicRouter, RecordingFailureListener) {
    let listener = RecordingFailureListener::new();
    let router = DynamicRouter::with_failure_listener(
        name,
        config,
        sender,
        predicates,
        Arc::new(listener.clone()),
    );
    (router, listener)
}

pub(crate) fn assert_control_ok(router: &DynamicRouter, command: ControlCommand) -> ControlResponse {
    router
        .control(command)
        .expect("control command should succeed")
}

#[allow(dead_code)]
pub(crate) fn list_ids(router: &DynamicRouter, channel: Option<&str>) -> Vec<String> {
    let ControlResponse::Subscriptions { subscriptions } =
        assert_control_ok(router, ControlCommand::list(channel))
    else {
        panic!("list should answer with subscriptions");
    };
    subscriptions
        .into_iter()
        .map(|view: SubscriptionView| view.subscription_id)
        .collect()
}
