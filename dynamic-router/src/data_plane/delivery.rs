//! One delivery attempt of one message to one subscription's destination.

use crate::error::{DeliveryError, DeliveryFailure};
use crate::message::Message;
use crate::outcome::DeliveryReport;
use crate::routing::subscription::Subscription;
use crate::sender::MessageSender;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct DeliveryJob {
    pub(crate) message: Arc<Message>,
    pub(crate) subscription_id: Arc<str>,
    pub(crate) destination_uri: Arc<str>,
    pub(crate) timeout: Duration,
}

impl DeliveryJob {
    pub(crate) fn new(message: Arc<Message>, subscription: &Subscription, timeout: Duration) -> Self {
        Self {
            message,
            subscription_id: subscription.subscription_id().into(),
            destination_uri: subscription.destination_uri().into(),
            timeout,
        }
    }

    /// Sends once, bounded by the job timeout. The in-flight send is dropped on timeout.
    pub(crate) async fn execute(
        &self,
        sender: &dyn MessageSender,
    ) -> Result<DeliveryReport, DeliveryFailure> {
        let send = sender.send(&self.destination_uri, self.message.clone());
        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(())) => Ok(self.report()),
            Ok(Err(reason)) => Err(self.failure(DeliveryError::Rejected(reason))),
            Err(_) => Err(self.failure(DeliveryError::Timeout(self.timeout))),
        }
    }

    pub(crate) fn report(&self) -> DeliveryReport {
        DeliveryReport {
            subscription_id: self.subscription_id.to_string(),
            destination_uri: self.destination_uri.to_string(),
        }
    }

    pub(crate) fn failure(&self, error: DeliveryError) -> DeliveryFailure {
        DeliveryFailure {
            message_id: self.message.id(),
            channel: self.message.channel().to_string(),
            subscription_id: self.subscription_id.to_string(),
            destination_uri: self.destination_uri.to_string(),
            error,
        }
    }
}
