//! Fixed pool of egress workers fed by bounded queues.
//!
//! Jobs are sharded by destination URI, so deliveries to one destination leave in the order
//! they were enqueued.

use crate::config::EgressConfig;
use crate::data_plane::delivery::DeliveryJob;
use crate::data_plane::egress_worker::EgressWorker;
use crate::error::DeliveryError;
use crate::observability::events;
use crate::sender::{DeliveryFailureListener, MessageSender};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError, Sender};
use tracing::{debug, warn};

const COMPONENT: &str = "egress_pool";

/// Per-worker binding of queue and thread.
pub(crate) struct EgressBinding {
    pub(crate) worker: EgressWorker,
    pub(crate) sender: Sender<DeliveryJob>,
}

pub(crate) struct EgressPool {
    bindings: Vec<EgressBinding>,
    failure_listener: Arc<dyn DeliveryFailureListener>,
}

impl EgressPool {
    /// Spawns `config.workers` workers (at least one). Workers that fail to spawn are skipped.
    pub(crate) fn new(
        config: &EgressConfig,
        sender: Arc<dyn MessageSender>,
        failure_listener: Arc<dyn DeliveryFailureListener>,
    ) -> Self {
        let queue_size = config.queue_size.max(1);
        let bindings = (0..config.workers.max(1))
            .filter_map(|_| {
                let (job_sender, job_receiver) = mpsc::channel(queue_size);
                EgressWorker::new(sender.clone(), failure_listener.clone(), job_receiver)
                    .ok()
                    .map(|worker| EgressBinding {
                        worker,
                        sender: job_sender,
                    })
            })
            .collect::<Vec<_>>();

        debug!(
            component = COMPONENT,
            workers = bindings.len(),
            queue_size,
            "egress pool started"
        );

        Self {
            bindings,
            failure_listener,
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.bindings.len()
    }

    fn shard_for(&self, destination_uri: &str) -> Option<&EgressBinding> {
        if self.bindings.is_empty() {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        destination_uri.hash(&mut hasher);
        let index = (hasher.finish() % self.bindings.len() as u64) as usize;
        self.bindings.get(index)
    }

    /// Enqueues a job without waiting.
    ///
    /// Returns `false` when the job could not be enqueued; the failure has already been
    /// handed to the failure listener.
    pub(crate) fn dispatch(&self, job: DeliveryJob) -> bool {
        let Some(binding) = self.shard_for(&job.destination_uri) else {
            self.reject(job, DeliveryError::WorkerUnavailable);
            return false;
        };

        match binding.sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                self.reject(job, DeliveryError::QueueFull);
                false
            }
            Err(TrySendError::Closed(job)) => {
                warn!(
                    event = events::EGRESS_ENQUEUE_FAILED,
                    component = COMPONENT,
                    worker_id = binding.worker.worker_id(),
                    worker_thread = binding.worker.runtime_thread(),
                    thread_id = ?binding.worker.thread_id(),
                    "egress worker stopped"
                );
                self.reject(job, DeliveryError::WorkerUnavailable);
                false
            }
        }
    }

    fn reject(&self, job: DeliveryJob, error: DeliveryError) {
        let failure = job.failure(error);
        warn!(
            event = events::EGRESS_ENQUEUE_FAILED,
            component = COMPONENT,
            msg_id = %failure.message_id,
            channel = failure.channel.as_str(),
            subscription_id = failure.subscription_id.as_str(),
            destination_uri = failure.destination_uri.as_str(),
            err = %failure.error,
            "unable to enqueue asynchronous delivery"
        );
        self.failure_listener.on_delivery_failure(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::EgressPool;
    use crate::config::EgressConfig;
    use crate::data_plane::delivery::DeliveryJob;
    use crate::error::{DeliveryError, DeliveryFailure};
    use crate::message::Message;
    use crate::sender::{DeliveryFailureListener, MessageSender};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct GatedSender {
        gate: Arc<Semaphore>,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageSender for GatedSender {
        async fn send(&self, destination_uri: &str, message: Arc<Message>) -> Result<(), String> {
            let _permit = self.gate.acquire().await.map_err(|err| err.to_string())?;
            self.delivered
                .lock()
                .unwrap()
                .push(format!("{destination_uri}:{}", message.body()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct CollectingListener {
        failures: Mutex<Vec<DeliveryFailure>>,
    }

    impl DeliveryFailureListener for CollectingListener {
        fn on_delivery_failure(&self, failure: DeliveryFailure) {
            self.failures.lock().unwrap().push(failure);
        }
    }

    fn job(destination_uri: &str, body: &str) -> DeliveryJob {
        DeliveryJob {
            message: Arc::new(Message::new("orders", body)),
            subscription_id: "A".into(),
            destination_uri: destination_uri.into(),
            timeout: Duration::from_secs(5),
        }
    }

    fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("condition not reached in time");
    }

    #[test]
    fn zero_workers_are_rounded_up_to_one() {
        let sender = Arc::new(GatedSender {
            gate: Arc::new(Semaphore::new(0)),
            delivered: Mutex::new(Vec::new()),
        });
        let pool = EgressPool::new(
            &EgressConfig {
                workers: 0,
                queue_size: 0,
            },
            sender,
            Arc::new(CollectingListener::default()),
        );

        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn full_queue_is_reported_to_listener() {
        let gate = Arc::new(Semaphore::new(0));
        let sender = Arc::new(GatedSender {
            gate: gate.clone(),
            delivered: Mutex::new(Vec::new()),
        });
        let listener = Arc::new(CollectingListener::default());
        let pool = EgressPool::new(
            &EgressConfig {
                workers: 1,
                queue_size: 1,
            },
            sender.clone(),
            listener.clone(),
        );

        // First job parks in the worker, second fills the queue, the rest overflow.
        assert!(pool.dispatch(job("mock:a", "1")));
        wait_until(|| pool.bindings[0].sender.capacity() == 1);
        assert!(pool.dispatch(job("mock:a", "2")));
        assert!(!pool.dispatch(job("mock:a", "3")));

        let failures = listener.failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error, DeliveryError::QueueFull);

        gate.add_permits(2);
        wait_until(|| sender.delivered.lock().unwrap().len() == 2);
        assert_eq!(
            *sender.delivered.lock().unwrap(),
            ["mock:a:1".to_string(), "mock:a:2".to_string()]
        );
    }
}
