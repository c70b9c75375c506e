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

//! Egress worker that executes queued asynchronous deliveries.

use crate::data_plane::delivery::DeliveryJob;
use crate::observability::events;
use crate::observability::fields::{self, WorkerContext};
use crate::runtime::worker_runtime::{
    spawn_dispatch_loop, DispatchLoopHandle, DEFAULT_EGRESS_RUNTIME_THREAD_NAME,
};
use crate::sender::{DeliveryFailureListener, MessageSender};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn, Level};
use uuid::Uuid;

const EGRESS_RUNTIME_THREAD_NAME_PREFIX: &str = "dr-egress-";
const EGRESS_RUNTIME_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "egress_worker";

/// Worker state that owns the spawned dispatch thread handle.
pub(crate) struct EgressWorker {
    worker_id: String,
    dispatch_handle: DispatchLoopHandle,
}

impl EgressWorker {
    /// Spawns a dedicated runtime thread draining `job_receiver`.
    pub(crate) fn new(
        sender: Arc<dyn MessageSender>,
        failure_listener: Arc<dyn DeliveryFailureListener>,
        job_receiver: Receiver<DeliveryJob>,
    ) -> io::Result<Self> {
        let worker_id = Uuid::new_v4().hyphenated().to_string();
        let runtime_thread_name = Self::build_runtime_thread_name(&worker_id);
        let worker_id_for_loop = worker_id.clone();

        let dispatch_handle = spawn_dispatch_loop(&worker_id, runtime_thread_name, move || {
            Self::dispatch_loop(worker_id_for_loop, sender, failure_listener, job_receiver)
        })?;

        debug!(
            event = events::EGRESS_WORKER_CREATE,
            component = COMPONENT,
            worker_id = worker_id.as_str(),
            worker_thread = dispatch_handle.worker_thread(),
            "egress worker created"
        );

        Ok(Self {
            worker_id,
            dispatch_handle,
        })
    }

    /// Returns the unique worker identifier for correlation logs.
    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Returns the worker runtime thread label for diagnostics.
    pub(crate) fn runtime_thread(&self) -> &str {
        self.dispatch_handle.worker_thread()
    }

    pub(crate) fn thread_id(&self) -> std::thread::ThreadId {
        self.dispatch_handle.thread_id()
    }

    fn build_runtime_thread_name(worker_id: &str) -> String {
        let suffix_len = EGRESS_RUNTIME_THREAD_NAME_MAX_LEN - EGRESS_RUNTIME_THREAD_NAME_PREFIX.len();
        let suffix: String = worker_id
            .chars()
            .filter(|ch| ch.is_ascii_hexdigit())
            .take(suffix_len)
            .collect();

        if suffix.len() == suffix_len {
            format!("{EGRESS_RUNTIME_THREAD_NAME_PREFIX}{suffix}")
        } else {
            warn!(
                event = events::RUNTIME_THREAD_NAME_FALLBACK,
                component = COMPONENT,
                worker_id,
                reason = fields::REASON_INVALID_THREAD_NAME,
                "using default egress thread name"
            );
            DEFAULT_EGRESS_RUNTIME_THREAD_NAME.to_string()
        }
    }

    /// Executes queued jobs in order until every job sender is dropped.
    pub(crate) async fn dispatch_loop(
        worker_id: String,
        sender: Arc<dyn MessageSender>,
        failure_listener: Arc<dyn DeliveryFailureListener>,
        mut job_receiver: Receiver<DeliveryJob>,
    ) {
        let worker_context = WorkerContext::with_current_thread(worker_id);

        while let Some(job) = job_receiver.recv().await {
            let msg_id = tracing::enabled!(Level::DEBUG)
                .then(|| fields::format_message_id(&job.message));

            if let Some(msg_id) = msg_id.as_deref() {
                debug!(
                    event = events::EGRESS_SEND_ATTEMPT,
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    worker_thread = worker_context.worker_thread.as_str(),
                    msg_id,
                    channel = job.message.channel(),
                    subscription_id = &*job.subscription_id,
                    destination_uri = &*job.destination_uri,
                    "attempting egress send"
                );
            }

            match job.execute(sender.as_ref()).await {
                Ok(_) => {
                    if let Some(msg_id) = msg_id.as_deref() {
                        debug!(
                            event = events::EGRESS_SEND_OK,
                            component = COMPONENT,
                            worker_id = worker_context.worker_id.as_str(),
                            worker_thread = worker_context.worker_thread.as_str(),
                            msg_id,
                            destination_uri = &*job.destination_uri,
                            "egress send succeeded"
                        );
                    }
                }
                Err(failure) => {
                    warn!(
                        event = events::EGRESS_SEND_FAILED,
                        component = COMPONENT,
                        worker_id = worker_context.worker_id.as_str(),
                        worker_thread = worker_context.worker_thread.as_str(),
                        msg_id = %failure.message_id,
                        channel = failure.channel.as_str(),
                        subscription_id = failure.subscription_id.as_str(),
                        destination_uri = failure.destination_uri.as_str(),
                        err = %failure.error,
                        "egress send failed"
                    );
                    failure_listener.on_delivery_failure(failure);
                }
            }
        }

        info!(
            event = events::EGRESS_RECV_CLOSED,
            component = COMPONENT,
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            reason = fields::REASON_QUEUE_CLOSED,
            "job queue closed; stopping dispatch loop"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{EgressWorker, EGRESS_RUNTIME_THREAD_NAME_MAX_LEN, EGRESS_RUNTIME_THREAD_NAME_PREFIX};
    use crate::data_plane::delivery::DeliveryJob;
    use crate::error::{DeliveryError, DeliveryFailure};
    use crate::message::Message;
    use crate::sender::{DeliveryFailureListener, MessageSender};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct CountingSender {
        send_count: AtomicUsize,
    }

    #[async_trait]
    impl MessageSender for CountingSender {
        async fn send(&self, destination_uri: &str, _message: Arc<Message>) -> Result<(), String> {
            self.send_count.fetch_add(1, Ordering::Relaxed);
            if destination_uri == "mock:broken" {
                Err("broken destination".to_string())
            } else {
                Ok(())
            }
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

    fn job(destination_uri: &str) -> DeliveryJob {
        DeliveryJob {
            message: Arc::new(Message::new("orders", "{}")),
            subscription_id: "A".into(),
            destination_uri: destination_uri.into(),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn dispatch_loop_exits_on_closed_queue() {
        let sender = Arc::new(CountingSender::default());
        let (job_sender, job_receiver) = mpsc::channel(8);
        drop(job_sender);

        EgressWorker::dispatch_loop(
            "closed-loop".to_string(),
            sender.clone(),
            Arc::new(CollectingListener::default()),
            job_receiver,
        )
        .await;

        assert_eq!(sender.send_count.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn dispatch_loop_drains_queued_jobs_and_reports_failures() {
        let sender = Arc::new(CountingSender::default());
        let listener = Arc::new(CollectingListener::default());
        let (job_sender, job_receiver) = mpsc::channel(8);

        job_sender.try_send(job("mock:a")).expect("queue has capacity");
        job_sender.try_send(job("mock:broken")).expect("queue has capacity");
        drop(job_sender);

        EgressWorker::dispatch_loop(
            "drain-loop".to_string(),
            sender.clone(),
            listener.clone(),
            job_receiver,
        )
        .await;

        assert_eq!(sender.send_count.load(Ordering::Relaxed), 2);
        let failures = listener.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].destination_uri, "mock:broken");
        assert_eq!(
            failures[0].error,
            DeliveryError::Rejected("broken destination".to_string())
        );
    }

    #[test]
    fn build_runtime_thread_name_keeps_prefix_and_linux_safe_length() {
        let thread_name = EgressWorker::build_runtime_thread_name("abcdef0123456789");

        assert!(thread_name.starts_with(EGRESS_RUNTIME_THREAD_NAME_PREFIX));
        assert_eq!(thread_name.len(), EGRESS_RUNTIME_THREAD_NAME_MAX_LEN);
    }

    #[test]
    fn build_runtime_thread_name_uses_fallback_for_short_non_hex_ids() {
        let thread_name = EgressWorker::build_runtime_thread_name("zzz");

        assert_eq!(
            thread_name,
            crate::runtime::worker_runtime::DEFAULT_EGRESS_RUNTIME_THREAD_NAME
        );
    }
}
