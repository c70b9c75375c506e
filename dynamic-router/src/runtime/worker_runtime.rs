//! Runtime helper for spawning egress dispatch loops on dedicated threads.

use crate::observability::{events, fields};
use std::future::Future;
use std::io;
use std::thread;
use tokio::runtime::Builder;
use tracing::{debug, warn};

pub(crate) const DEFAULT_EGRESS_RUNTIME_THREAD_NAME: &str = "dr-egress";

const COMPONENT: &str = "worker_runtime";

/// Handle for one spawned dispatch loop.
///
/// Dropping the handle detaches the thread; the loop ends once its queue closes.
pub(crate) struct DispatchLoopHandle {
    worker_thread: String,
    join_handle: thread::JoinHandle<()>,
}

impl DispatchLoopHandle {
    pub(crate) fn worker_thread(&self) -> &str {
        &self.worker_thread
    }

    pub(crate) fn thread_id(&self) -> thread::ThreadId {
        self.join_handle.thread().id()
    }

    /// Blocks until the loop has returned.
    #[cfg(test)]
    pub(crate) fn join(self) -> thread::Result<()> {
        self.join_handle.join()
    }
}

/// Runs `run_loop` on a new thread that owns a current-thread tokio runtime.
pub(crate) fn spawn_dispatch_loop<F, Fut>(
    worker_id: &str,
    thread_name: String,
    run_loop: F,
) -> io::Result<DispatchLoopHandle>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let runtime_worker_id = worker_id.to_string();
    let spawn_result = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    // The loop never starts; its receiver drops and senders observe a closed queue.
                    warn!(
                        event = events::RUNTIME_SPAWN_FAILED,
                        component = COMPONENT,
                        worker_id = runtime_worker_id.as_str(),
                        worker_thread = %fields::current_thread_name_or_default(),
                        err = %err,
                        "failed to build egress tokio runtime"
                    );
                    return;
                }
            };
            runtime.block_on(run_loop());
        });

    match spawn_result {
        Ok(join_handle) => {
            debug!(
                event = events::RUNTIME_SPAWN_OK,
                component = COMPONENT,
                worker_id,
                worker_thread = thread_name.as_str(),
                "egress runtime thread spawned"
            );
            Ok(DispatchLoopHandle {
                worker_thread: thread_name,
                join_handle,
            })
        }
        Err(err) => {
            warn!(
                event = events::RUNTIME_SPAWN_FAILED,
                component = COMPONENT,
                worker_id,
                worker_thread = thread_name.as_str(),
                err = %err,
                "failed to spawn egress runtime thread"
            );
            Err(err)
        }
    }
}
