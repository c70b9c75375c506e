//! Runtime integration layer.
//!
//! Isolates the worker-thread and tokio runtime boundaries so async/threading
//! behavior remains localized and predictable for the rest of the crate.
//! Each egress worker owns one thread running a current-thread runtime.

pub(crate) mod worker_runtime;
