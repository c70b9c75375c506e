//! Data-plane layer.
//!
//! Turns one routed message into delivery attempts: it walks the channel snapshot,
//! applies the dispatch policy and either awaits the deliveries or hands them to the
//! egress worker pool.
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use dynamic_router::{
//!     ControlCommand, DynamicRouter, Message, MessageSender, PredicateRegistry, RouterConfig,
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
//!     "data-plane-doc",
//!     RouterConfig::default(),
//!     Arc::new(NoopSender),
//!     PredicateRegistry::new(),
//! );
//! router
//!     .control(ControlCommand::subscribe("orders", "all", "mock:all", 1))
//!     .unwrap();
//!
//! // Synchronous routing waits for the destination to accept the message.
//! let outcome = router.route(Message::new("orders", "{}"), true).await.unwrap();
//! assert_eq!(outcome.destinations(), ["mock:all"]);
//! # });
//! ```

pub(crate) mod delivery;
pub(crate) mod egress_pool;
pub(crate) mod egress_worker;
pub(crate) mod routing_engine;
