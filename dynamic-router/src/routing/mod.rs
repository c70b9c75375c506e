//! Routing and subscription-resolution layer.
//!
//! Owns the subscription model, the copy-on-write registry that stores it, and the
//! predicate machinery (named predicates plus the inline `simple` expression language)
//! evaluated against every routed message.
//!
//! ```
//! use dynamic_router::{CompiledPredicate, Message, PredicateRegistry, PredicateSpec};
//!
//! let registry = PredicateRegistry::new();
//! registry.register_fn("isGold", |message| message.header("tier") == Some("gold"));
//!
//! let predicate = CompiledPredicate::compile(&PredicateSpec::Bean("isGold".into()), &registry)
//!     .unwrap();
//! assert!(predicate.evaluate(&Message::new("orders", "{}").with_header("tier", "gold")));
//! ```

pub(crate) mod expression;
pub(crate) mod predicate;
pub(crate) mod subscription;
pub(crate) mod subscription_registry;
