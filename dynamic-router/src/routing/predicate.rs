//! Predicate capability, named predicate registry and compiled predicate handles.

use crate::error::{PredicateError, PredicateResolutionError};
use crate::message::Message;
use crate::observability::{events, fields};
use crate::routing::expression::Expression;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "predicate";

/// Expression language compiled by [`CompiledPredicate::compile`].
pub const SIMPLE_LANGUAGE: &str = "simple";

/// Boolean test over a message.
///
/// Implementations must not mutate shared state visible to routing; an `Err` (or a panic)
/// counts as "no match" for the subscription that owns the predicate.
pub trait Predicate: Send + Sync {
    fn evaluate(&self, message: &Message) -> Result<bool, PredicateError>;
}

struct FnPredicate<F>(F);

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Message) -> bool + Send + Sync,
{
    fn evaluate(&self, message: &Message) -> Result<bool, PredicateError> {
        Ok((self.0)(message))
    }
}

/// Process-wide lookup of named predicates (`predicateBean` in control commands).
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: Arc<ArcSwap<HashMap<String, Arc<dyn Predicate>>>>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a predicate. Subscriptions compiled earlier keep the old one.
    pub fn register(&self, name: &str, predicate: Arc<dyn Predicate>) {
        self.predicates.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(name.to_string(), predicate.clone());
            next
        });
    }

    pub fn register_fn<F>(&self, name: &str, predicate: F)
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnPredicate(predicate)));
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut removed = false;
        self.predicates.rcu(|current| {
            let mut next = HashMap::clone(current);
            removed = next.remove(name).is_some();
            next
        });
        removed
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Predicate>> {
        self.predicates.load().get(name).cloned()
    }
}

/// How a subscription asked for its predicate to be built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PredicateSpec {
    Always,
    Bean(String),
    Expression { language: String, text: String },
}

#[derive(Clone)]
enum CompiledKind {
    Always,
    Bean {
        name: String,
        predicate: Arc<dyn Predicate>,
    },
    Expression(Arc<Expression>),
}

/// Immutable, shareable predicate handle resolved once at subscribe time.
#[derive(Clone)]
pub struct CompiledPredicate {
    kind: CompiledKind,
}

impl Debug for CompiledPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompiledPredicate({})", self.describe())
    }
}

impl CompiledPredicate {
    pub fn always() -> Self {
        Self {
            kind: CompiledKind::Always,
        }
    }

    pub fn compile(
        spec: &PredicateSpec,
        registry: &PredicateRegistry,
    ) -> Result<Self, PredicateResolutionError> {
        let kind = match spec {
            PredicateSpec::Always => CompiledKind::Always,
            PredicateSpec::Bean(name) => {
                let predicate = registry
                    .lookup(name)
                    .ok_or_else(|| PredicateResolutionError::UnknownPredicate(name.clone()))?;
                CompiledKind::Bean {
                    name: name.clone(),
                    predicate,
                }
            }
            PredicateSpec::Expression { language, text } => {
                if !language.eq_ignore_ascii_case(SIMPLE_LANGUAGE) {
                    return Err(PredicateResolutionError::UnsupportedLanguage(
                        language.clone(),
                    ));
                }
                CompiledKind::Expression(Arc::new(Expression::compile(text)?))
            }
        };
        Ok(Self { kind })
    }

    /// Human readable origin of the predicate, used by `list` and logs.
    pub fn describe(&self) -> String {
        match &self.kind {
            CompiledKind::Always => "always".to_string(),
            CompiledKind::Bean { name, .. } => format!("bean:{name}"),
            CompiledKind::Expression(expression) => format!("expression:{}", expression.source()),
        }
    }

    /// Evaluates the predicate; errors and panics are logged and count as no match.
    pub fn evaluate(&self, message: &Message) -> bool {
        let predicate: &dyn Predicate = match &self.kind {
            CompiledKind::Always => return true,
            CompiledKind::Bean { predicate, .. } => predicate.as_ref(),
            CompiledKind::Expression(expression) => expression.as_ref(),
        };

        match panic::catch_unwind(AssertUnwindSafe(|| predicate.evaluate(message))) {
            Ok(Ok(matched)) => matched,
            Ok(Err(err)) => {
                warn!(
                    event = events::PREDICATE_EVALUATION_FAILED,
                    component = COMPONENT,
                    msg_id = %fields::format_message_id(message),
                    predicate = %self.describe(),
                    err = %err,
                    "predicate failed; treating as no match"
                );
                false
            }
            Err(_) => {
                warn!(
                    event = events::PREDICATE_EVALUATION_PANICKED,
                    component = COMPONENT,
                    msg_id = %fields::format_message_id(message),
                    predicate = %self.describe(),
                    "predicate panicked; treating as no match"
                );
                false
            }
        }
    }
}
