//! Control commands and responses.
//!
//! Commands arrive either as a verb plus a flat parameter map (the header/query style used by
//! routes) or as a JSON document tagged with `action`.

use crate::error::ControlError;
use crate::routing::predicate::{PredicateSpec, SIMPLE_LANGUAGE};
use crate::routing::subscription::{SubscriptionStatisticsView, SubscriptionView};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PARAM_SUBSCRIBE_CHANNEL: &str = "subscribeChannel";
pub const PARAM_SUBSCRIPTION_ID: &str = "subscriptionId";
pub const PARAM_DESTINATION_URI: &str = "destinationUri";
pub const PARAM_PRIORITY: &str = "priority";
pub const PARAM_PREDICATE_BEAN: &str = "predicateBean";
pub const PARAM_PREDICATE: &str = "predicate";
pub const PARAM_EXPRESSION_LANGUAGE: &str = "expressionLanguage";

/// Everything `subscribe` and `update` need to build a subscription.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionParameters {
    #[serde(rename = "subscribeChannel")]
    pub channel: String,
    pub subscription_id: String,
    pub destination_uri: String,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate_bean: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_language: Option<String>,
}

impl SubscriptionParameters {
    pub fn new(channel: &str, subscription_id: &str, destination_uri: &str, priority: i32) -> Self {
        Self {
            channel: channel.to_string(),
            subscription_id: subscription_id.to_string(),
            destination_uri: destination_uri.to_string(),
            priority,
            ..Self::default()
        }
    }

    pub fn with_predicate_bean(mut self, name: &str) -> Self {
        self.predicate_bean = Some(name.to_string());
        self
    }

    pub fn with_predicate(mut self, expression: &str) -> Self {
        self.predicate = Some(expression.to_string());
        self
    }

    pub fn with_expression_language(mut self, language: &str) -> Self {
        self.expression_language = Some(language.to_string());
        self
    }

    /// Resolves which predicate the subscription asks for.
    ///
    /// Empty strings count as absent. Setting both a bean and an expression is rejected.
    pub fn predicate_spec(&self) -> Result<PredicateSpec, ControlError> {
        let bean = non_empty(self.predicate_bean.as_deref());
        let expression = non_empty(self.predicate.as_deref());

        match (bean, expression) {
            (Some(_), Some(_)) => Err(ControlError::InvalidSubscription(format!(
                "only one of {PARAM_PREDICATE_BEAN} and {PARAM_PREDICATE} may be set"
            ))),
            (Some(name), None) => Ok(PredicateSpec::Bean(name.to_string())),
            (None, Some(text)) => Ok(PredicateSpec::Expression {
                language: non_empty(self.expression_language.as_deref())
                    .unwrap_or(SIMPLE_LANGUAGE)
                    .to_string(),
                text: text.to_string(),
            }),
            (None, None) => Ok(PredicateSpec::Always),
        }
    }

    fn from_parameters(params: &HashMap<String, String>) -> Result<Self, ControlError> {
        let raw_priority = required(params, PARAM_PRIORITY)?;
        let priority = raw_priority.trim().parse::<i32>().map_err(|err| {
            ControlError::InvalidSubscription(format!(
                "{PARAM_PRIORITY} '{raw_priority}' is not an integer: {err}"
            ))
        })?;

        Ok(Self {
            channel: required(params, PARAM_SUBSCRIBE_CHANNEL)?,
            subscription_id: required(params, PARAM_SUBSCRIPTION_ID)?,
            destination_uri: required(params, PARAM_DESTINATION_URI)?,
            priority,
            predicate_bean: param(params, PARAM_PREDICATE_BEAN).map(str::to_string),
            predicate: param(params, PARAM_PREDICATE).map(str::to_string),
            expression_language: param(params, PARAM_EXPRESSION_LANGUAGE).map(str::to_string),
        })
    }
}

/// Closed set of control operations.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlCommand {
    Subscribe(SubscriptionParameters),
    /// Replaces an existing subscription; fails when the id is unknown.
    Update(SubscriptionParameters),
    Unsubscribe {
        #[serde(rename = "subscribeChannel")]
        channel: String,
        #[serde(rename = "subscriptionId")]
        subscription_id: String,
    },
    List {
        #[serde(
            rename = "subscribeChannel",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        channel: Option<String>,
    },
    Statistics {
        #[serde(
            rename = "subscribeChannel",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        channel: Option<String>,
    },
}

impl ControlCommand {
    /// Always-match subscription; attach predicates through [`SubscriptionParameters`].
    pub fn subscribe(
        channel: &str,
        subscription_id: &str,
        destination_uri: &str,
        priority: i32,
    ) -> Self {
        ControlCommand::Subscribe(SubscriptionParameters::new(
            channel,
            subscription_id,
            destination_uri,
            priority,
        ))
    }

    pub fn unsubscribe(channel: &str, subscription_id: &str) -> Self {
        ControlCommand::Unsubscribe {
            channel: channel.to_string(),
            subscription_id: subscription_id.to_string(),
        }
    }

    pub fn list(channel: Option<&str>) -> Self {
        ControlCommand::List {
            channel: channel.map(str::to_string),
        }
    }

    pub fn statistics(channel: Option<&str>) -> Self {
        ControlCommand::Statistics {
            channel: channel.map(str::to_string),
        }
    }

    /// Builds a command from a verb and flat wire parameters.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use dynamic_router::ControlCommand;
    ///
    /// let params = HashMap::from([
    ///     ("subscribeChannel".to_string(), "orders".to_string()),
    ///     ("subscriptionId".to_string(), "gold".to_string()),
    ///     ("destinationUri".to_string(), "mock:gold".to_string()),
    ///     ("priority".to_string(), "1".to_string()),
    ///     ("predicate".to_string(), "${header.tier} == 'gold'".to_string()),
    ///     ("predicateBean".to_string(), String::new()),
    /// ]);
    ///
    /// let command = ControlCommand::from_parameters("subscribe", &params).unwrap();
    /// assert!(matches!(command, ControlCommand::Subscribe(_)));
    /// ```
    pub fn from_parameters(
        verb: &str,
        params: &HashMap<String, String>,
    ) -> Result<Self, ControlError> {
        match verb.trim().to_ascii_lowercase().as_str() {
            "subscribe" => Ok(ControlCommand::Subscribe(
                SubscriptionParameters::from_parameters(params)?,
            )),
            "update" => Ok(ControlCommand::Update(
                SubscriptionParameters::from_parameters(params)?,
            )),
            "unsubscribe" => Ok(ControlCommand::Unsubscribe {
                channel: required(params, PARAM_SUBSCRIBE_CHANNEL)?,
                subscription_id: required(params, PARAM_SUBSCRIPTION_ID)?,
            }),
            "list" => Ok(ControlCommand::List {
                channel: param(params, PARAM_SUBSCRIBE_CHANNEL).map(str::to_string),
            }),
            "statistics" => Ok(ControlCommand::Statistics {
                channel: param(params, PARAM_SUBSCRIBE_CHANNEL).map(str::to_string),
            }),
            _ => Err(ControlError::UnknownCommand(verb.to_string())),
        }
    }

    /// Parses a JSON command tagged with `action`.
    pub fn from_json(text: &str) -> Result<Self, ControlError> {
        serde_json::from_str(text).map_err(|err| ControlError::MalformedCommand(err.to_string()))
    }

    /// Verb used in logs.
    pub fn verb(&self) -> &'static str {
        match self {
            ControlCommand::Subscribe(_) => "subscribe",
            ControlCommand::Update(_) => "update",
            ControlCommand::Unsubscribe { .. } => "unsubscribe",
            ControlCommand::List { .. } => "list",
            ControlCommand::Statistics { .. } => "statistics",
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    non_empty(params.get(name).map(String::as_str))
}

fn required(params: &HashMap<String, String>, name: &str) -> Result<String, ControlError> {
    param(params, name)
        .map(str::to_string)
        .ok_or_else(|| ControlError::InvalidSubscription(format!("missing parameter {name}")))
}

/// Result of a successful control command.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "response", rename_all = "camelCase")]
pub enum ControlResponse {
    Subscribed { replaced: bool },
    Updated,
    Unsubscribed { removed: bool },
    Subscriptions { subscriptions: Vec<SubscriptionView> },
    Statistics { statistics: Vec<SubscriptionStatisticsView> },
}

impl ControlResponse {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
