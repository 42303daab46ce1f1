use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::subscription_kind::SubscriptionKind;
use crate::error::{MythicLinkError, Result};

/// One real-time event delivered to a subscriber.
///
/// `data` is the GraphQL `data` object of a pushed message, keyed by the
/// subscription's root field (for example `task_output` or `callback`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    #[serde(rename = "type")]
    pub kind: SubscriptionKind,
    pub data: Map<String, Value>,
    /// When the client received the message, not when the server produced it.
    pub timestamp: DateTime<Utc>,
}

impl SubscriptionEvent {
    pub fn new(kind: SubscriptionKind, data: Map<String, Value>) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Decode a pushed `data` value.
    ///
    /// A missing or `null` value decodes to an empty map; anything else that
    /// is not a JSON object is rejected.
    pub(crate) fn decode(kind: SubscriptionKind, data: Value) -> Result<Self> {
        match data {
            Value::Object(map) => Ok(Self::new(kind, map)),
            Value::Null => Ok(Self::new(kind, Map::new())),
            other => Err(MythicLinkError::DecodeError(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn get_data_field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Rows under the first array-valued field, or an empty slice.
    pub fn rows(&self) -> &[Value] {
        self.data
            .values()
            .find_map(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Display for SubscriptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event: {} at {}",
            self.kind,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}
