use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Server-to-client messages of the `graphql-transport-ws` protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to `connection_init`; the socket is usable afterwards.
    ConnectionAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    /// One execution result for a subscription.
    ///
    /// Kept as a raw value so a malformed payload can be routed to its
    /// subscription instead of failing the whole frame.
    Next { id: String, payload: Value },

    /// The operation failed before producing results and is finished.
    Error { id: String, payload: Vec<GraphQLError> },

    /// The server finished the operation.
    Complete { id: String },

    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    /// Legacy `subscriptions-transport-ws` rejection some Hasura versions
    /// still send during init.
    ConnectionError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
}

impl ServerMessage {
    /// Subscription id the message is addressed to, if any.
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            ServerMessage::Next { id, .. }
            | ServerMessage::Error { id, .. }
            | ServerMessage::Complete { id } => Some(id),
            _ => None,
        }
    }
}

/// Body of a `next` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextPayload {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

/// A GraphQL error entry. Only the message is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Join GraphQL error messages into one line.
pub(crate) fn join_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
