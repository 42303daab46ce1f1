//! Data models for mythic-link.
//!
//! Defines subscription configuration and events, the graphql-transport-ws
//! wire messages, connection options and the `/auth` request/response bodies.

pub mod client_message;
pub mod connection_options;
pub mod login;
pub mod server_message;
pub mod subscription_config;
pub mod subscription_event;
pub mod subscription_info;
pub mod subscription_kind;

pub use client_message::{ClientMessage, SubscribePayload};
pub use connection_options::ConnectionOptions;
pub use login::{LoginRequest, LoginResponse, LoginUserInfo, RefreshRequest};
pub use server_message::{GraphQLError, NextPayload, ServerMessage};
pub use subscription_config::{
    SubscriptionConfig, SubscriptionHandler, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE,
};
pub use subscription_event::SubscriptionEvent;
pub use subscription_info::SubscriptionInfo;
pub use subscription_kind::SubscriptionKind;
