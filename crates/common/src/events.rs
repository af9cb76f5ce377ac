//! Wire events exchanged with connected clients
//!
//! Every frame on the wire is a JSON object `{"event": <name>, "data": <payload>}`.
//! Field names are part of the contract observers depend on, so they are pinned
//! with explicit `serde` renames.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::session::PublicSession;

/// Events a client may send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "join")]
    Join(JoinRequest),
    #[serde(rename = "sendMessage")]
    SendMessage(SendMessageRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
}

/// Events pushed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "joinSuccess")]
    JoinSuccess(JoinSuccess),
    #[serde(rename = "joinError")]
    JoinError(JoinErrorPayload),
    #[serde(rename = "userListUpdate")]
    UserListUpdate(Vec<PublicSession>),
    #[serde(rename = "messageReceived")]
    MessageReceived(MessageReceived),
    #[serde(rename = "handshakeStep")]
    HandshakeStep(HandshakeStepEvent),
}

impl OutboundEvent {
    /// Wire name of the event, used for logging
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::JoinSuccess(_) => "joinSuccess",
            OutboundEvent::JoinError(_) => "joinError",
            OutboundEvent::UserListUpdate(_) => "userListUpdate",
            OutboundEvent::MessageReceived(_) => "messageReceived",
            OutboundEvent::HandshakeStep(_) => "handshakeStep",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSuccess {
    pub username: String,
    pub is_new_user: bool,
    pub public_key: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceived {
    pub from: String,
    pub content: String,
    /// Same text as `content`; the browser client renders this field
    pub decrypted: String,
    /// ISO-8601, millisecond precision, UTC
    pub timestamp: String,
}

impl MessageReceived {
    pub fn new(from: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        let content = content.into();
        Self {
            from: from.into(),
            decrypted: content.clone(),
            content,
            timestamp: iso_timestamp(at),
        }
    }
}

/// One participant as announced in handshake steps 1 and 2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeParticipant {
    pub username: String,
    pub public_key: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeStepEvent {
    pub step: u8,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user1: Option<HandshakeParticipant>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user2: Option<HandshakeParticipant>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shared_secret: Option<u64>,
}

/// Format a timestamp the way browsers print `Date.toISOString()`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
