//! Messaging channel to the device shadow service.
//!
//! [`MessageChannel`] is the seam the endpoint tick loop and the connectivity
//! supervisor talk to; [`MqttChannel`] implements it on top of `rumqttc`.

mod client;

pub use client::MqttChannel;

use crate::error::ChannelError;

/// Message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload as text for logging; invalid UTF-8 is replaced.
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// A publish queued by a role, sent once control is back in the tick loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub topic: String,
    pub payload: String,
}

/// Publishes collected during an inbound hook or a poll.
///
/// Roles never talk to the channel directly, so the hook cannot re-enter the
/// channel while it is being pumped.
#[derive(Debug, Default)]
pub struct Outbox {
    requests: Vec<PublishRequest>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, topic: impl Into<String>, payload: impl Into<String>) {
        self.requests.push(PublishRequest {
            topic: topic.into(),
            payload: payload.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Take every queued request in submission order.
    pub fn take(&mut self) -> Vec<PublishRequest> {
        std::mem::take(&mut self.requests)
    }
}

/// Topic-addressed publish/subscribe session.
#[allow(async_fn_in_trait)]
pub trait MessageChannel {
    /// Whether the session is currently believed to be up.
    fn is_connected(&self) -> bool;

    /// Drop the current session so the next `connect` starts a fresh one.
    ///
    /// Called when the link under the session was lost or an operation found
    /// the session unusable.
    fn mark_disconnected(&mut self);

    /// Make exactly one attempt to establish the session.
    async fn connect(&mut self) -> Result<(), ChannelError>;

    async fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError>;

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), ChannelError>;

    /// Process pending network traffic, handing each received message to
    /// `hook` before returning.
    async fn pump<F>(&mut self, hook: F) -> Result<(), ChannelError>
    where
        F: FnMut(InboundMessage);
}
