use async_trait::async_trait;

use aries_messages::Message;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("no route to {0}")]
    NoRoute(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Where an outbound message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundTarget {
    Connection(String),
    Endpoints(Vec<String>),
}

#[async_trait]
pub trait OutboundTransport: Send + Sync {
    async fn send(&self, message: &Message, target: OutboundTarget) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TailsError {
    #[error("tails file unavailable at {uri}: {message}")]
    Fetch { uri: String, message: String },
}

/// Downloads tails files from their public location.
#[async_trait]
pub trait TailsFetcher: Send + Sync {
    async fn fetch(&self, public_uri: &str) -> Result<Vec<u8>, TailsError>;
}
