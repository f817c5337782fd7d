use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use zeromq::prelude::*;
use zeromq::{PubSocket, SubSocket, ZmqMessage};

use crate::error::BusError;
use crate::message::Message;
use crate::topics;
use crate::traits::{EventPublisher, EventSubscriber};
use crate::transport::Transport;

/// ZeroMQ PUB socket publisher.
///
/// Messages are sent as two-frame ZMQ messages:
/// 1. Topic string `{prefix}{domain}.{channel}` (SUB-side prefix filtering)
/// 2. MessagePack-encoded [`Message`] envelope
pub struct ZmqPublisher {
    socket: Mutex<PubSocket>,
    prefix: String,
}

impl ZmqPublisher {
    /// Connect to a broker frontend (its XSUB side).
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, BusError> {
        let mut socket = PubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting PUB socket to bus frontend");
        socket.connect(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
            prefix: topics::DEFAULT_PREFIX.to_string(),
        })
    }

    /// Bind directly; subscribers connect to this endpoint (no broker).
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(transport: &Transport) -> Result<Self, BusError> {
        transport
            .ensure_ipc_dir()
            .map_err(|e| BusError::Transport(e.to_string()))?;
        let mut socket = PubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "binding PUB socket");
        socket.bind(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
            prefix: topics::DEFAULT_PREFIX.to_string(),
        })
    }

    /// Override the topic prefix (defaults to [`topics::DEFAULT_PREFIX`]).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

#[async_trait]
impl EventPublisher for ZmqPublisher {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        if message.domain.is_empty() || message.channel.is_empty() {
            return Err(BusError::Rejected("message has no domain or channel".into()));
        }
        let topic = topics::channel_topic(&self.prefix, &message.domain, &message.channel);
        let envelope_bytes = message.to_bytes()?;

        let mut zmq_msg = ZmqMessage::from(topic.as_str());
        zmq_msg.push_back(envelope_bytes.into());

        let mut socket = self.socket.lock().await;
        socket.send(zmq_msg).await?;

        debug!(topic = %topic, message_id = %message.id, "published message");
        Ok(())
    }
}

/// ZeroMQ SUB socket subscriber.
///
/// Expects the two-frame layout written by [`ZmqPublisher`].
pub struct ZmqSubscriber {
    socket: Mutex<SubSocket>,
}

impl ZmqSubscriber {
    /// Connect to a broker backend (its XPUB side) or directly to a bound publisher.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, BusError> {
        let mut socket = SubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting SUB socket");
        socket.connect(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }
}

#[async_trait]
impl EventSubscriber for ZmqSubscriber {
    /// An empty prefix subscribes to all topics.
    async fn subscribe(&self, topic_prefix: &str) -> Result<(), BusError> {
        let mut socket = self.socket.lock().await;
        socket.subscribe(topic_prefix).await?;
        info!(topic_prefix = %topic_prefix, "subscribed to topic prefix");
        Ok(())
    }

    async fn recv(&self) -> Result<Message, BusError> {
        let mut socket = self.socket.lock().await;
        let zmq_msg = socket.recv().await?;

        let frames: Vec<_> = zmq_msg.iter().collect();
        // [topic, envelope]; a lone frame is taken as the envelope.
        let envelope = match frames.as_slice() {
            [_, envelope, ..] => envelope.as_ref(),
            [only] => only.as_ref(),
            [] => return Err(BusError::Transport("empty ZMQ message".into())),
        };
        let message = Message::from_bytes(envelope)?;
        debug!(route = %message.route(), message_id = %message.id, "received message");
        Ok(message)
    }
}
