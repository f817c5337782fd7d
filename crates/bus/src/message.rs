use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire-format envelope for a device or rule-produced message.
///
/// Envelopes are serialized with MessagePack. Routing uses `domain` and
/// `channel`; the full bus topic is `{prefix}{domain}.{channel}` (see
/// [`crate::topics`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Tenant the message belongs to.
    pub domain: String,

    /// Channel the message was published on.
    pub channel: String,

    /// Client or rule that produced the message.
    #[serde(default)]
    pub publisher: String,

    /// Raw payload bytes as sent by the publisher.
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,

    /// When this message was created.
    pub created: DateTime<Utc>,

    /// Unique id for tracing a message across hops.
    pub id: Uuid,
}

impl Message {
    pub fn new(
        domain: impl Into<String>,
        channel: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            domain: domain.into(),
            channel: channel.into(),
            publisher: String::new(),
            payload: payload.into(),
            created: Utc::now(),
            id: Uuid::new_v4(),
        }
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// `{domain}.{channel}`, the topic suffix after the bus prefix.
    pub fn route(&self) -> String {
        format!("{}.{}", self.domain, self.channel)
    }

    /// Payload as JSON when it parses, otherwise as a (lossy) UTF-8 string.
    pub fn payload_value(&self) -> serde_json::Value {
        match serde_json::from_slice(&self.payload) {
            Ok(v) => v,
            Err(_) => serde_json::Value::String(String::from_utf8_lossy(&self.payload).into_owned()),
        }
    }

    /// Serialize this envelope to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    /// Deserialize an envelope from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// Helper module for serde to handle `Vec<u8>` as raw bytes in MessagePack.
/// Also accepts a sequence of numbers or a string so JSON seed files work.
mod serde_bytes {
    use std::fmt;

    use serde::de::{Error, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        d.deserialize_byte_buf(BytesVisitor)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a byte buffer")
        }

        fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
            Ok(v)
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<Vec<u8>, E> {
            Ok(v.as_bytes().to_vec())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u8>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(b) = seq.next_element::<u8>()? {
                out.push(b);
            }
            Ok(out)
        }
    }
}
