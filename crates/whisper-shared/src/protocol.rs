use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::EncryptedPayload;
use crate::types::{GroupId, WhisperId};

/// Encrypted message as exchanged with the messaging gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Sender-assigned id, shared by both copies of the message so read
    /// receipts and redelivery refer to the same message.
    #[serde(default)]
    pub message_id: String,
    pub sender_whisper_id: WhisperId,
    pub recipient_whisper_id: WhisperId,
    /// Base64 XChaCha20-Poly1305 ciphertext
    pub ciphertext: String,
    /// Base64 24-byte nonce
    pub nonce: String,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn new(
        message_id: impl Into<String>,
        sender: WhisperId,
        recipient: WhisperId,
        payload: EncryptedPayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            sender_whisper_id: sender,
            recipient_whisper_id: recipient,
            ciphertext: payload.ciphertext,
            nonce: payload.nonce,
            timestamp,
        }
    }

    pub fn payload(&self) -> EncryptedPayload {
        EncryptedPayload {
            ciphertext: self.ciphertext.clone(),
            nonce: self.nonce.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Group message under the transport-only group scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEnvelope {
    #[serde(default)]
    pub message_id: String,
    pub group_id: GroupId,
    pub sender_whisper_id: WhisperId,
    pub ciphertext: String,
    pub nonce: String,
    pub timestamp: DateTime<Utc>,
}

/// Acknowledgement that the listed messages were read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub from: WhisperId,
    pub to: WhisperId,
    pub message_ids: Vec<String>,
    pub timestamp: DateTime<Utc>,
}
