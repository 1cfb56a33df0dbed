//! Domain model structs persisted through the secure key-value backend.
//!
//! Every struct derives `Serialize` and `Deserialize`; the serialized JSON
//! is what lands in storage and what the UI layer receives. Optional and
//! later-added fields carry `#[serde(default)]` so older records still load.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use whisper_shared::identity::{key_from_base64, key_to_base64, Identity, KeyPair};
use whisper_shared::{GroupId, IdentityError, WhisperId};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Persisted form of the local [`Identity`]. Keys are base64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredIdentity {
    pub whisper_id: WhisperId,
    pub public_key: String,
    pub private_key: String,
    pub signing_public_key: String,
    pub signing_private_key: String,
    pub seed_phrase: Vec<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for StoredIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            whisper_id: identity.whisper_id.clone(),
            public_key: key_to_base64(&identity.encryption.public_key),
            private_key: key_to_base64(&identity.encryption.secret_key),
            signing_public_key: key_to_base64(&identity.signing.public_key),
            signing_private_key: key_to_base64(&identity.signing.secret_key),
            seed_phrase: identity.seed_phrase.clone(),
            display_name: identity.display_name.clone(),
            created_at: identity.created_at,
        }
    }
}

impl TryFrom<StoredIdentity> for Identity {
    type Error = IdentityError;

    fn try_from(stored: StoredIdentity) -> Result<Self, Self::Error> {
        Ok(Identity {
            whisper_id: stored.whisper_id,
            encryption: KeyPair {
                public_key: key_from_base64(&stored.public_key)?,
                secret_key: key_from_base64(&stored.private_key)?,
            },
            signing: KeyPair {
                public_key: key_from_base64(&stored.signing_public_key)?,
                secret_key: key_from_base64(&stored.signing_private_key)?,
            },
            seed_phrase: stored.seed_phrase,
            display_name: stored.display_name,
            created_at: stored.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A known peer. `public_key` is the base64 X25519 key used for encryption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub whisper_id: WhisperId,
    pub public_key: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_blocked: bool,
    /// Arrived as a message request and not yet accepted.
    #[serde(default)]
    pub is_pending: bool,
    pub added_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(whisper_id: WhisperId, public_key: String) -> Self {
        Self {
            whisper_id,
            public_key,
            nickname: None,
            username: None,
            is_blocked: false,
            is_pending: false,
            added_at: Utc::now(),
        }
    }

    /// Nickname, then username, then the raw whisper ID.
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(self.whisper_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

/// Whether a message was authored locally or received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    File,
    Image,
    Voice,
}

/// Descriptor for a file, image or voice note carried by a message. The
/// bytes themselves travel separately, encrypted as binary payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub kind: AttachmentKind,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    /// Voice note length.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Local URI of the decrypted content.
    #[serde(default)]
    pub local_uri: Option<String>,
}

/// A single chat message. The content is stored already decrypted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Conversation id for 1:1 messages, group id for group messages.
    pub conversation_id: String,
    pub sender_id: WhisperId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// Reactor whisper ID -> emoji. One entry per reactor.
    #[serde(default)]
    pub reactions: BTreeMap<WhisperId, String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub forwarded: bool,
}

impl Message {
    /// A locally authored message, status `sending`.
    pub fn outgoing(conversation_id: &str, sender_id: WhisperId, content: impl Into<String>) -> Self {
        Self::build(conversation_id, sender_id, content.into(), Utc::now(), MessageStatus::Sending)
    }

    /// A received message, status `delivered`.
    pub fn incoming(
        conversation_id: &str,
        sender_id: WhisperId,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::build(conversation_id, sender_id, content.into(), timestamp, MessageStatus::Delivered)
    }

    fn build(
        conversation_id: &str,
        sender_id: WhisperId,
        content: String,
        timestamp: DateTime<Utc>,
        status: MessageStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id,
            content,
            timestamp,
            status,
            reply_to: None,
            attachment: None,
            reactions: BTreeMap::new(),
            expires_at: None,
            forwarded: false,
        }
    }

    pub fn with_reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Set `expires_at` to `timestamp + ttl` when a TTL is configured.
    pub fn with_ttl(mut self, ttl_secs: Option<u64>) -> Self {
        self.expires_at = ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|ttl| self.timestamp.checked_add_signed(ttl));
        self
    }

    pub fn forwarded(mut self) -> Self {
        self.forwarded = true;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A 1:1 conversation. `id` equals the contact's whisper ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub contact_id: WhisperId,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disappearing_ttl_secs: Option<u64>,
}

impl Conversation {
    pub fn new(contact_id: WhisperId) -> Self {
        Self {
            id: contact_id.to_string(),
            contact_id,
            last_message: None,
            unread_count: 0,
            created_at: Utc::now(),
            updated_at: None,
            disappearing_ttl_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub members: BTreeSet<WhisperId>,
    pub creator_id: WhisperId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Conversation view of a group, keyed by the group id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupConversation {
    pub id: String,
    pub group_id: GroupId,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disappearing_ttl_secs: Option<u64>,
}

impl GroupConversation {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            id: group_id.to_string(),
            group_id,
            last_message: None,
            unread_count: 0,
            created_at: Utc::now(),
            updated_at: None,
            disappearing_ttl_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Thread: the shared shape of conversations and group conversations
// ---------------------------------------------------------------------------

/// Index entry that owns a message list. Implemented by [`Conversation`] and
/// [`GroupConversation`] so message operations are written once.
pub trait Thread: Clone + Serialize + serde::de::DeserializeOwned + Send + Sync {
    fn thread_id(&self) -> &str;
    fn last_message(&self) -> Option<&Message>;
    fn last_message_mut(&mut self) -> &mut Option<Message>;
    fn unread_count_mut(&mut self) -> &mut u32;
    fn updated_at_mut(&mut self) -> &mut Option<DateTime<Utc>>;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> Option<DateTime<Utc>>;
    fn disappearing_ttl_secs(&self) -> Option<u64>;
    fn set_disappearing_ttl_secs(&mut self, ttl: Option<u64>);

    /// Sort key for "most recent first" listings.
    fn recency(&self) -> DateTime<Utc> {
        self.updated_at().unwrap_or_else(|| self.created_at())
    }

    /// Point the cached preview at `message`, or clear preview and
    /// `updated_at` together.
    fn set_last(&mut self, message: Option<Message>) {
        *self.updated_at_mut() = message.as_ref().map(|m| m.timestamp);
        *self.last_message_mut() = message;
    }
}

macro_rules! impl_thread {
    ($ty:ty) => {
        impl Thread for $ty {
            fn thread_id(&self) -> &str {
                &self.id
            }
            fn last_message(&self) -> Option<&Message> {
                self.last_message.as_ref()
            }
            fn last_message_mut(&mut self) -> &mut Option<Message> {
                &mut self.last_message
            }
            fn unread_count_mut(&mut self) -> &mut u32 {
                &mut self.unread_count
            }
            fn updated_at_mut(&mut self) -> &mut Option<DateTime<Utc>> {
                &mut self.updated_at
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
            fn updated_at(&self) -> Option<DateTime<Utc>> {
                self.updated_at
            }
            fn disappearing_ttl_secs(&self) -> Option<u64> {
                self.disappearing_ttl_secs
            }
            fn set_disappearing_ttl_secs(&mut self, ttl: Option<u64>) {
                self.disappearing_ttl_secs = ttl;
            }
        }
    };
}

impl_thread!(Conversation);
impl_thread!(GroupConversation);
