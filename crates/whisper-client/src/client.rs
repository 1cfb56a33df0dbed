//! [`WhisperClient`]: activation, send, receive and read receipts on top of
//! the identity, crypto and storage layers.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use whisper_shared::identity::{key_from_base64, parse_seed_phrase, whisper_id_from_public_key};
use whisper_shared::{
    CryptoEngine, Envelope, GroupEnvelope, GroupId, Identity, IdentityError, IdentityService,
    ReadReceipt, WhisperId,
};
use whisper_store::{
    Contact, ConversationStore, Database, Direction, ExpiryReaper, Message, MessageStatus,
    StoreError, SweepReport,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::gateway::MessagingGateway;

/// What happened to an incoming envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Stored(Message),
    /// Sender is not in the contact list; the envelope is dropped.
    UnknownSender(WhisperId),
    /// Sender is blocked; the envelope is dropped silently.
    Blocked,
    /// Authentication failed or the key pair does not match.
    Undecryptable,
    /// Addressed to someone else.
    Misaddressed,
}

pub struct WhisperClient {
    store: ConversationStore,
    gateway: Arc<dyn MessagingGateway>,
    identities: IdentityService,
    crypto: CryptoEngine,
    identity: RwLock<Option<Identity>>,
}

impl WhisperClient {
    pub fn new(store: ConversationStore, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self {
            store,
            gateway,
            identities: IdentityService::new(),
            crypto: CryptoEngine::new(),
            identity: RwLock::new(None),
        }
    }

    /// Open the SQLite store described by `config`.
    pub fn open(config: &ClientConfig, gateway: Arc<dyn MessagingGateway>) -> Result<Self> {
        let path = config.db_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(whisper_store::StoreError::from)?;
        }
        let database = Database::open_at(&path, &config.db_key)?;
        let store = ConversationStore::with_config(Arc::new(database), config.store_config());
        Ok(Self::new(store, gateway))
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Sweep expired messages, then load the stored identity. Must complete
    /// before any conversation list is shown.
    pub async fn activate(&self) -> Result<Option<Identity>> {
        let report: SweepReport = ExpiryReaper::new(&self.store).run().await?;
        tracing::debug!(removed = report.messages_removed, "activation sweep done");

        let loaded = self.store.load_identity().await?;
        match &loaded {
            Some(identity) => tracing::info!(whisper_id = %identity.whisper_id, "identity loaded"),
            None => tracing::info!("no identity stored"),
        }
        *self.identity.write().await = loaded.clone();
        Ok(loaded)
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.identity.read().await.clone()
    }

    async fn require_identity(&self) -> Result<Identity> {
        self.identity().await.ok_or(ClientError::NoIdentity)
    }

    pub async fn create_identity(&self, display_name: Option<String>) -> Result<Identity> {
        let identity = self.identities.create_identity(display_name)?;
        self.adopt_identity(identity).await
    }

    /// Restore an identity from its twelve-word phrase (any whitespace,
    /// any case).
    pub async fn recover_identity(&self, phrase: &str, display_name: Option<String>) -> Result<Identity> {
        let words = parse_seed_phrase(phrase);
        let mut identity = self.identities.recover_from_seed(&words)?;
        identity.display_name = display_name;
        self.adopt_identity(identity).await
    }

    async fn adopt_identity(&self, identity: Identity) -> Result<Identity> {
        self.store.save_identity(&identity).await?;
        *self.identity.write().await = Some(identity.clone());
        Ok(identity)
    }

    async fn require_contact(&self, whisper_id: &WhisperId) -> Result<Contact> {
        self.store
            .get_contact(whisper_id)
            .await?
            .ok_or_else(|| ClientError::UnknownContact(whisper_id.clone()))
    }

    /// Encrypt for `contact`, store locally as `sending`, hand the envelope
    /// to the gateway, then mark the message `sent` or `failed`.
    pub async fn send_message(
        &self,
        contact_id: &WhisperId,
        content: &str,
        reply_to: Option<String>,
    ) -> Result<Message> {
        let identity = self.require_identity().await?;
        let mut message = Message::outgoing(contact_id.as_str(), identity.whisper_id.clone(), content);
        if let Some(reply_to) = reply_to {
            message = message.with_reply_to(reply_to);
        }
        self.send_prepared(identity, contact_id, message).await
    }

    /// Re-send a stored message's content to another contact, flagged as
    /// forwarded.
    pub async fn forward_message(
        &self,
        from_conversation: &WhisperId,
        message_id: &str,
        to_contact: &WhisperId,
    ) -> Result<Message> {
        let identity = self.require_identity().await?;
        let original = self
            .store
            .get_message(from_conversation.as_str(), message_id)
            .await?
            .ok_or_else(|| StoreError::MessageNotFound(message_id.to_string()))?;

        let mut message = Message::outgoing(to_contact.as_str(), identity.whisper_id.clone(), original.content)
            .forwarded();
        message.attachment = original.attachment;
        self.send_prepared(identity, to_contact, message).await
    }

    async fn send_prepared(&self, identity: Identity, contact_id: &WhisperId, message: Message) -> Result<Message> {
        let contact = self.require_contact(contact_id).await?;
        if contact.is_blocked {
            return Err(ClientError::ContactBlocked(contact_id.clone()));
        }

        let their_key = key_from_base64(&contact.public_key)?;
        let payload = self
            .crypto
            .encrypt_message(&message.content, &identity.encryption.secret_key, &their_key)?;

        let mut message = self
            .store
            .add_message(contact_id.as_str(), message, Direction::Outgoing)
            .await?;

        let envelope = Envelope::new(
            message.id.clone(),
            identity.whisper_id,
            contact_id.clone(),
            payload,
            message.timestamp,
        );
        message.status = match self.gateway.send_envelope(envelope).await {
            Ok(()) => MessageStatus::Sent,
            Err(e) => {
                tracing::warn!(contact = %contact_id, message = %message.id, error = %e, "send failed");
                MessageStatus::Failed
            }
        };
        self.store
            .update_message_status(contact_id.as_str(), &message.id, message.status)
            .await?;

        Ok(message)
    }

    /// Decrypt and store an envelope from the gateway.
    pub async fn receive_envelope(&self, envelope: Envelope) -> Result<ReceiveOutcome> {
        let identity = self.require_identity().await?;
        if envelope.recipient_whisper_id != identity.whisper_id {
            tracing::warn!(recipient = %envelope.recipient_whisper_id, "envelope for another recipient");
            return Ok(ReceiveOutcome::Misaddressed);
        }

        let sender = envelope.sender_whisper_id.clone();
        let Some(contact) = self.store.get_contact(&sender).await? else {
            tracing::debug!(sender = %sender, "envelope from unknown sender");
            return Ok(ReceiveOutcome::UnknownSender(sender));
        };
        if contact.is_blocked {
            return Ok(ReceiveOutcome::Blocked);
        }

        let Ok(their_key) = key_from_base64(&contact.public_key) else {
            tracing::warn!(contact = %sender, "contact has unusable public key");
            return Ok(ReceiveOutcome::Undecryptable);
        };
        let Some(plaintext) = self.crypto.decrypt_message(
            &envelope.payload(),
            &identity.encryption.secret_key,
            &their_key,
        ) else {
            tracing::warn!(sender = %sender, "envelope failed to decrypt");
            return Ok(ReceiveOutcome::Undecryptable);
        };

        let mut message = Message::incoming(sender.as_str(), sender.clone(), plaintext, envelope.timestamp);
        if !envelope.message_id.is_empty() {
            message.id = envelope.message_id;
        }
        let stored = self
            .store
            .add_message(sender.as_str(), message, Direction::Incoming)
            .await?;
        Ok(ReceiveOutcome::Stored(stored))
    }

    /// Record a first-contact request as a pending contact, after checking
    /// that `whisper_id` really belongs to `public_key`.
    pub async fn receive_message_request(
        &self,
        whisper_id: &WhisperId,
        public_key: &str,
        username: Option<String>,
    ) -> Result<Contact> {
        let key = key_from_base64(public_key)?;
        if &whisper_id_from_public_key(&key) != whisper_id {
            tracing::warn!(claimed = %whisper_id, "message request with mismatched key");
            return Err(IdentityError::WhisperIdMismatch.into());
        }

        if let Some(existing) = self.store.get_contact(whisper_id).await? {
            return Ok(existing);
        }

        let mut contact = Contact::new(whisper_id.clone(), public_key.trim().to_string());
        contact.username = username;
        contact.is_pending = true;
        let contact = self.store.add_contact(contact).await?;
        tracing::info!(contact = %whisper_id, "message request received");
        Ok(contact)
    }

    pub async fn accept_message_request(&self, whisper_id: &WhisperId) -> Result<Contact> {
        Ok(self.store.accept_contact_request(whisper_id).await?)
    }

    /// Mark a conversation read and, when read receipts are enabled, tell
    /// the sender which messages were read.
    pub async fn mark_conversation_read(&self, contact_id: &WhisperId) -> Result<Vec<String>> {
        let identity = self.require_identity().await?;
        if self.store.get_conversation(contact_id.as_str()).await?.is_none() {
            return Err(StoreError::ConversationNotFound(contact_id.to_string()).into());
        }
        let changed = self
            .store
            .mark_messages_as_read(contact_id.as_str(), &identity.whisper_id)
            .await?;
        if changed.is_empty() {
            return Ok(changed);
        }

        let privacy = self.store.get_privacy_settings().await?;
        if privacy.read_receipts {
            let receipt = ReadReceipt {
                from: identity.whisper_id,
                to: contact_id.clone(),
                message_ids: changed.clone(),
                timestamp: Utc::now(),
            };
            if let Err(e) = self.gateway.send_read_receipts(receipt).await {
                // local state is already correct; the receipt is best effort
                tracing::warn!(contact = %contact_id, error = %e, "read receipts not sent");
            }
        }
        Ok(changed)
    }

    /// Apply a read receipt from a contact to our outgoing messages. Ids
    /// that name messages we did not author are skipped.
    pub async fn receive_read_receipt(&self, receipt: &ReadReceipt) -> Result<usize> {
        let identity = self.require_identity().await?;
        if receipt.to != identity.whisper_id {
            tracing::warn!(to = %receipt.to, from = %receipt.from, "read receipt for another recipient");
            return Err(ClientError::MisaddressedReceipt(receipt.to.clone()));
        }

        let conversation = receipt.from.as_str();
        let mut updated = 0;
        for id in &receipt.message_ids {
            let Some(message) = self.store.get_message(conversation, id).await? else {
                continue;
            };
            if message.sender_id != identity.whisper_id {
                tracing::debug!(contact = %receipt.from, message = %id, "receipt names an incoming message");
                continue;
            }
            if self
                .store
                .update_message_status(conversation, id, MessageStatus::Read)
                .await?
            {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Send to a group under the transport-only group scheme.
    pub async fn send_group_message(&self, group_id: &GroupId, content: &str) -> Result<Message> {
        let identity = self.require_identity().await?;
        let payload = self
            .crypto
            .encrypt_for_group(content, &identity.encryption.secret_key)?;

        let message = Message::outgoing(group_id.as_str(), identity.whisper_id.clone(), content);
        let mut message = self
            .store
            .add_group_message(group_id, message, Direction::Outgoing)
            .await?;

        let envelope = GroupEnvelope {
            message_id: message.id.clone(),
            group_id: group_id.clone(),
            sender_whisper_id: identity.whisper_id,
            ciphertext: payload.ciphertext,
            nonce: payload.nonce,
            timestamp: message.timestamp,
        };
        message.status = match self.gateway.send_group_envelope(envelope).await {
            Ok(()) => MessageStatus::Sent,
            Err(e) => {
                tracing::warn!(group = %group_id, error = %e, "group send failed");
                MessageStatus::Failed
            }
        };
        self.store
            .update_group_message_status(group_id, &message.id, message.status)
            .await?;

        Ok(message)
    }

    pub async fn register_push_token(&self, token: &str) -> Result<()> {
        self.gateway.register_push_token(token).await
    }

    /// Erase every local record and forget the loaded identity.
    pub async fn logout(&self) -> Result<()> {
        self.store.clear_all().await?;
        *self.identity.write().await = None;
        tracing::info!("logged out");
        Ok(())
    }
}
