//! [`ConversationStore`]: typed access to every persisted aggregate.
//!
//! Records are read whole, mutated in memory and written back whole. A
//! record that is missing or fails to parse reads as its default value and
//! the parse failure is logged; backend I/O errors are returned.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use whisper_shared::constants::MAX_STORED_MESSAGES;
use whisper_shared::Identity;

use crate::backend::SecureStorage;
use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::KeyedLocks;
use crate::models::{Conversation, GroupConversation, StoredIdentity};

/// Store tunables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// History cap per conversation or group; oldest messages are trimmed.
    pub max_messages_per_conversation: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_messages_per_conversation: MAX_STORED_MESSAGES,
        }
    }
}

pub struct ConversationStore {
    backend: Arc<dyn SecureStorage>,
    pub(crate) locks: KeyedLocks,
    pub(crate) config: StoreConfig,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn SecureStorage>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: Arc<dyn SecureStorage>, config: StoreConfig) -> Self {
        Self {
            backend,
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    /// Read `key`, degrading absence or a parse failure to `T::default()`.
    pub(crate) async fn read_record<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(T::default());
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "corrupt record, using default");
                Ok(T::default())
            }
        }
    }

    pub(crate) async fn write_record<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.backend.set(key, &json).await
    }

    pub(crate) async fn remove_record(&self, key: &str) -> Result<()> {
        self.backend.remove(key).await
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub async fn save_identity(&self, identity: &Identity) -> Result<()> {
        let _guard = self.locks.lock(keys::IDENTITY).await;
        self.write_record(keys::IDENTITY, &StoredIdentity::from(identity))
            .await?;
        tracing::info!(whisper_id = %identity.whisper_id, "identity saved");
        Ok(())
    }

    /// The stored identity, `None` when there is none (or it is unreadable).
    pub async fn load_identity(&self) -> Result<Option<Identity>> {
        let stored: Option<StoredIdentity> = self.read_record(keys::IDENTITY).await?;
        let Some(stored) = stored else {
            return Ok(None);
        };
        match Identity::try_from(stored) {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                tracing::warn!(key = keys::IDENTITY, error = %e, "corrupt identity record, ignoring");
                Ok(None)
            }
        }
    }

    pub async fn update_display_name(&self, display_name: Option<String>) -> Result<Identity> {
        let _guard = self.locks.lock(keys::IDENTITY).await;
        let mut stored: StoredIdentity = self
            .read_record::<Option<StoredIdentity>>(keys::IDENTITY)
            .await?
            .ok_or(StoreError::NoIdentity)?;

        stored.display_name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.write_record(keys::IDENTITY, &stored).await?;

        Ok(Identity::try_from(stored)?)
    }

    pub async fn delete_identity(&self) -> Result<()> {
        let _guard = self.locks.lock(keys::IDENTITY).await;
        self.remove_record(keys::IDENTITY).await
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Remove every record this store owns.
    ///
    /// Per-conversation and per-group message lists are only reachable
    /// through the conversation and group indexes, so their ids are
    /// collected before any index is deleted.
    pub async fn clear_all(&self) -> Result<()> {
        let _groups = self.locks.lock(keys::GROUPS).await;
        let _conversations = self.locks.lock(keys::CONVERSATIONS).await;
        let _group_conversations = self.locks.lock(keys::GROUP_CONVERSATIONS).await;
        let _contacts = self.locks.lock(keys::CONTACTS).await;

        let conversations: Vec<Conversation> = self.read_record(keys::CONVERSATIONS).await?;
        let group_conversations: Vec<GroupConversation> =
            self.read_record(keys::GROUP_CONVERSATIONS).await?;
        let groups: Vec<crate::models::Group> = self.read_record(keys::GROUPS).await?;

        let mut message_keys: Vec<String> = conversations
            .iter()
            .map(|c| keys::messages(&c.id))
            .collect();
        message_keys.extend(group_conversations.iter().map(|g| keys::group_messages(&g.id)));
        message_keys.extend(groups.iter().map(|g| keys::group_messages(g.id.as_str())));
        message_keys.sort();
        message_keys.dedup();

        for key in &message_keys {
            self.remove_record(key).await?;
        }

        for key in [
            keys::CONVERSATIONS,
            keys::GROUP_CONVERSATIONS,
            keys::GROUPS,
            keys::CONTACTS,
            keys::IDENTITY,
            keys::PRIVACY_SETTINGS,
            keys::APP_LOCK_SETTINGS,
            keys::NOTIFICATION_SETTINGS,
        ] {
            self.remove_record(key).await?;
        }

        tracing::info!(message_lists = message_keys.len(), "all local data cleared");
        Ok(())
    }
}
