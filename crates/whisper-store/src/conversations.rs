//! Conversation index operations.

use whisper_shared::WhisperId;

use crate::error::Result;
use crate::models::{Conversation, GroupConversation};
use crate::store::ConversationStore;

impl ConversationStore {
    /// All 1:1 conversations, most recently updated first.
    pub async fn get_conversations(&self) -> Result<Vec<Conversation>> {
        self.list_threads::<Conversation>().await
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        self.find_thread::<Conversation>(conversation_id).await
    }

    pub async fn get_or_create_conversation(&self, contact_id: &WhisperId) -> Result<Conversation> {
        self.ensure_thread::<Conversation>(contact_id.as_str()).await
    }

    /// Enable (`Some(secs)`) or disable (`None` / `Some(0)`) disappearing
    /// messages. Applies to messages stored afterwards.
    pub async fn set_disappearing_messages(
        &self,
        conversation_id: &str,
        ttl_secs: Option<u64>,
    ) -> Result<Conversation> {
        self.set_thread_ttl::<Conversation>(conversation_id, ttl_secs)
            .await
    }

    /// Drop the conversation and its whole message history.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<bool> {
        let removed = self.remove_thread::<Conversation>(conversation_id).await?;
        tracing::info!(conversation = conversation_id, removed, "conversation deleted");
        Ok(removed)
    }

    /// Unread messages across 1:1 and group conversations.
    pub async fn get_total_unread(&self) -> Result<u32> {
        let direct: u32 = self
            .get_conversations()
            .await?
            .iter()
            .map(|c| c.unread_count)
            .sum();
        let groups: u32 = self
            .list_threads::<GroupConversation>()
            .await?
            .iter()
            .map(|g| g.unread_count)
            .sum();
        Ok(direct.saturating_add(groups))
    }
}
