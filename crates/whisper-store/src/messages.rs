use whisper_shared::WhisperId;

use crate::error::Result;
use crate::models::{Conversation, Direction, Message, MessageStatus};
use crate::store::ConversationStore;

impl ConversationStore {
    /// All messages of a conversation, oldest first.
    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.thread_messages::<Conversation>(conversation_id).await
    }

    pub async fn get_message(&self, conversation_id: &str, message_id: &str) -> Result<Option<Message>> {
        Ok(self
            .get_messages(conversation_id)
            .await?
            .into_iter()
            .find(|m| m.id == message_id))
    }

    /// Store a message, creating the conversation on first touch. History
    /// is capped; the oldest messages are dropped first.
    pub async fn add_message(
        &self,
        conversation_id: &str,
        message: Message,
        direction: Direction,
    ) -> Result<Message> {
        self.append_message::<Conversation>(conversation_id, message, direction)
            .await
    }

    pub async fn update_message_status(
        &self,
        conversation_id: &str,
        message_id: &str,
        status: MessageStatus,
    ) -> Result<bool> {
        let found = self
            .modify_message::<Conversation, _>(conversation_id, message_id, |m| m.status = status)
            .await?;
        if !found {
            tracing::debug!(conversation = conversation_id, message = message_id, "status update for unknown message");
        }
        Ok(found)
    }

    pub async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<bool> {
        self.remove_message::<Conversation>(conversation_id, message_id)
            .await
    }

    /// Mark every message not authored by `local_id` as read. The returned
    /// ids are the ones to acknowledge upstream with read receipts.
    pub async fn mark_messages_as_read(
        &self,
        conversation_id: &str,
        local_id: &WhisperId,
    ) -> Result<Vec<String>> {
        self.mark_thread_read::<Conversation>(conversation_id, local_id)
            .await
    }

    /// Case-insensitive substring search, newest first.
    pub async fn search_messages(&self, conversation_id: &str, query: &str) -> Result<Vec<Message>> {
        self.search_thread::<Conversation>(conversation_id, query)
            .await
    }
}
