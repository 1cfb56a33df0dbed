//! Emoji reactions. Each reactor holds at most one emoji per message.

use whisper_shared::{GroupId, WhisperId};

use crate::error::{Result, StoreError};
use crate::models::{Conversation, GroupConversation, Message};
use crate::store::ConversationStore;

/// Set or clear `reactor`'s reaction on `message`.
fn apply_reaction(message: &mut Message, reactor: &WhisperId, emoji: Option<&str>) {
    match emoji.map(str::trim).filter(|e| !e.is_empty()) {
        Some(emoji) => {
            message.reactions.insert(reactor.clone(), emoji.to_string());
        }
        None => {
            message.reactions.remove(reactor);
        }
    }
}

impl ConversationStore {
    /// Upsert `reactor -> emoji`, or remove the reactor's entry when
    /// `emoji` is `None`. Returns `false` for an unknown message.
    pub async fn update_message_reaction(
        &self,
        conversation_id: &str,
        message_id: &str,
        reactor: &WhisperId,
        emoji: Option<&str>,
    ) -> Result<bool> {
        self.modify_message::<Conversation, _>(conversation_id, message_id, |m| {
            apply_reaction(m, reactor, emoji)
        })
        .await
    }

    pub async fn update_group_message_reaction(
        &self,
        group_id: &GroupId,
        message_id: &str,
        reactor: &WhisperId,
        emoji: Option<&str>,
    ) -> Result<bool> {
        if self.get_group(group_id).await?.is_none() {
            return Err(StoreError::GroupNotFound(group_id.to_string()));
        }
        self.modify_message::<GroupConversation, _>(group_id.as_str(), message_id, |m| {
            apply_reaction(m, reactor, emoji)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use crate::store::tests::memory_store;

    const CONV: &str = "WSP-BOB0-0000-0001";

    fn wid(s: &str) -> WhisperId {
        WhisperId(s.into())
    }

    #[tokio::test]
    async fn one_reaction_per_reactor() {
        let (_, store) = memory_store();
        let message = store
            .add_message(
                CONV,
                Message::outgoing(CONV, wid("WSP-ME00-0000-0001"), "hi"),
                Direction::Outgoing,
            )
            .await
            .unwrap();
        let bob = wid(CONV);
        let carol = wid("WSP-CARO-L000-0001");

        store.update_message_reaction(CONV, &message.id, &bob, Some("👍")).await.unwrap();
        store.update_message_reaction(CONV, &message.id, &bob, Some("❤️")).await.unwrap();
        store.update_message_reaction(CONV, &message.id, &carol, Some("😂")).await.unwrap();

        let stored = store.get_message(CONV, &message.id).await.unwrap().unwrap();
        assert_eq!(stored.reactions.len(), 2);
        assert_eq!(stored.reactions.get(&bob).map(String::as_str), Some("❤️"));

        store.update_message_reaction(CONV, &message.id, &bob, None).await.unwrap();
        let stored = store.get_message(CONV, &message.id).await.unwrap().unwrap();
        assert!(!stored.reactions.contains_key(&bob));
        assert_eq!(stored.reactions.len(), 1);

        // preview carries the current reaction map
        let conversation = store.get_conversation(CONV).await.unwrap().unwrap();
        assert_eq!(conversation.last_message.unwrap().reactions, stored.reactions);
    }

    #[tokio::test]
    async fn unknown_message_reports_false() {
        let (_, store) = memory_store();
        assert!(!store
            .update_message_reaction(CONV, "missing", &wid(CONV), Some("👍"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn group_reaction_requires_group() {
        let (_, store) = memory_store();
        let result = store
            .update_group_message_reaction(&GroupId("GRP-AAAA-AAAA-AAAA".into()), "m", &wid(CONV), Some("👍"))
            .await;
        assert!(matches!(result, Err(StoreError::GroupNotFound(_))));
    }
}
