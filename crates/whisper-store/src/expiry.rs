//! One-shot sweep of disappearing messages.
//!
//! Run once on activation, before the conversation list is first shown, so
//! no expired message survives in a list or in a cached preview.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Conversation, GroupConversation, Thread};
use crate::store::ConversationStore;
use crate::threads::ThreadStorage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Conversations and group conversations that lost at least one message.
    pub conversations_touched: usize,
    pub messages_removed: usize,
}

pub struct ExpiryReaper<'a> {
    store: &'a ConversationStore,
}

impl<'a> ExpiryReaper<'a> {
    pub fn new(store: &'a ConversationStore) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> Result<SweepReport> {
        self.sweep(Utc::now()).await
    }

    /// Remove every message with `expires_at <= now` from 1:1 and group
    /// conversations.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        self.sweep_all::<Conversation>(now, &mut report).await?;
        self.sweep_all::<GroupConversation>(now, &mut report).await?;

        if report.messages_removed > 0 {
            tracing::info!(
                conversations = report.conversations_touched,
                removed = report.messages_removed,
                "expired messages removed"
            );
        }
        Ok(report)
    }

    async fn sweep_all<T: ThreadStorage>(&self, now: DateTime<Utc>, report: &mut SweepReport) -> Result<()> {
        let ids: Vec<String> = self
            .store
            .list_threads::<T>()
            .await?
            .iter()
            .map(|t| t.thread_id().to_string())
            .collect();

        for id in ids {
            let removed = self.store.sweep_thread::<T>(&id, now).await?;
            if removed > 0 {
                tracing::debug!(thread = %id, removed, "thread swept");
                report.conversations_touched += 1;
                report.messages_removed += removed;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{Direction, Message};
    use crate::store::tests::memory_store;
    use whisper_shared::WhisperId;

    fn wid(s: &str) -> WhisperId {
        WhisperId(s.into())
    }

    fn expiring(conv: &str, id: &str, sent: DateTime<Utc>, expires: Option<DateTime<Utc>>) -> Message {
        let mut m = Message::incoming(conv, wid(conv), id, sent);
        m.id = id.to_string();
        m.expires_at = expires;
        m
    }

    #[tokio::test]
    async fn removes_only_expired_and_fixes_previews() {
        let (_, store) = memory_store();
        let now = Utc::now();
        let a = "WSP-AAAA-0000-0001";
        let b = "WSP-BBBB-0000-0001";

        // a: preview expires, an older durable message remains
        store
            .add_message(a, expiring(a, "a-keep", now - Duration::hours(2), None), Direction::Incoming)
            .await
            .unwrap();
        store
            .add_message(
                a,
                expiring(a, "a-gone", now - Duration::hours(1), Some(now - Duration::seconds(1))),
                Direction::Incoming,
            )
            .await
            .unwrap();
        // b: everything expires
        store
            .add_message(
                b,
                expiring(b, "b-gone", now - Duration::hours(1), Some(now)),
                Direction::Incoming,
            )
            .await
            .unwrap();
        // c: still in the future
        let c = "WSP-CCCC-0000-0001";
        store
            .add_message(
                c,
                expiring(c, "c-later", now - Duration::hours(1), Some(now + Duration::hours(1))),
                Direction::Incoming,
            )
            .await
            .unwrap();

        let report = ExpiryReaper::new(&store).sweep(now).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                conversations_touched: 2,
                messages_removed: 2
            }
        );

        let a_conv = store.get_conversation(a).await.unwrap().unwrap();
        assert_eq!(a_conv.last_message.map(|m| m.id), Some("a-keep".to_string()));
        let b_conv = store.get_conversation(b).await.unwrap().unwrap();
        assert!(b_conv.last_message.is_none());
        assert!(store.get_messages(b).await.unwrap().is_empty());
        assert_eq!(store.get_messages(c).await.unwrap().len(), 1);

        // second pass is a no-op
        let again = ExpiryReaper::new(&store).sweep(now).await.unwrap();
        assert_eq!(again, SweepReport::default());
    }

    #[tokio::test]
    async fn sweeps_group_conversations() {
        let (_, store) = memory_store();
        let now = Utc::now();
        let me = wid("WSP-ME00-0000-0001");
        let group = store.create_group("g", &me, []).await.unwrap();
        store.set_group_disappearing_messages(&group.id, Some(60)).await.unwrap();

        let old = Message::incoming(group.id.as_str(), wid("WSP-BOB0-0000-0001"), "old", now - Duration::minutes(5));
        store.add_group_message(&group.id, old, Direction::Incoming).await.unwrap();

        let report = ExpiryReaper::new(&store).sweep(now).await.unwrap();
        assert_eq!(report.messages_removed, 1);
        assert!(store.get_group_messages(&group.id).await.unwrap().is_empty());
        let conversation = store.get_group_conversation(&group.id).await.unwrap().unwrap();
        assert!(conversation.last_message.is_none());
    }

    #[tokio::test]
    async fn run_on_empty_store() {
        let (_, store) = memory_store();
        assert_eq!(ExpiryReaper::new(&store).run().await.unwrap(), SweepReport::default());
    }
}
