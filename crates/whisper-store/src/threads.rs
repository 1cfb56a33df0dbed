//! Message-list operations shared by 1:1 conversations and groups.
//!
//! A thread is an index entry ([`Conversation`] or [`GroupConversation`])
//! plus one message-list record. Every mutation holds the message-list lock
//! and then the index lock for the whole read-modify-write.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use whisper_shared::{GroupId, WhisperId};

use crate::error::Result;
use crate::keys;
use crate::models::{Conversation, Direction, GroupConversation, Message, MessageStatus, Thread};
use crate::store::ConversationStore;

pub(crate) trait ThreadStorage: Thread {
    const INDEX_KEY: &'static str;

    fn messages_key(thread_id: &str) -> String;

    /// Fresh index entry for a thread touched for the first time.
    fn create(thread_id: &str) -> Self;
}

impl ThreadStorage for Conversation {
    const INDEX_KEY: &'static str = keys::CONVERSATIONS;

    fn messages_key(thread_id: &str) -> String {
        keys::messages(thread_id)
    }

    fn create(thread_id: &str) -> Self {
        Conversation::new(WhisperId(thread_id.to_string()))
    }
}

impl ThreadStorage for GroupConversation {
    const INDEX_KEY: &'static str = keys::GROUP_CONVERSATIONS;

    fn messages_key(thread_id: &str) -> String {
        keys::group_messages(thread_id)
    }

    fn create(thread_id: &str) -> Self {
        GroupConversation::new(GroupId(thread_id.to_string()))
    }
}

/// Drop the oldest entries so at most `cap` remain, order preserved.
pub(crate) fn trim_history(messages: &mut Vec<Message>, cap: usize) -> usize {
    let excess = messages.len().saturating_sub(cap);
    if excess > 0 {
        messages.drain(..excess);
    }
    excess
}

/// Most recent message by timestamp.
pub(crate) fn newest(messages: &[Message]) -> Option<&Message> {
    messages.iter().max_by_key(|m| m.timestamp)
}

/// Replace the cached preview with its current copy from `messages`.
fn refresh_last<T: Thread>(thread: &mut T, messages: &[Message]) {
    let Some(last_id) = thread.last_message().map(|m| m.id.clone()) else {
        return;
    };
    if let Some(current) = messages.iter().find(|m| m.id == last_id) {
        *thread.last_message_mut() = Some(current.clone());
    }
}

impl ConversationStore {
    pub(crate) async fn list_threads<T: ThreadStorage>(&self) -> Result<Vec<T>> {
        let mut threads: Vec<T> = self.read_record(T::INDEX_KEY).await?;
        threads.sort_by_key(|t| std::cmp::Reverse(t.recency()));
        Ok(threads)
    }

    pub(crate) async fn find_thread<T: ThreadStorage>(&self, thread_id: &str) -> Result<Option<T>> {
        let threads: Vec<T> = self.read_record(T::INDEX_KEY).await?;
        Ok(threads.into_iter().find(|t| t.thread_id() == thread_id))
    }

    pub(crate) async fn thread_messages<T: ThreadStorage>(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.read_record(&T::messages_key(thread_id)).await
    }

    /// Get or create the index entry. Caller holds the index lock.
    pub(crate) async fn ensure_thread_locked<T: ThreadStorage>(&self, thread_id: &str) -> Result<T> {
        let mut threads: Vec<T> = self.read_record(T::INDEX_KEY).await?;
        if let Some(existing) = threads.iter().find(|t| t.thread_id() == thread_id) {
            return Ok(existing.clone());
        }
        let created = T::create(thread_id);
        threads.push(created.clone());
        self.write_record(T::INDEX_KEY, &threads).await?;
        tracing::debug!(thread = thread_id, "thread created");
        Ok(created)
    }

    pub(crate) async fn ensure_thread<T: ThreadStorage>(&self, thread_id: &str) -> Result<T> {
        let _index = self.locks.lock(T::INDEX_KEY).await;
        self.ensure_thread_locked(thread_id).await
    }

    /// Apply `f` to the thread's index entry, creating it if needed.
    /// Caller holds the index lock.
    pub(crate) async fn modify_thread_locked<T, F>(&self, thread_id: &str, f: F) -> Result<T>
    where
        T: ThreadStorage,
        F: FnOnce(&mut T),
    {
        let mut threads: Vec<T> = self.read_record(T::INDEX_KEY).await?;
        let position = match threads.iter().position(|t| t.thread_id() == thread_id) {
            Some(position) => position,
            None => {
                threads.push(T::create(thread_id));
                threads.len() - 1
            }
        };
        f(&mut threads[position]);
        let updated = threads[position].clone();
        self.write_record(T::INDEX_KEY, &threads).await?;
        Ok(updated)
    }

    pub(crate) async fn set_thread_ttl<T: ThreadStorage>(
        &self,
        thread_id: &str,
        ttl_secs: Option<u64>,
    ) -> Result<T> {
        let _index = self.locks.lock(T::INDEX_KEY).await;
        let ttl_secs = ttl_secs.filter(|secs| *secs > 0);
        let thread = self
            .modify_thread_locked::<T, _>(thread_id, |t| t.set_disappearing_ttl_secs(ttl_secs))
            .await?;
        tracing::info!(thread = thread_id, ttl_secs = ?ttl_secs, "disappearing messages updated");
        Ok(thread)
    }

    /// Append (or replace by id) a message, trim history, refresh the
    /// preview and bump the unread counter for unread incoming messages.
    pub(crate) async fn append_message<T: ThreadStorage>(
        &self,
        thread_id: &str,
        mut message: Message,
        direction: Direction,
    ) -> Result<Message> {
        let messages_key = T::messages_key(thread_id);
        let _messages = self.locks.lock(&messages_key).await;
        let _index = self.locks.lock(T::INDEX_KEY).await;

        let thread: T = self.ensure_thread_locked(thread_id).await?;
        if message.expires_at.is_none() {
            message = message.with_ttl(thread.disappearing_ttl_secs());
        }

        let mut messages: Vec<Message> = self.read_record(&messages_key).await?;
        // A stored id only counts as a redelivery from the same author;
        // another sender reusing it gets a fresh id.
        if messages
            .iter()
            .any(|m| m.id == message.id && m.sender_id != message.sender_id)
        {
            tracing::warn!(thread = thread_id, message = %message.id, "message id reused by another sender");
            message.id = Uuid::new_v4().to_string();
        }
        let replaced = match messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => {
                *existing = message.clone();
                true
            }
            None => {
                messages.push(message.clone());
                false
            }
        };

        let trimmed = trim_history(&mut messages, self.config.max_messages_per_conversation);
        if trimmed > 0 {
            tracing::debug!(thread = thread_id, trimmed, "history cap reached");
        }
        self.write_record(&messages_key, &messages).await?;

        let counts_unread = !replaced
            && direction == Direction::Incoming
            && message.status != MessageStatus::Read;
        self.modify_thread_locked::<T, _>(thread_id, |t| {
            let is_newer = t
                .last_message()
                .map_or(true, |last| message.timestamp >= last.timestamp || last.id == message.id);
            if is_newer {
                t.set_last(Some(message.clone()));
            }
            if counts_unread {
                *t.unread_count_mut() += 1;
            }
        })
        .await?;

        Ok(message)
    }

    /// Apply `f` to one message. Returns `false` when the id is unknown.
    pub(crate) async fn modify_message<T, F>(&self, thread_id: &str, message_id: &str, f: F) -> Result<bool>
    where
        T: ThreadStorage,
        F: FnOnce(&mut Message),
    {
        let messages_key = T::messages_key(thread_id);
        let _messages = self.locks.lock(&messages_key).await;
        let _index = self.locks.lock(T::INDEX_KEY).await;

        let mut messages: Vec<Message> = self.read_record(&messages_key).await?;
        let Some(message) = messages.iter_mut().find(|m| m.id == message_id) else {
            return Ok(false);
        };
        f(message);
        self.write_record(&messages_key, &messages).await?;

        if self.find_thread::<T>(thread_id).await?.is_some() {
            self.modify_thread_locked::<T, _>(thread_id, |t| refresh_last(t, &messages))
                .await?;
        }
        Ok(true)
    }

    /// Remove a message and recompute the preview from what remains.
    pub(crate) async fn remove_message<T: ThreadStorage>(&self, thread_id: &str, message_id: &str) -> Result<bool> {
        let messages_key = T::messages_key(thread_id);
        let _messages = self.locks.lock(&messages_key).await;
        let _index = self.locks.lock(T::INDEX_KEY).await;

        let mut messages: Vec<Message> = self.read_record(&messages_key).await?;
        let before = messages.len();
        messages.retain(|m| m.id != message_id);
        if messages.len() == before {
            return Ok(false);
        }
        self.write_record(&messages_key, &messages).await?;

        if self.find_thread::<T>(thread_id).await?.is_some() {
            let latest = newest(&messages).cloned();
            self.modify_thread_locked::<T, _>(thread_id, |t| t.set_last(latest))
                .await?;
        }
        Ok(true)
    }

    /// Flip remote-authored, unread messages to `read`, persist once and
    /// zero the unread counter. Returns the ids that changed.
    pub(crate) async fn mark_thread_read<T: ThreadStorage>(
        &self,
        thread_id: &str,
        local_id: &WhisperId,
    ) -> Result<Vec<String>> {
        let messages_key = T::messages_key(thread_id);
        let _messages = self.locks.lock(&messages_key).await;
        let _index = self.locks.lock(T::INDEX_KEY).await;

        let mut messages: Vec<Message> = self.read_record(&messages_key).await?;
        let mut changed = Vec::new();
        for message in messages.iter_mut() {
            if &message.sender_id != local_id && message.status != MessageStatus::Read {
                message.status = MessageStatus::Read;
                changed.push(message.id.clone());
            }
        }

        if !changed.is_empty() {
            self.write_record(&messages_key, &messages).await?;
        }

        if self.find_thread::<T>(thread_id).await?.is_some() {
            self.modify_thread_locked::<T, _>(thread_id, |t| {
                *t.unread_count_mut() = 0;
                refresh_last(t, &messages);
            })
            .await?;
        }

        tracing::debug!(thread = thread_id, changed = changed.len(), "messages marked read");
        Ok(changed)
    }

    /// Remove the index entry and its message list.
    pub(crate) async fn remove_thread<T: ThreadStorage>(&self, thread_id: &str) -> Result<bool> {
        let messages_key = T::messages_key(thread_id);
        let _messages = self.locks.lock(&messages_key).await;
        let _index = self.locks.lock(T::INDEX_KEY).await;
        self.remove_thread_locked::<T>(thread_id).await
    }

    /// Caller holds the message-list and index locks.
    pub(crate) async fn remove_thread_locked<T: ThreadStorage>(&self, thread_id: &str) -> Result<bool> {
        let mut threads: Vec<T> = self.read_record(T::INDEX_KEY).await?;
        let before = threads.len();
        threads.retain(|t| t.thread_id() != thread_id);
        let removed = threads.len() != before;

        self.remove_record(&T::messages_key(thread_id)).await?;
        if removed {
            self.write_record(T::INDEX_KEY, &threads).await?;
        }
        Ok(removed)
    }

    /// Remove every message that has expired at `now`. Returns how many were
    /// removed. The preview is recomputed when it was among them.
    pub(crate) async fn sweep_thread<T: ThreadStorage>(&self, thread_id: &str, now: DateTime<Utc>) -> Result<usize> {
        let messages_key = T::messages_key(thread_id);
        let _messages = self.locks.lock(&messages_key).await;
        let _index = self.locks.lock(T::INDEX_KEY).await;

        let messages: Vec<Message> = self.read_record(&messages_key).await?;
        let (expired, retained): (Vec<Message>, Vec<Message>) =
            messages.into_iter().partition(|m| m.is_expired(now));
        if expired.is_empty() {
            return Ok(0);
        }
        self.write_record(&messages_key, &retained).await?;

        let Some(thread) = self.find_thread::<T>(thread_id).await? else {
            return Ok(expired.len());
        };
        let preview_expired = thread
            .last_message()
            .is_some_and(|last| expired.iter().any(|m| m.id == last.id));
        if preview_expired {
            let latest = newest(&retained).cloned();
            self.modify_thread_locked::<T, _>(thread_id, |t| t.set_last(latest))
                .await?;
        }
        Ok(expired.len())
    }

    pub(crate) async fn search_thread<T: ThreadStorage>(&self, thread_id: &str, query: &str) -> Result<Vec<Message>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits: Vec<Message> = self
            .thread_messages::<T>(thread_id)
            .await?
            .into_iter()
            .filter(|m| m.content.to_lowercase().contains(&query))
            .collect();
        hits.sort_by_key(|m| std::cmp::Reverse(m.timestamp));
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_at(secs: i64) -> Message {
        let mut m = Message::incoming(
            "WSP-AAAA-AAAA-AAAA",
            WhisperId("WSP-AAAA-AAAA-AAAA".into()),
            format!("m{secs}"),
            DateTime::from_timestamp(secs, 0).unwrap(),
        );
        m.id = format!("id{secs}");
        m
    }

    #[test]
    fn trim_keeps_newest_in_order() {
        let mut messages: Vec<Message> = (0..1001).map(message_at).collect();
        assert_eq!(trim_history(&mut messages, 1000), 1);
        assert_eq!(messages.len(), 1000);
        assert_eq!(messages[0].id, "id1");
        assert_eq!(messages[999].id, "id1000");
        assert!(messages.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn trim_under_cap_is_noop() {
        let mut messages: Vec<Message> = (0..5).map(message_at).collect();
        assert_eq!(trim_history(&mut messages, 1000), 0);
        assert_eq!(messages.len(), 5);
    }

    #[test]
    fn newest_by_timestamp_not_position() {
        let messages = vec![message_at(5), message_at(9), message_at(2)];
        assert_eq!(newest(&messages).map(|m| m.id.as_str()), Some("id9"));
        assert!(newest(&[]).is_none());
    }
}
