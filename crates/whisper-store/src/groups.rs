//! Groups, their conversation entries and their message lists.

use std::collections::BTreeSet;

use chrono::Utc;

use whisper_shared::{GroupId, WhisperId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::models::{Direction, Group, GroupConversation, Message, MessageStatus};
use crate::store::ConversationStore;

impl ConversationStore {
    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Create a group with `creator` plus `members`, and its conversation.
    pub async fn create_group(
        &self,
        name: &str,
        creator: &WhisperId,
        members: impl IntoIterator<Item = WhisperId>,
    ) -> Result<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("group name must not be empty".into()));
        }

        let mut member_set: BTreeSet<WhisperId> = members.into_iter().collect();
        member_set.insert(creator.clone());

        let group = Group {
            id: GroupId::new(),
            name: name.to_string(),
            members: member_set,
            creator_id: creator.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.insert_group(group).await
    }

    /// Store a group created elsewhere (e.g. an invitation), keeping its id.
    pub async fn insert_group(&self, group: Group) -> Result<Group> {
        let _groups = self.locks.lock(keys::GROUPS).await;
        let _conversations = self.locks.lock(keys::GROUP_CONVERSATIONS).await;

        let mut groups: Vec<Group> = self.read_record(keys::GROUPS).await?;
        groups.retain(|g| g.id != group.id);
        groups.push(group.clone());
        self.write_record(keys::GROUPS, &groups).await?;

        self.ensure_thread_locked::<GroupConversation>(group.id.as_str())
            .await?;

        tracing::info!(group = %group.id, members = group.members.len(), "group stored");
        Ok(group)
    }

    pub async fn get_groups(&self) -> Result<Vec<Group>> {
        self.read_record(keys::GROUPS).await
    }

    pub async fn get_group(&self, group_id: &GroupId) -> Result<Option<Group>> {
        Ok(self
            .get_groups()
            .await?
            .into_iter()
            .find(|g| &g.id == group_id))
    }

    pub async fn update_group(&self, group_id: &GroupId, name: &str) -> Result<Group> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::Validation("group name must not be empty".into()));
        }
        self.modify_group(group_id, |g| g.name = name).await
    }

    pub async fn add_group_members(
        &self,
        group_id: &GroupId,
        members: impl IntoIterator<Item = WhisperId>,
    ) -> Result<Group> {
        let members: Vec<WhisperId> = members.into_iter().collect();
        self.modify_group(group_id, |g| g.members.extend(members)).await
    }

    pub async fn remove_group_member(&self, group_id: &GroupId, member: &WhisperId) -> Result<Group> {
        self.modify_group(group_id, |g| {
            g.members.remove(member);
        })
        .await
    }

    /// Leave or delete a group: drops the group, its conversation and its
    /// message history.
    pub async fn delete_group(&self, group_id: &GroupId) -> Result<bool> {
        let messages_key = keys::group_messages(group_id.as_str());
        let _messages = self.locks.lock(&messages_key).await;
        let _groups = self.locks.lock(keys::GROUPS).await;
        let _conversations = self.locks.lock(keys::GROUP_CONVERSATIONS).await;

        let mut groups: Vec<Group> = self.read_record(keys::GROUPS).await?;
        let before = groups.len();
        groups.retain(|g| &g.id != group_id);
        let removed = groups.len() != before;

        self.remove_thread_locked::<GroupConversation>(group_id.as_str())
            .await?;
        if removed {
            self.write_record(keys::GROUPS, &groups).await?;
        }

        tracing::info!(group = %group_id, removed, "group deleted");
        Ok(removed)
    }

    /// Leaving drops the same local state as deleting.
    pub async fn leave_group(&self, group_id: &GroupId) -> Result<bool> {
        self.delete_group(group_id).await
    }

    async fn modify_group<F>(&self, group_id: &GroupId, f: F) -> Result<Group>
    where
        F: FnOnce(&mut Group),
    {
        let _guard = self.locks.lock(keys::GROUPS).await;
        let mut groups: Vec<Group> = self.read_record(keys::GROUPS).await?;

        let group = groups
            .iter_mut()
            .find(|g| &g.id == group_id)
            .ok_or_else(|| StoreError::GroupNotFound(group_id.to_string()))?;
        f(group);
        group.updated_at = Some(Utc::now());
        let updated = group.clone();

        self.write_record(keys::GROUPS, &groups).await?;
        Ok(updated)
    }

    async fn require_group(&self, group_id: &GroupId) -> Result<Group> {
        self.get_group(group_id)
            .await?
            .ok_or_else(|| StoreError::GroupNotFound(group_id.to_string()))
    }

    // ------------------------------------------------------------------
    // Group conversations
    // ------------------------------------------------------------------

    /// Group conversations, most recently updated first.
    pub async fn get_group_conversations(&self) -> Result<Vec<GroupConversation>> {
        self.list_threads::<GroupConversation>().await
    }

    pub async fn get_group_conversation(&self, group_id: &GroupId) -> Result<Option<GroupConversation>> {
        self.find_thread::<GroupConversation>(group_id.as_str()).await
    }

    pub async fn set_group_disappearing_messages(
        &self,
        group_id: &GroupId,
        ttl_secs: Option<u64>,
    ) -> Result<GroupConversation> {
        self.require_group(group_id).await?;
        self.set_thread_ttl::<GroupConversation>(group_id.as_str(), ttl_secs)
            .await
    }

    // ------------------------------------------------------------------
    // Group messages
    // ------------------------------------------------------------------

    pub async fn get_group_messages(&self, group_id: &GroupId) -> Result<Vec<Message>> {
        self.thread_messages::<GroupConversation>(group_id.as_str())
            .await
    }

    pub async fn add_group_message(
        &self,
        group_id: &GroupId,
        message: Message,
        direction: Direction,
    ) -> Result<Message> {
        self.require_group(group_id).await?;
        self.append_message::<GroupConversation>(group_id.as_str(), message, direction)
            .await
    }

    pub async fn update_group_message_status(
        &self,
        group_id: &GroupId,
        message_id: &str,
        status: MessageStatus,
    ) -> Result<bool> {
        self.require_group(group_id).await?;
        self.modify_message::<GroupConversation, _>(group_id.as_str(), message_id, |m| {
            m.status = status
        })
        .await
    }

    pub async fn delete_group_message(&self, group_id: &GroupId, message_id: &str) -> Result<bool> {
        self.require_group(group_id).await?;
        self.remove_message::<GroupConversation>(group_id.as_str(), message_id)
            .await
    }

    pub async fn mark_group_messages_as_read(
        &self,
        group_id: &GroupId,
        local_id: &WhisperId,
    ) -> Result<Vec<String>> {
        self.require_group(group_id).await?;
        self.mark_thread_read::<GroupConversation>(group_id.as_str(), local_id)
            .await
    }

    pub async fn search_group_messages(&self, group_id: &GroupId, query: &str) -> Result<Vec<Message>> {
        self.search_thread::<GroupConversation>(group_id.as_str(), query)
            .await
    }
}
