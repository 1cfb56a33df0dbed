//! Storage key layout. One serialized record per key.

pub const IDENTITY: &str = "whisper.identity";
pub const CONTACTS: &str = "whisper.contacts";
pub const CONVERSATIONS: &str = "whisper.conversations";
pub const GROUPS: &str = "whisper.groups";
pub const GROUP_CONVERSATIONS: &str = "whisper.group_conversations";
pub const PRIVACY_SETTINGS: &str = "whisper.settings.privacy";
pub const APP_LOCK_SETTINGS: &str = "whisper.settings.app_lock";
pub const NOTIFICATION_SETTINGS: &str = "whisper.settings.notifications";

/// Message list of a 1:1 conversation.
pub fn messages(conversation_id: &str) -> String {
    format!("whisper.messages.{conversation_id}")
}

/// Message list of a group.
pub fn group_messages(group_id: &str) -> String {
    format!("whisper.group_messages.{group_id}")
}
