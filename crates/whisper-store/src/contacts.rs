//! CRUD operations for [`Contact`] records.

use whisper_shared::WhisperId;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::models::{Contact, Conversation};
use crate::store::ConversationStore;

impl ConversationStore {
    pub async fn get_contacts(&self) -> Result<Vec<Contact>> {
        self.read_record(keys::CONTACTS).await
    }

    pub async fn get_contact(&self, whisper_id: &WhisperId) -> Result<Option<Contact>> {
        Ok(self
            .get_contacts()
            .await?
            .into_iter()
            .find(|c| &c.whisper_id == whisper_id))
    }

    /// Contacts that arrived as message requests and are not yet accepted.
    pub async fn get_pending_requests(&self) -> Result<Vec<Contact>> {
        Ok(self
            .get_contacts()
            .await?
            .into_iter()
            .filter(|c| c.is_pending && !c.is_blocked)
            .collect())
    }

    /// Insert or update by whisper ID. An existing entry keeps its
    /// `added_at`, nickname and blocked flag; a pending entry stays pending
    /// only if the update is pending too.
    pub async fn add_contact(&self, contact: Contact) -> Result<Contact> {
        let _guard = self.locks.lock(keys::CONTACTS).await;
        let mut contacts: Vec<Contact> = self.read_record(keys::CONTACTS).await?;

        let saved = match contacts.iter_mut().find(|c| c.whisper_id == contact.whisper_id) {
            Some(existing) => {
                existing.public_key = contact.public_key;
                if contact.username.is_some() {
                    existing.username = contact.username;
                }
                if contact.nickname.is_some() {
                    existing.nickname = contact.nickname;
                }
                existing.is_pending = existing.is_pending && contact.is_pending;
                existing.clone()
            }
            None => {
                contacts.push(contact.clone());
                contact
            }
        };

        self.write_record(keys::CONTACTS, &contacts).await?;
        tracing::debug!(contact = %saved.whisper_id, pending = saved.is_pending, "contact saved");
        Ok(saved)
    }

    pub async fn update_contact_nickname(
        &self,
        whisper_id: &WhisperId,
        nickname: Option<String>,
    ) -> Result<Contact> {
        let nickname = nickname.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        self.modify_contact(whisper_id, |c| c.nickname = nickname).await
    }

    pub async fn set_contact_blocked(&self, whisper_id: &WhisperId, blocked: bool) -> Result<Contact> {
        self.modify_contact(whisper_id, |c| c.is_blocked = blocked).await
    }

    /// Turn a pending message request into a regular contact.
    pub async fn accept_contact_request(&self, whisper_id: &WhisperId) -> Result<Contact> {
        self.modify_contact(whisper_id, |c| c.is_pending = false).await
    }

    /// Delete a contact together with its conversation and messages.
    pub async fn delete_contact(&self, whisper_id: &WhisperId) -> Result<bool> {
        let messages_key = keys::messages(whisper_id.as_str());
        let _messages = self.locks.lock(&messages_key).await;
        let _conversations = self.locks.lock(keys::CONVERSATIONS).await;
        let _contacts = self.locks.lock(keys::CONTACTS).await;

        let mut contacts: Vec<Contact> = self.read_record(keys::CONTACTS).await?;
        let before = contacts.len();
        contacts.retain(|c| &c.whisper_id != whisper_id);
        let removed = contacts.len() != before;

        let mut conversations: Vec<Conversation> = self.read_record(keys::CONVERSATIONS).await?;
        let conversations_before = conversations.len();
        conversations.retain(|c| &c.contact_id != whisper_id);

        self.remove_record(&messages_key).await?;
        if conversations.len() != conversations_before {
            self.write_record(keys::CONVERSATIONS, &conversations).await?;
        }
        if removed {
            self.write_record(keys::CONTACTS, &contacts).await?;
        }

        tracing::info!(contact = %whisper_id, removed, "contact deleted");
        Ok(removed)
    }

    async fn modify_contact<F>(&self, whisper_id: &WhisperId, f: F) -> Result<Contact>
    where
        F: FnOnce(&mut Contact),
    {
        let _guard = self.locks.lock(keys::CONTACTS).await;
        let mut contacts: Vec<Contact> = self.read_record(keys::CONTACTS).await?;

        let contact = contacts
            .iter_mut()
            .find(|c| &c.whisper_id == whisper_id)
            .ok_or_else(|| StoreError::ContactNotFound(whisper_id.to_string()))?;
        f(contact);
        let updated = contact.clone();

        self.write_record(keys::CONTACTS, &contacts).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Contact, Message};
    use crate::store::tests::memory_store;
    use crate::{keys, StoreError};
    use whisper_shared::WhisperId;

    fn alice() -> WhisperId {
        WhisperId("WSP-ALIC-E000-0001".into())
    }

    #[tokio::test]
    async fn add_and_update_contact() {
        let (_, store) = memory_store();
        store.add_contact(Contact::new(alice(), "pk1".into())).await.unwrap();

        let updated = store
            .update_contact_nickname(&alice(), Some("  Al ".into()))
            .await
            .unwrap();
        assert_eq!(updated.nickname.as_deref(), Some("Al"));

        // re-adding keeps the nickname and added_at, refreshes the key
        let original = store.get_contact(&alice()).await.unwrap().unwrap();
        let again = store.add_contact(Contact::new(alice(), "pk2".into())).await.unwrap();
        assert_eq!(again.nickname.as_deref(), Some("Al"));
        assert_eq!(again.public_key, "pk2");
        assert_eq!(again.added_at, original.added_at);
        assert_eq!(store.get_contacts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_contact_rejected() {
        let (_, store) = memory_store();
        assert!(matches!(
            store.set_contact_blocked(&alice(), true).await,
            Err(StoreError::ContactNotFound(_))
        ));
    }

    #[tokio::test]
    async fn pending_requests_flow() {
        let (_, store) = memory_store();
        let mut request = Contact::new(alice(), "pk".into());
        request.is_pending = true;
        store.add_contact(request).await.unwrap();
        assert_eq!(store.get_pending_requests().await.unwrap().len(), 1);

        store.accept_contact_request(&alice()).await.unwrap();
        assert!(store.get_pending_requests().await.unwrap().is_empty());
        assert!(!store.get_contact(&alice()).await.unwrap().unwrap().is_pending);
    }

    #[tokio::test]
    async fn delete_contact_cascades() {
        let (backend, store) = memory_store();
        store.add_contact(Contact::new(alice(), "pk".into())).await.unwrap();
        let message = Message::incoming(alice().as_str(), alice(), "hi", chrono::Utc::now());
        store
            .add_message(alice().as_str(), message, crate::Direction::Incoming)
            .await
            .unwrap();
        assert!(backend.keys().contains(&keys::messages(alice().as_str())));

        assert!(store.delete_contact(&alice()).await.unwrap());
        assert!(store.get_contact(&alice()).await.unwrap().is_none());
        assert!(store.get_conversation(alice().as_str()).await.unwrap().is_none());
        assert!(!backend.keys().contains(&keys::messages(alice().as_str())));

        assert!(!store.delete_contact(&alice()).await.unwrap());
    }
}
