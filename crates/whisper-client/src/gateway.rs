//! Boundary to the messaging relay. The client only ever hands it
//! ciphertext envelopes and read receipts.

use async_trait::async_trait;

use whisper_shared::{Envelope, GroupEnvelope, ReadReceipt};

use crate::error::Result;

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_envelope(&self, envelope: Envelope) -> Result<()>;

    async fn send_group_envelope(&self, envelope: GroupEnvelope) -> Result<()>;

    /// Acknowledge `receipt.message_ids` to `receipt.to`.
    async fn send_read_receipts(&self, receipt: ReadReceipt) -> Result<()>;

    async fn register_push_token(&self, token: &str) -> Result<()>;
}
