use thiserror::Error;

use whisper_shared::{CryptoError, IdentityError, WhisperId};
use whisper_store::StoreError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// An operation needs the local identity and none is loaded.
    #[error("No identity loaded")]
    NoIdentity,

    #[error("Unknown contact: {0}")]
    UnknownContact(WhisperId),

    #[error("Contact is blocked: {0}")]
    ContactBlocked(WhisperId),

    /// A read receipt addressed to someone other than the local identity.
    #[error("Read receipt addressed to {0}")]
    MisaddressedReceipt(WhisperId),

    /// The messaging gateway rejected or failed to deliver a request.
    #[error("Gateway error: {0}")]
    Gateway(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
