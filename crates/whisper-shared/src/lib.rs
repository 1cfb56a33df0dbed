//! # whisper-shared
//!
//! Identity derivation, message encryption and the identifier and wire types
//! shared by the store and the client.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod types;
pub mod wordlist;

pub use crypto::{CryptoEngine, EncryptedPayload};
pub use error::{CryptoError, IdentityError, SeedPhraseError};
pub use identity::{Identity, IdentityService, KeyPair};
pub use protocol::{Envelope, GroupEnvelope, ReadReceipt};
pub use types::{GroupId, WhisperId};
