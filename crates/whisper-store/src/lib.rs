//! # whisper-store
//!
//! Local persistence for the Whisper client. Every aggregate (identity,
//! contacts, conversation and group indexes, message lists, settings) is one
//! JSON record behind the [`SecureStorage`] key-value seam. [`Database`] is
//! the SQLite implementation (SQLCipher with the `sqlcipher` feature);
//! [`MemoryStorage`] backs the tests.
//!
//! [`ConversationStore`] owns the read-modify-write cycles and serializes
//! them per record key, and [`ExpiryReaper`] purges disappearing messages.

pub mod backend;
pub mod database;
pub mod expiry;
pub mod keys;
pub mod migrations;
pub mod models;
pub mod settings;
pub mod store;

mod contacts;
mod conversations;
mod error;
mod groups;
mod locks;
mod messages;
mod reactions;
mod threads;

pub use backend::{MemoryStorage, SecureStorage};
pub use database::Database;
pub use error::{Result, StoreError};
pub use expiry::{ExpiryReaper, SweepReport};
pub use models::*;
pub use settings::{AppLockSettings, NotificationSettings, PrivacySettings, SETTINGS_VERSION};
pub use store::{ConversationStore, StoreConfig};
