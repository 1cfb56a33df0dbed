/// Application name
pub const APP_NAME: &str = "Whisper";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// X25519 / Ed25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// X25519 / Ed25519 secret key size in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Ed25519 detached signature size in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Number of words in a recovery phrase
pub const SEED_PHRASE_WORDS: usize = 12;

/// Seed buffer length fed to the key constructors
pub const SEED_SIZE: usize = 32;

/// Domain-separation prefix for the signing key derivation
pub const SIGNING_SEED_PREFIX: &str = "sign:";

/// Positional XOR multipliers used when folding phrase bytes into a seed.
/// Changing either value breaks recovery of every existing identity.
pub const ENCRYPTION_FOLD_MULTIPLIER: usize = 7;
pub const SIGNING_FOLD_MULTIPLIER: usize = 13;

/// Identifier prefixes and layout (`WSP-XXXX-XXXX-XXXX`)
pub const WHISPER_ID_PREFIX: &str = "WSP";
pub const GROUP_ID_PREFIX: &str = "GRP";
pub const ID_GROUP_COUNT: usize = 3;
pub const ID_GROUP_LEN: usize = 4;

/// Alphabet the identifier characters are drawn from
pub const ID_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Key derivation contexts (BLAKE3)
pub const KDF_CONTEXT_MESSAGE_KEY: &str = "whisper-message-key-v1";
pub const KDF_CONTEXT_PIN_HASH: &str = "whisper-app-lock-pin-v1";

/// Maximum messages retained per conversation or group
pub const MAX_STORED_MESSAGES: usize = 1000;
