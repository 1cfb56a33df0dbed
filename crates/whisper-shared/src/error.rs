use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid seed phrase: {0}")]
    InvalidSeedPhrase(#[from] SeedPhraseError),

    #[error("Invalid key bytes")]
    InvalidKeyBytes,

    #[error("Whisper ID does not match public key")]
    WhisperIdMismatch,
}

/// Why a recovery phrase was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedPhraseError {
    #[error("expected {expected} words, got {actual}")]
    WrongWordCount { expected: usize, actual: usize },

    #[error("word {position} ({word:?}) is not in the wordlist")]
    UnknownWord { position: usize, word: String },
}
