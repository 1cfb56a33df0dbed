use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::{
    GROUP_ID_PREFIX, ID_ALPHABET, ID_GROUP_COUNT, ID_GROUP_LEN, PUBKEY_SIZE, WHISPER_ID_PREFIX,
};

// Public identity = `WSP-XXXX-XXXX-XXXX`, derived from the X25519 public key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct WhisperId(pub String);

impl WhisperId {
    /// Map the first twelve bytes of the encryption public key, in three
    /// four-byte slices, through [`ID_ALPHABET`].
    pub fn from_public_key(public_key: &[u8; PUBKEY_SIZE]) -> Self {
        Self(format_id(WHISPER_ID_PREFIX, &public_key[..ID_GROUP_COUNT * ID_GROUP_LEN]))
    }

    pub fn parse(s: &str) -> Option<Self> {
        is_valid_id(s, WHISPER_ID_PREFIX).then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WhisperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new() -> Self {
        let mut bytes = [0u8; ID_GROUP_COUNT * ID_GROUP_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(format_id(GROUP_ID_PREFIX, &bytes))
    }

    pub fn parse(s: &str) -> Option<Self> {
        is_valid_id(s, GROUP_ID_PREFIX).then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn format_id(prefix: &str, bytes: &[u8]) -> String {
    let mut out = String::with_capacity(prefix.len() + ID_GROUP_COUNT * (ID_GROUP_LEN + 1));
    out.push_str(prefix);
    for chunk in bytes.chunks(ID_GROUP_LEN).take(ID_GROUP_COUNT) {
        out.push('-');
        for b in chunk {
            out.push(ID_ALPHABET[*b as usize % ID_ALPHABET.len()] as char);
        }
    }
    out
}

fn is_valid_id(s: &str, prefix: &str) -> bool {
    let mut parts = s.split('-');
    if parts.next() != Some(prefix) {
        return false;
    }
    let groups: Vec<&str> = parts.collect();
    groups.len() == ID_GROUP_COUNT
        && groups.iter().all(|g| {
            g.len() == ID_GROUP_LEN && g.bytes().all(|b| ID_ALPHABET.contains(&b))
        })
}
