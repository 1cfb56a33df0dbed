//! Message-level authenticated encryption and detached signatures.
//!
//! Pairwise messages use X25519 key agreement, a BLAKE3-derived key and
//! XChaCha20-Poly1305 with a fresh random nonce per call. Every decrypt
//! path reports failure as `None`, never as an error.
//!
//! Group messages are transport-only: the symmetric key is the sender's
//! private key tiled to 32 bytes. That keeps outside observers out but does
//! not give member-to-member secrecy, since anyone holding the sender's key
//! material can derive the same key. Changing it would change the wire
//! format, so it stays as is.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::constants::{KDF_CONTEXT_MESSAGE_KEY, NONCE_SIZE, SIGNATURE_SIZE, SYMMETRIC_KEY_SIZE};
use crate::error::CryptoError;
use crate::identity::KeyPair;

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

/// Ciphertext and nonce, both base64, exactly as handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub ciphertext: String,
    pub nonce: String,
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Stateless encryption and signing operations. All inputs are parameters;
/// the only other input is OS randomness for nonces.
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoEngine;

impl CryptoEngine {
    pub fn new() -> Self {
        Self
    }

    /// Random X25519 key pair.
    pub fn generate_key_pair(&self) -> KeyPair {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        KeyPair::x25519_from_seed(seed)
    }

    /// Random Ed25519 key pair.
    pub fn generate_signing_key_pair(&self) -> KeyPair {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        KeyPair {
            public_key: signing_key.verifying_key().to_bytes(),
            secret_key: signing_key.to_bytes(),
        }
    }

    /// Detached Ed25519 signature, base64 encoded.
    pub fn sign(&self, message: &[u8], signing_secret_key: &[u8; 32]) -> String {
        let signing_key = SigningKey::from_bytes(signing_secret_key);
        BASE64.encode(signing_key.sign(message).to_bytes())
    }

    /// Check a base64 signature. Malformed signature or key input is simply
    /// `false`.
    pub fn verify(&self, message: &[u8], signature: &str, signing_public_key: &[u8]) -> bool {
        let Ok(sig_bytes) = BASE64.decode(signature) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; SIGNATURE_SIZE]>::try_from(sig_bytes.as_slice()) else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(signing_public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        verifying_key
            .verify(message, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }

    pub fn encrypt_message(
        &self,
        plaintext: &str,
        my_secret_key: &[u8; 32],
        their_public_key: &[u8; 32],
    ) -> Result<EncryptedPayload, CryptoError> {
        self.encrypt_binary_data(plaintext.as_bytes(), my_secret_key, their_public_key)
    }

    pub fn decrypt_message(
        &self,
        payload: &EncryptedPayload,
        my_secret_key: &[u8; 32],
        their_public_key: &[u8; 32],
    ) -> Option<String> {
        let bytes = self.decrypt_binary_data(payload, my_secret_key, their_public_key)?;
        String::from_utf8(bytes).ok()
    }

    /// Same construction as [`Self::encrypt_message`] for attachment,
    /// image and voice payloads.
    pub fn encrypt_binary_data(
        &self,
        data: &[u8],
        my_secret_key: &[u8; 32],
        their_public_key: &[u8; 32],
    ) -> Result<EncryptedPayload, CryptoError> {
        let key = shared_key(my_secret_key, their_public_key).ok_or(CryptoError::EncryptionFailed)?;
        seal(&key, data)
    }

    pub fn decrypt_binary_data(
        &self,
        payload: &EncryptedPayload,
        my_secret_key: &[u8; 32],
        their_public_key: &[u8; 32],
    ) -> Option<Vec<u8>> {
        let key = shared_key(my_secret_key, their_public_key)?;
        open(&key, payload)
    }

    /// Transport-only group encryption keyed by the sender's private key.
    pub fn encrypt_for_group(
        &self,
        plaintext: &str,
        sender_secret_key: &[u8],
    ) -> Result<EncryptedPayload, CryptoError> {
        let key = tile_key(sender_secret_key).ok_or(CryptoError::InvalidKeyLength {
            expected: SYMMETRIC_KEY_SIZE,
            actual: 0,
        })?;
        seal(&key, plaintext.as_bytes())
    }

    pub fn decrypt_from_group(
        &self,
        payload: &EncryptedPayload,
        sender_secret_key: &[u8],
    ) -> Option<String> {
        let key = tile_key(sender_secret_key)?;
        let bytes = open(&key, payload)?;
        String::from_utf8(bytes).ok()
    }
}

// X25519 agreement followed by BLAKE3 with domain separation. `None` for a
// non-contributory (low-order) peer key.
fn shared_key(my_secret_key: &[u8; 32], their_public_key: &[u8; 32]) -> Option<SymmetricKey> {
    let secret = StaticSecret::from(*my_secret_key);
    let shared = secret.diffie_hellman(&PublicKey::from(*their_public_key));
    if !shared.was_contributory() {
        return None;
    }

    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_MESSAGE_KEY);
    hasher.update(shared.as_bytes());
    Some(*hasher.finalize().as_bytes())
}

// Repeat the key bytes until 32 bytes are filled.
fn tile_key(material: &[u8]) -> Option<SymmetricKey> {
    if material.is_empty() {
        return None;
    }
    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    for (i, b) in key.iter_mut().enumerate() {
        *b = material[i % material.len()];
    }
    Some(key)
}

fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<EncryptedPayload, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(EncryptedPayload {
        ciphertext: BASE64.encode(ciphertext),
        nonce: BASE64.encode(nonce_bytes),
    })
}

fn open(key: &SymmetricKey, payload: &EncryptedPayload) -> Option<Vec<u8>> {
    let nonce_bytes = BASE64.decode(&payload.nonce).ok()?;
    if nonce_bytes.len() != NONCE_SIZE {
        return None;
    }
    let ciphertext = BASE64.decode(&payload.ciphertext).ok()?;

    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(XNonce::from_slice(&nonce_bytes), ciphertext.as_slice())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flip_bit(b64: &str, byte: usize) -> String {
        let mut raw = BASE64.decode(b64).unwrap();
        raw[byte] ^= 0x01;
        BASE64.encode(raw)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let engine = CryptoEngine::new();
        let alice = engine.generate_key_pair();
        let bob = engine.generate_key_pair();

        let payload = engine
            .encrypt_message("Meet at the usual place", &alice.secret_key, &bob.public_key)
            .unwrap();
        let plaintext = engine.decrypt_message(&payload, &bob.secret_key, &alice.public_key);

        assert_eq!(plaintext.as_deref(), Some("Meet at the usual place"));
    }

    #[test]
    fn test_empty_and_unicode_roundtrip() {
        let engine = CryptoEngine::new();
        let alice = engine.generate_key_pair();
        let bob = engine.generate_key_pair();

        for text in ["", "héllo 👋 мир"] {
            let payload = engine
                .encrypt_message(text, &alice.secret_key, &bob.public_key)
                .unwrap();
            assert_eq!(
                engine.decrypt_message(&payload, &bob.secret_key, &alice.public_key).as_deref(),
                Some(text)
            );
        }
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let engine = CryptoEngine::new();
        let alice = engine.generate_key_pair();
        let bob = engine.generate_key_pair();

        let a = engine.encrypt_message("same", &alice.secret_key, &bob.public_key).unwrap();
        let b = engine.encrypt_message("same", &alice.secret_key, &bob.public_key).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_pair_fails() {
        let engine = CryptoEngine::new();
        let alice = engine.generate_key_pair();
        let bob = engine.generate_key_pair();
        let eve = engine.generate_key_pair();

        let payload = engine.encrypt_message("secret", &alice.secret_key, &bob.public_key).unwrap();
        assert!(engine.decrypt_message(&payload, &eve.secret_key, &alice.public_key).is_none());
        assert!(engine.decrypt_message(&payload, &bob.secret_key, &eve.public_key).is_none());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let engine = CryptoEngine::new();
        let alice = engine.generate_key_pair();
        let bob = engine.generate_key_pair();
        let payload = engine.encrypt_message("important", &alice.secret_key, &bob.public_key).unwrap();

        let ct_len = BASE64.decode(&payload.ciphertext).unwrap().len();
        for i in 0..ct_len {
            let tampered = EncryptedPayload {
                ciphertext: flip_bit(&payload.ciphertext, i),
                nonce: payload.nonce.clone(),
            };
            assert!(engine.decrypt_message(&tampered, &bob.secret_key, &alice.public_key).is_none());
        }

        for i in 0..NONCE_SIZE {
            let tampered = EncryptedPayload {
                ciphertext: payload.ciphertext.clone(),
                nonce: flip_bit(&payload.nonce, i),
            };
            assert!(engine.decrypt_message(&tampered, &bob.secret_key, &alice.public_key).is_none());
        }
    }

    #[test]
    fn test_malformed_encoding_fails() {
        let engine = CryptoEngine::new();
        let alice = engine.generate_key_pair();
        let bob = engine.generate_key_pair();
        let payload = engine.encrypt_message("x", &alice.secret_key, &bob.public_key).unwrap();

        let bad_b64 = EncryptedPayload {
            ciphertext: "!!not base64!!".into(),
            nonce: payload.nonce.clone(),
        };
        assert!(engine.decrypt_message(&bad_b64, &bob.secret_key, &alice.public_key).is_none());

        let short_nonce = EncryptedPayload {
            ciphertext: payload.ciphertext.clone(),
            nonce: BASE64.encode([0u8; 12]),
        };
        assert!(engine.decrypt_message(&short_nonce, &bob.secret_key, &alice.public_key).is_none());
    }

    #[test]
    fn test_low_order_public_key_rejected() {
        let engine = CryptoEngine::new();
        let alice = engine.generate_key_pair();
        assert!(engine.encrypt_message("x", &alice.secret_key, &[0u8; 32]).is_err());
    }

    #[test]
    fn test_binary_roundtrip() {
        let engine = CryptoEngine::new();
        let alice = engine.generate_key_pair();
        let bob = engine.generate_key_pair();
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let payload = engine.encrypt_binary_data(&data, &alice.secret_key, &bob.public_key).unwrap();
        assert_eq!(
            engine.decrypt_binary_data(&payload, &bob.secret_key, &alice.public_key),
            Some(data)
        );
    }

    #[test]
    fn test_group_roundtrip_and_transport_only() {
        let engine = CryptoEngine::new();
        let sender = engine.generate_key_pair();
        let other = engine.generate_key_pair();

        let payload = engine.encrypt_for_group("hello group", &sender.secret_key).unwrap();
        assert_eq!(
            engine.decrypt_from_group(&payload, &sender.secret_key).as_deref(),
            Some("hello group")
        );
        assert!(engine.decrypt_from_group(&payload, &other.secret_key).is_none());
    }

    #[test]
    fn test_group_key_tiling() {
        assert_eq!(tile_key(&[1, 2, 3]).unwrap()[..6], [1, 2, 3, 1, 2, 3]);
        assert_eq!(tile_key(&[9u8; 32]), Some([9u8; 32]));
        assert!(tile_key(&[]).is_none());
    }

    #[test]
    fn test_sign_verify() {
        let engine = CryptoEngine::new();
        let keys = engine.generate_signing_key_pair();
        let signature = engine.sign(b"challenge-123", &keys.secret_key);

        assert!(engine.verify(b"challenge-123", &signature, &keys.public_key));
        assert!(!engine.verify(b"challenge-124", &signature, &keys.public_key));

        let other = engine.generate_signing_key_pair();
        assert!(!engine.verify(b"challenge-123", &signature, &other.public_key));
    }

    #[test]
    fn test_verify_never_panics_on_garbage() {
        let engine = CryptoEngine::new();
        let keys = engine.generate_signing_key_pair();
        let signature = engine.sign(b"m", &keys.secret_key);

        assert!(!engine.verify(b"m", "%%%", &keys.public_key));
        assert!(!engine.verify(b"m", &BASE64.encode([0u8; 10]), &keys.public_key));
        assert!(!engine.verify(b"m", &signature, &[1, 2, 3]));
        assert!(!engine.verify(b"m", &signature, &[]));
    }
}
