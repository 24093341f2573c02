//! Consumer signatures over run submissions.
//!
//! A consumer signs the SHA-256 digest of its own consumer id with an
//! ed25519 key. Signatures and keys travel as lowercase hex.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::{ConsumerId, CoreError};

/// A consumer's private signing key.
#[derive(Clone)]
pub struct ConsumerKey {
    key: SigningKey,
}

impl ConsumerKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self {
            key: SigningKey::generate(&mut csprng),
        }
    }

    /// Load a key from its 32-byte hex-encoded secret.
    pub fn from_hex(secret: &str) -> Result<Self, CoreError> {
        let bytes: [u8; 32] = decode_fixed(secret, "private key")?;
        Ok(Self {
            key: SigningKey::from_bytes(&bytes),
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    /// Hex-encoded public key, as registered with the node.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().as_bytes())
    }

    /// Sign a consumer id, returning the hex signature.
    pub fn sign_consumer_id(&self, consumer_id: &ConsumerId) -> String {
        let digest = consumer_digest(consumer_id);
        hex::encode(self.key.sign(&digest).to_bytes())
    }
}

impl std::fmt::Debug for ConsumerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerKey")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

/// Sign `consumer_id` with `key`.
pub fn sign_consumer_id(consumer_id: &ConsumerId, key: &ConsumerKey) -> String {
    key.sign_consumer_id(consumer_id)
}

/// Check `signature` was produced over `consumer_id` by the holder of
/// `public_key`.
pub fn verify_consumer_signature(
    consumer_id: &ConsumerId,
    signature: &str,
    public_key: &str,
) -> Result<(), CoreError> {
    if signature.trim().is_empty() {
        return Err(CoreError::signature("signature is empty"));
    }
    let key_bytes: [u8; 32] = decode_fixed(public_key, "public key")?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| CoreError::signature(format!("invalid public key: {e}")))?;
    let sig_bytes: [u8; 64] = decode_fixed(signature, "signature")?;
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify(&consumer_digest(consumer_id), &signature)
        .map_err(|e| CoreError::signature(format!("verification failed: {e}")))
}

fn consumer_digest(consumer_id: &ConsumerId) -> [u8; 32] {
    Sha256::digest(consumer_id.as_str().as_bytes()).into()
}

fn decode_fixed<const N: usize>(value: &str, what: &str) -> Result<[u8; N], CoreError> {
    let bytes = hex::decode(value.trim())
        .map_err(|e| CoreError::signature(format!("invalid {what} hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| CoreError::signature(format!("{what} must be {N} bytes")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let key = ConsumerKey::generate();
        let consumer = ConsumerId::new("user:alice");
        let signature = sign_consumer_id(&consumer, &key);
        assert_eq!(signature.len(), 128);
        assert!(verify_consumer_signature(&consumer, &signature, &key.public_key_hex()).is_ok());
    }

    #[test]
    fn test_wrong_consumer_rejected() {
        let key = ConsumerKey::generate();
        let signature = key.sign_consumer_id(&ConsumerId::new("user:alice"));
        let result = verify_consumer_signature(
            &ConsumerId::new("user:mallory"),
            &signature,
            &key.public_key_hex(),
        );
        assert!(matches!(result, Err(CoreError::Signature(_))));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signer = ConsumerKey::generate();
        let other = ConsumerKey::generate();
        let consumer = ConsumerId::new("user:alice");
        let signature = signer.sign_consumer_id(&consumer);
        assert!(verify_consumer_signature(&consumer, &signature, &other.public_key_hex()).is_err());
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        let key = ConsumerKey::generate();
        let consumer = ConsumerId::new("user:alice");
        assert!(verify_consumer_signature(&consumer, "", &key.public_key_hex()).is_err());
        assert!(verify_consumer_signature(&consumer, "zz", &key.public_key_hex()).is_err());
        assert!(verify_consumer_signature(&consumer, "abcd", &key.public_key_hex()).is_err());
        let signature = key.sign_consumer_id(&consumer);
        assert!(verify_consumer_signature(&consumer, &signature, "00").is_err());
    }

    #[test]
    fn test_key_hex_round_trip() {
        let key = ConsumerKey::generate();
        let restored = ConsumerKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(restored.public_key_hex(), key.public_key_hex());

        let consumer = ConsumerId::new("user:bob");
        let signature = restored.sign_consumer_id(&consumer);
        assert!(verify_consumer_signature(&consumer, &signature, &key.public_key_hex()).is_ok());
    }
}
