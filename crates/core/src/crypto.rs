//! Ed25519 cryptographic primitives for signing and verification.

use crate::hash::{hash, Hash};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix of every key-derived address.
pub const ADDRESS_PREFIX: &str = "ADDR_";

/// Number of hash bytes kept in an address.
pub const ADDRESS_BYTES: usize = 20;

const COINBASE: &str = "COINBASE";

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid address format: {0}")]
    InvalidAddress(String),
    #[error("signature verification failed")]
    VerificationFailed,
}

/// An address on the ledger.
///
/// Stored in normalized uppercase form so that comparison and hashing
/// are case-insensitive. Two reserved forms exist: the `COINBASE`
/// sentinel and key-derived `ADDR_` addresses (contract addresses are
/// ordinary key-derived addresses that happen to have a contract bound).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// The coinbase sentinel used as the sender of mining rewards.
    pub fn coinbase() -> Self {
        Self(COINBASE.to_string())
    }

    /// Check if this is the coinbase sentinel.
    pub fn is_coinbase(&self) -> bool {
        self.0 == COINBASE
    }

    /// Derive an address from raw public key bytes.
    pub fn from_public_key_bytes(bytes: &[u8]) -> Self {
        let digest = hash(bytes);
        let hex20 = hex::encode_upper(&digest.0[..ADDRESS_BYTES]);
        Self(format!("{}{}", ADDRESS_PREFIX, hex20))
    }

    /// Parse an address (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let upper = s.trim().to_uppercase();
        if upper == COINBASE {
            return Ok(Self::coinbase());
        }
        let body = upper
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| CryptoError::InvalidAddress(s.to_string()))?;
        if body.len() != ADDRESS_BYTES * 2 || hex::decode(body).is_err() {
            return Err(CryptoError::InvalidAddress(s.to_string()));
        }
        Ok(Self(upper))
    }

    /// The canonical textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A cryptographic signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidSignature)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }

    /// True for the all-zero placeholder carried by unsigned values.
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 64]
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Signature::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A public key for signature verification.
#[derive(Clone)]
pub struct PublicKey(pub VerifyingKey);

impl PublicKey {
    /// Import a public key from its hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidPublicKey)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&arr)
            .map(PublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Export the public key as hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Derive the address from this public key.
    pub fn to_address(&self) -> Address {
        Address::from_public_key_bytes(self.0.as_bytes())
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Verify a signature over the Blake3 digest of `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        self.verify_hash(&hash(message), signature)
    }

    /// Verify a signature made directly over a hash.
    pub fn verify_hash(&self, digest: &Hash, signature: &Signature) -> Result<(), CryptoError> {
        let sig = DalekSignature::from_bytes(&signature.0);
        self.0
            .verify(digest.as_bytes(), &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0.as_bytes()[..8]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for PublicKey {}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A keypair for signing and verification.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    pub public_key: PublicKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            public_key: PublicKey(verifying_key),
        }
    }

    /// Create a keypair from a private key (32 bytes).
    pub fn from_private_key(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            public_key: PublicKey(verifying_key),
        }
    }

    /// Import a keypair from the hex encoding of its private key.
    pub fn from_private_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_private_key(&arr))
    }

    /// Get the private key bytes.
    pub fn private_key(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Export the private key as hex.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key())
    }

    /// Get the address derived from the public key.
    pub fn address(&self) -> Address {
        self.public_key.to_address()
    }

    /// Sign the Blake3 digest of a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.sign_hash(&hash(message))
    }

    /// Sign a hash directly.
    pub fn sign_hash(&self, digest: &Hash) -> Signature {
        let sig = self.signing_key.sign(digest.as_bytes());
        Signature(sig.to_bytes())
    }

    /// Verify a signature against our public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        self.public_key.verify(message, signature)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_format() {
        let kp = Keypair::generate();
        let addr = kp.address();
        assert!(addr.as_str().starts_with(ADDRESS_PREFIX));
        assert_eq!(addr.as_str().len(), ADDRESS_PREFIX.len() + 40);
        assert!(!addr.is_coinbase());
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = Keypair::generate();
        let message = b"hello world";
        let sig = kp.sign(message);
        assert!(kp.verify(message, &sig).is_ok());
    }

    #[test]
    fn test_single_bit_flip_fails() {
        let kp = Keypair::generate();
        let message = b"From:A|To:B|Amount:1|Fee:0".to_vec();
        let sig = kp.sign(&message);

        for byte in 0..message.len() {
            let mut tampered = message.clone();
            tampered[byte] ^= 0x01;
            assert!(kp.verify(&tampered, &sig).is_err());
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let sig = kp1.sign(b"hello");
        assert!(matches!(
            kp2.verify(b"hello", &sig),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn test_address_case_insensitive() {
        let kp = Keypair::generate();
        let addr = kp.address();
        let lower = addr.as_str().to_lowercase();
        assert_eq!(Address::parse(&lower).unwrap(), addr);
        assert_eq!(Address::parse("coinbase").unwrap(), Address::coinbase());
    }

    #[test]
    fn test_address_parse_rejects_garbage() {
        assert!(Address::parse("ADDR_1234").is_err());
        assert!(Address::parse("0x0000000000000000000000000000000000000000").is_err());
        assert!(Address::parse(&format!("ADDR_{}", "ZZ".repeat(20))).is_err());
    }

    #[test]
    fn test_key_hex_roundtrip() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::from_private_hex(&kp1.private_key_hex()).unwrap();
        assert_eq!(kp1.address(), kp2.address());

        let pk = PublicKey::from_hex(&kp1.public_key.to_hex()).unwrap();
        assert_eq!(pk, kp1.public_key);

        let sig = kp1.sign(b"payload");
        let parsed = Signature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn test_malformed_key_material_is_an_error() {
        assert!(matches!(
            Keypair::from_private_hex("abcd"),
            Err(CryptoError::InvalidPrivateKey)
        ));
        assert!(matches!(
            PublicKey::from_hex("not hex"),
            Err(CryptoError::InvalidPublicKey)
        ));
        assert!(matches!(
            Signature::from_hex("00ff"),
            Err(CryptoError::InvalidSignature)
        ));
    }

    #[test]
    fn test_deterministic_address() {
        let kp1 = Keypair::generate();
        let private_key = kp1.private_key();
        let kp2 = Keypair::from_private_key(&private_key);
        let kp3 = Keypair::from_private_key(&private_key);
        assert_eq!(kp2.address(), kp3.address());
        assert_eq!(kp1.address(), kp2.address());
    }
}
