//! Signing secrets kept in memory that is wiped on drop.

use crate::errors::InvalidPrivateKey;
use secp256k1::{constants, Message, PublicKey, Secp256k1, SecretKey};
use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;
use std::str::FromStr;
use unionpay_common::hash;
use web3::signing::{Key, Signature, SigningError};
use web3::types::{Address, H256};
use zeroize::{DefaultIsZeroes, Zeroizing};

/// A secp256k1 private key used to sign transactions offline.
///
/// The `Debug` implementation only shows the derived address and the key
/// material is zeroized when the value is dropped.
#[derive(Clone)]
pub struct PrivateKey(Zeroizing<WipedSecretKey>);

impl PrivateKey {
    /// Creates a new private key from raw bytes.
    pub fn from_raw(raw: [u8; 32]) -> Result<Self, InvalidPrivateKey> {
        PrivateKey::from_slice(raw)
    }

    /// Creates a new private key from a slice of bytes.
    pub fn from_slice<B: AsRef<[u8]>>(raw: B) -> Result<Self, InvalidPrivateKey> {
        let secret_key = SecretKey::from_slice(raw.as_ref())?;
        Ok(PrivateKey(Zeroizing::new(WipedSecretKey(secret_key))))
    }

    /// Parses a hex encoded private key, with or without a leading `0x`.
    /// Surrounding whitespace is ignored so keys can be read straight from
    /// environment variables or files.
    pub fn from_hex_str<S: AsRef<str>>(s: S) -> Result<Self, InvalidPrivateKey> {
        let s = s.as_ref().trim();
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let secret_key = SecretKey::from_str(hex_str)?;
        Ok(PrivateKey(Zeroizing::new(WipedSecretKey(secret_key))))
    }

    /// The address controlled by this key.
    pub fn public_address(&self) -> Address {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, self).serialize_uncompressed();

        // The uncompressed encoding starts with the 0x04 tag, the address is
        // the tail of the hash of the remaining 64 bytes.
        debug_assert_eq!(public_key[0], 0x04);
        let hash = hash::keccak256(&public_key[1..]);

        Address::from_slice(&hash[12..])
    }
}

impl FromStr for PrivateKey {
    type Err = InvalidPrivateKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrivateKey::from_hex_str(s)
    }
}

impl Deref for PrivateKey {
    type Target = SecretKey;

    fn deref(&self) -> &Self::Target {
        &(self.0).0
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("PrivateKey")
            .field(&self.public_address())
            .finish()
    }
}

impl Key for &'_ PrivateKey {
    fn sign(&self, message: &[u8], chain_id: Option<u64>) -> Result<Signature, SigningError> {
        let signature = self.sign_message(message)?;
        let v = match chain_id {
            // EIP-155 replay protection
            Some(chain_id) => signature.v + 35 + chain_id * 2,
            None => signature.v + 27,
        };

        Ok(Signature { v, ..signature })
    }

    fn sign_message(&self, message: &[u8]) -> Result<Signature, SigningError> {
        let message =
            Message::from_digest_slice(message).map_err(|_| SigningError::InvalidMessage)?;
        let (recovery_id, signature) = Secp256k1::signing_only()
            .sign_ecdsa_recoverable(&message, self)
            .serialize_compact();

        Ok(Signature {
            v: recovery_id.to_i32() as u64,
            r: H256::from_slice(&signature[..32]),
            s: H256::from_slice(&signature[32..]),
        })
    }

    fn address(&self) -> Address {
        self.public_address()
    }
}

/// `SecretKey` wrapper that zeroizes to `ONE_KEY`, the smallest valid key,
/// since an all-zero secret key is not representable.
#[derive(Clone, Copy)]
struct WipedSecretKey(SecretKey);

/// The secret key with value one (`ONE_KEY` in older secp256k1 releases).
#[allow(non_snake_case)]
fn ONE_KEY() -> SecretKey {
    SecretKey::from_slice(&constants::ONE).expect("one is a valid secret key")
}

impl Default for WipedSecretKey {
    fn default() -> Self {
        WipedSecretKey(ONE_KEY())
    }
}

impl DefaultIsZeroes for WipedSecretKey {}

/// A password for unlocking an account on the node.
///
/// Never printed by `Debug` and zeroized on drop.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Creates a new password from a string.
    pub fn new<S: Into<String>>(password: S) -> Self {
        Password(Zeroizing::new(password.into()))
    }
}

impl<T: Into<String>> From<T> for Password {
    fn from(value: T) -> Self {
        Password::new(value)
    }
}

impl Deref for Password {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("Password").field(&"********").finish()
    }
}
