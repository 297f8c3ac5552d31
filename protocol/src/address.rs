//! # Account Addresses
//!
//! An [`Address`] is an opaque 160-bit account identifier, rendered as
//! `0x`-prefixed lowercase hex:
//!
//! ```text
//! 0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed
//! ```
//!
//! The all-zero address is the zero-sentinel. It stands for "no account":
//! the `from` side of a mint, a rejected recipient, and the owner of a
//! ledger whose ownership was renounced.
//!
//! Addresses carry no key material. Whoever hosts the ledger authenticates
//! callers and hands the resulting address to each operation.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The string is not valid hexadecimal.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded bytes have the wrong length.
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identifier.
///
/// Ordered bytewise so that maps keyed by address iterate deterministically,
/// which keeps persisted layouts and state digests stable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The zero-sentinel address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derives a deterministic address from a human label: the last 20
    /// bytes of `SHA-256(label)`. Used for dev accounts and fixtures.
    ///
    /// ```
    /// use luigi_protocol::Address;
    ///
    /// let alice = Address::from_label("alice");
    /// assert_eq!(alice, Address::from_label("alice"));
    /// assert_ne!(alice, Address::from_label("bob"));
    /// assert!(!alice.is_zero());
    /// ```
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Builds an address from a byte slice of exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let array: [u8; ADDRESS_LENGTH] =
            bytes.try_into().map_err(|_| AddressError::InvalidLength {
                expected: ADDRESS_LENGTH,
                got: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Returns `true` for the zero-sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Accepts 40 hex digits in either case, with or without `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

// Addresses travel as hex strings in every format, so JSON map keys work and
// the bincode event log stays readable with a hex dump.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
