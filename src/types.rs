//! Core value types shared across the SDK.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Position token id, as minted by the position manager.
pub type TokenId = u64;

/// Reward amount in the reward token's smallest unit.
///
/// Unbounded-precision so sums across incentives and positions never
/// overflow or round.
pub type Amount = num_bigint::BigUint;

// ─── Address ──────────────────────────────────────────────────────────────────

/// A 20-byte contract or account address.
///
/// Parsed case-insensitively from hex (with or without `0x`), compared and
/// hashed by raw bytes, displayed as lowercase `0x`-hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address, used as "unset" in configuration tables.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 40 {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        let raw = hex::decode(digits).map_err(|_| Error::InvalidAddress(s.to_string()))?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&raw);
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ─── IncentiveId ──────────────────────────────────────────────────────────────

/// Deterministic 32-byte identity of an incentive program.
///
/// keccak-256 over the ABI-encoded incentive key; the on-chain staking
/// contract indexes stake records by the same digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncentiveId([u8; 32]);

impl IncentiveId {
    pub fn new(digest: [u8; 32]) -> Self {
        IncentiveId(digest)
    }

    /// The raw digest, in the shape the `stakes(uint256,bytes32)` read expects.
    pub fn to_word(self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for IncentiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for IncentiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IncentiveId({self})")
    }
}

// ─── TxHash ───────────────────────────────────────────────────────────────────

/// Hash of a submitted transaction, returned by [`crate::chain::ChainQuery::send`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        TxHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}
