//! Contract ABI encoding.
//!
//! Implements the subset of the contract ABI the staker surface needs:
//! 32-byte static words (address / uint / int / bool / bytes32), static
//! tuples, dynamic `bytes`, and `bytes[]`. Layouts are byte-exact against
//! the on-chain encoding so derived incentive identities and composed
//! calldata match what the staking contract computes for itself.
//!
//! Call results arrive already decoded into [`AbiValue`] components — the
//! chain-query capability owns output decoding, this module owns input
//! encoding plus typed accessors over decoded components.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};
use crate::types::Address;

/// ABI word size in bytes.
pub const WORD: usize = 32;

// ─── Value model ──────────────────────────────────────────────────────────────

/// A single ABI value, as passed to or returned from a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// `address`
    Address(Address),
    /// `uintN` (any width up to 256 bits)
    Uint(BigUint),
    /// `intN`, sign-extended to a full word
    Int(i64),
    /// `bool`
    Bool(bool),
    /// `bytes32`
    Word([u8; 32]),
    /// dynamic `bytes`
    Bytes(Vec<u8>),
    /// dynamic `bytes[]`
    BytesArray(Vec<Vec<u8>>),
    /// tuple of static components (e.g. an incentive key)
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    fn is_dynamic(&self) -> bool {
        matches!(self, AbiValue::Bytes(_) | AbiValue::BytesArray(_))
    }

    /// Bytes this value occupies in the head section.
    fn head_len(&self) -> usize {
        if self.is_dynamic() {
            WORD
        } else {
            self.static_len()
        }
    }

    fn static_len(&self) -> usize {
        match self {
            AbiValue::Tuple(components) => components.iter().map(AbiValue::static_len).sum(),
            _ => WORD,
        }
    }

    fn encode_static(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            AbiValue::Address(addr) => {
                out.extend_from_slice(&[0u8; 12]);
                out.extend_from_slice(addr.as_bytes());
            }
            AbiValue::Uint(value) => out.extend_from_slice(&uint_word(value)?),
            AbiValue::Int(value) => {
                let fill = if *value < 0 { 0xff } else { 0x00 };
                out.extend_from_slice(&[fill; 24]);
                out.extend_from_slice(&value.to_be_bytes());
            }
            AbiValue::Bool(flag) => {
                let mut word = [0u8; WORD];
                word[WORD - 1] = *flag as u8;
                out.extend_from_slice(&word);
            }
            AbiValue::Word(word) => out.extend_from_slice(word),
            AbiValue::Tuple(components) => {
                for component in components {
                    if component.is_dynamic() {
                        return Err(Error::Abi(
                            "dynamic component inside a static tuple".into(),
                        ));
                    }
                    component.encode_static(out)?;
                }
            }
            AbiValue::Bytes(_) | AbiValue::BytesArray(_) => {
                return Err(Error::Abi("dynamic value in static position".into()));
            }
        }
        Ok(())
    }

    fn encode_tail(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            AbiValue::Bytes(data) => encode_bytes(data, out),
            AbiValue::BytesArray(items) => {
                out.extend_from_slice(&usize_word(items.len()));
                // element offsets are measured from the start of the area
                // after the length word
                let mut offset = items.len() * WORD;
                let mut elements = Vec::new();
                for item in items {
                    out.extend_from_slice(&usize_word(offset));
                    let before = elements.len();
                    encode_bytes(item, &mut elements);
                    offset += elements.len() - before;
                }
                out.extend_from_slice(&elements);
            }
            _ => return Err(Error::Abi("static value in dynamic position".into())),
        }
        Ok(())
    }

    // ── Typed accessors over decoded components ──────────────────────────────

    pub fn as_uint(&self) -> Option<&BigUint> {
        match self {
            AbiValue::Uint(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AbiValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AbiValue::Bytes(data) => Some(data),
            _ => None,
        }
    }
}

// ─── Encoding ─────────────────────────────────────────────────────────────────

/// ABI-encode a sequence of values with the standard head/tail layout.
pub fn encode(values: &[AbiValue]) -> Result<Vec<u8>> {
    let head_len: usize = values.iter().map(AbiValue::head_len).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for value in values {
        if value.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            value.encode_tail(&mut tail)?;
        } else {
            value.encode_static(&mut head)?;
        }
    }

    head.extend_from_slice(&tail);
    Ok(head)
}

/// Render full calldata: 4-byte selector of the canonical `signature`
/// followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Result<Vec<u8>> {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&encode(args)?);
    Ok(data)
}

/// keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the keccak-256 of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

fn encode_bytes(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&usize_word(data.len()));
    out.extend_from_slice(data);
    let rem = data.len() % WORD;
    if rem != 0 {
        out.extend_from_slice(&vec![0u8; WORD - rem]);
    }
}

fn usize_word(n: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(n as u64).to_be_bytes());
    word
}

fn uint_word(value: &BigUint) -> Result<[u8; WORD]> {
    let raw = value.to_bytes_be();
    if raw.len() > WORD {
        return Err(Error::Abi(format!(
            "uint value needs {} bytes; the ABI word is {WORD}",
            raw.len()
        )));
    }
    let mut word = [0u8; WORD];
    word[WORD - raw.len()..].copy_from_slice(&raw);
    Ok(word)
}

// ─── Response component helpers ───────────────────────────────────────────────

pub(crate) fn component<'a>(
    values: &'a [AbiValue],
    index: usize,
    function: &str,
) -> Result<&'a AbiValue> {
    values.get(index).ok_or_else(|| Error::UnexpectedResponse {
        function: function.to_string(),
        reason: format!("missing component {index}"),
    })
}

pub(crate) fn uint_component<'a>(
    values: &'a [AbiValue],
    index: usize,
    function: &str,
) -> Result<&'a BigUint> {
    component(values, index, function)?
        .as_uint()
        .ok_or_else(|| Error::UnexpectedResponse {
            function: function.to_string(),
            reason: format!("component {index} is not a uint"),
        })
}

pub(crate) fn u64_component(values: &[AbiValue], index: usize, function: &str) -> Result<u64> {
    uint_component(values, index, function)?
        .to_u64()
        .ok_or_else(|| Error::UnexpectedResponse {
            function: function.to_string(),
            reason: format!("component {index} does not fit in 64 bits"),
        })
}

pub(crate) fn int_component(values: &[AbiValue], index: usize, function: &str) -> Result<i64> {
    component(values, index, function)?
        .as_int()
        .ok_or_else(|| Error::UnexpectedResponse {
            function: function.to_string(),
            reason: format!("component {index} is not an int"),
        })
}

pub(crate) fn address_component(
    values: &[AbiValue],
    index: usize,
    function: &str,
) -> Result<Address> {
    component(values, index, function)?
        .as_address()
        .ok_or_else(|| Error::UnexpectedResponse {
            function: function.to_string(),
            reason: format!("component {index} is not an address"),
        })
}
