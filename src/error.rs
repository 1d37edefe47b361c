//! SDK error type.

use crate::types::TokenId;

/// All errors returned by the farm-tracker SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Configuration ────────────────────────────────────────────────────────
    /// A required contract or pool address is absent (zero) in the startup
    /// configuration. Never retried; surfaced before any chain work begins.
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    /// A farm family failed load-time validation (empty incentive list,
    /// non-chronological ordering, or a pool mismatch between incentives).
    #[error("Invalid farm family `{family}`: {reason}")]
    InvalidFarmFamily { family: String, reason: String },

    /// An address literal could not be parsed.
    #[error("Invalid address literal: {0}")]
    InvalidAddress(String),

    // ── Incentive records ────────────────────────────────────────────────────
    /// A malformed incentive record was passed to the identity deriver.
    #[error("Invalid incentive record: {0}")]
    InvalidIncentive(String),

    // ── Chain query ──────────────────────────────────────────────────────────
    /// A read or log scan against the chain-query capability failed.
    /// Transient by nature; retry policy belongs to the capability, not here.
    #[error("Chain query failed: {0}")]
    ChainQuery(#[source] Box<dyn std::error::Error + Send + Sync>),

    // ── Aggregation ──────────────────────────────────────────────────────────
    /// One branch of a concurrent reward join failed. The whole aggregate
    /// fails rather than returning an undercounted sum.
    #[error("Reward aggregation failed for position {token_id}")]
    Aggregation {
        token_id: TokenId,
        #[source]
        source: Box<Error>,
    },

    // ── ABI ──────────────────────────────────────────────────────────────────
    /// A value could not be rendered in the contract ABI (oversized uint,
    /// dynamic component inside a static tuple, …).
    #[error("ABI encoding error: {0}")]
    Abi(String),

    /// A chain response did not have the component shape the contract
    /// surface promises.
    #[error("Unexpected response from `{function}`: {reason}")]
    UnexpectedResponse { function: String, reason: String },
}

impl Error {
    /// Wrap a capability-level failure. Intended for [`crate::chain::ChainQuery`]
    /// implementations built on top of concrete RPC clients.
    pub fn chain(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::ChainQuery(Box::new(source))
    }
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
