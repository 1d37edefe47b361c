//! The chain-query capability.
//!
//! Everything the tracker knows about the chain flows through [`ChainQuery`].
//! The surrounding application implements it over whatever RPC client it
//! already carries; the tracker never holds a provider, session, or wallet of
//! its own. Retry and timeout policy also live behind this trait — the
//! tracker propagates the first failure it sees.

use async_trait::async_trait;

use crate::abi::{self, AbiValue};
use crate::error::Result;
use crate::types::{Address, TxHash};

// ─── Transactions ─────────────────────────────────────────────────────────────

/// A composed, ready-to-send contract call.
///
/// Builders return these without submitting them; signing, submission, and
/// receipt-waiting belong to the caller (or to [`ChainQuery::send`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    /// Canonical function signature, e.g. `multicall(bytes[])`.
    pub function: String,
    pub args: Vec<AbiValue>,
}

impl TransactionRequest {
    /// Render the exact byte payload: 4-byte selector ‖ ABI-encoded args.
    pub fn calldata(&self) -> Result<Vec<u8>> {
        abi::encode_call(&self.function, &self.args)
    }
}

// ─── Historical events ────────────────────────────────────────────────────────

/// Block window for a log scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    /// `None` means "latest".
    pub to: Option<u64>,
}

impl BlockRange {
    /// The full history, genesis to latest.
    pub fn all() -> Self {
        BlockRange { from: 0, to: None }
    }
}

/// Equality filter over named event fields.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    fields: Vec<(String, AbiValue)>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `name == value` for every matching event.
    pub fn field(mut self, name: impl Into<String>, value: AbiValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn entries(&self) -> &[(String, AbiValue)] {
        &self.fields
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.fields
            .iter()
            .all(|(name, value)| event.field(name) == Some(value))
    }
}

/// One decoded historical event.
#[derive(Debug, Clone)]
pub struct Event {
    pub block_number: u64,
    fields: Vec<(String, AbiValue)>,
}

impl Event {
    pub fn new(block_number: u64, fields: Vec<(String, AbiValue)>) -> Self {
        Event { block_number, fields }
    }

    pub fn field(&self, name: &str) -> Option<&AbiValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

// ─── Capability trait ─────────────────────────────────────────────────────────

/// Typed chain access with fixed operation signatures.
///
/// `function` and `event` parameters are canonical signatures / event names;
/// implementations decode call results into [`AbiValue`] components in
/// declared order.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Non-mutating contract call.
    async fn call(
        &self,
        contract: Address,
        function: &str,
        args: &[AbiValue],
    ) -> Result<Vec<AbiValue>>;

    /// Submit a mutating call; the caller awaits the receipt externally.
    async fn send(&self, tx: &TransactionRequest) -> Result<TxHash>;

    /// Historical log scan, filtered to events whose named fields equal the
    /// filter's values.
    async fn past_events(
        &self,
        contract: Address,
        event: &str,
        range: BlockRange,
        filter: &EventFilter,
    ) -> Result<Vec<Event>>;
}
