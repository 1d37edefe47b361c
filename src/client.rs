//! [`FarmClient`] — the main entry point for farm-position tracking.

use std::collections::HashSet;

use futures::future::try_join_all;
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::debug;

use crate::abi::{self, AbiValue};
use crate::chain::{BlockRange, ChainQuery, EventFilter, TransactionRequest};
use crate::error::{Error, Result};
use crate::registry::{Contracts, FarmFamily};
use crate::types::{Address, Amount, TokenId, TxHash};

// ─── Contract surface ─────────────────────────────────────────────────────────

// position manager
const FN_BALANCE_OF: &str = "balanceOf(address)";
const FN_TOKEN_OF_OWNER_BY_INDEX: &str = "tokenOfOwnerByIndex(address,uint256)";
const FN_POSITIONS: &str = "positions(uint256)";
const FN_SAFE_TRANSFER_FROM: &str = "safeTransferFrom(address,address,uint256,bytes)";
const EV_TRANSFER: &str = "Transfer";

// factory
const FN_GET_POOL: &str = "getPool(address,address,uint24)";

// staker
const FN_DEPOSITS: &str = "deposits(uint256)";
const FN_STAKES: &str = "stakes(uint256,bytes32)";
const FN_GET_REWARD_INFO: &str =
    "getRewardInfo((address,address,uint256,uint256,address),uint256)";
const FN_REWARDS: &str = "rewards(address,address)";
const FN_UNSTAKE_TOKEN: &str = "unstakeToken((address,address,uint256,uint256,address),uint256)";
const FN_WITHDRAW_TOKEN: &str = "withdrawToken(uint256,address,bytes)";
const FN_CLAIM_REWARD: &str = "claimReward(address,address,uint256)";
const FN_MULTICALL: &str = "multicall(bytes[])";

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async tracker for liquidity-provider positions across overlapping
/// staking incentive programs.
///
/// Holds only immutable configuration and the chain capability; every query
/// re-reads the chain, so results are never stale by construction. Callers
/// wanting caching must layer it on top — stake liquidity can change between
/// any two reads.
pub struct FarmClient<C: ChainQuery> {
    chain: C,
    contracts: Contracts,
}

impl<C: ChainQuery> FarmClient<C> {
    /// Build a client over a chain capability and a contract address table.
    ///
    /// Fails fast on unset addresses; nothing is read from the chain here.
    pub fn new(chain: C, contracts: Contracts) -> Result<Self> {
        contracts.validate()?;
        Ok(FarmClient { chain, contracts })
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn contracts(&self) -> &Contracts {
        &self.contracts
    }

    // ── Position resolution ──────────────────────────────────────────────────

    /// All position tokens currently owned by `owner`, enumerated by index.
    ///
    /// One round-trip per owned token. When only staked positions matter,
    /// prefer [`deposited_positions`](Self::deposited_positions) — tokens
    /// held by the staker are not in this list at all (custody moved).
    pub async fn owned_positions(&self, owner: Address) -> Result<Vec<TokenId>> {
        let out = self
            .chain
            .call(
                self.contracts.position_manager,
                FN_BALANCE_OF,
                &[AbiValue::Address(owner)],
            )
            .await?;
        let count = abi::u64_component(&out, 0, FN_BALANCE_OF)?;

        let lookups = (0..count).map(|index| async move {
            let out = self
                .chain
                .call(
                    self.contracts.position_manager,
                    FN_TOKEN_OF_OWNER_BY_INDEX,
                    &[AbiValue::Address(owner), AbiValue::Uint(BigUint::from(index))],
                )
                .await?;
            abi::u64_component(&out, 0, FN_TOKEN_OF_OWNER_BY_INDEX)
        });
        let ids = try_join_all(lookups).await?;
        debug!(%owner, count = ids.len(), "enumerated owned positions");
        Ok(ids)
    }

    /// Position tokens `owner` has ever transferred into the staker, filtered
    /// to those still provisioned (open ticks) and matching the family's pool.
    ///
    /// A token can cross into the staker more than once over its lifetime;
    /// ids are de-duplicated before any per-token reads.
    pub async fn deposited_positions(
        &self,
        owner: Address,
        family: &FarmFamily,
    ) -> Result<Vec<TokenId>> {
        let filter = EventFilter::new()
            .field("from", AbiValue::Address(owner))
            .field("to", AbiValue::Address(self.contracts.staker));
        let events = self
            .chain
            .past_events(
                self.contracts.position_manager,
                EV_TRANSFER,
                BlockRange::all(),
                &filter,
            )
            .await?;

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for event in &events {
            let token_id = event
                .field("tokenId")
                .and_then(AbiValue::as_uint)
                .and_then(num_traits::ToPrimitive::to_u64)
                .ok_or_else(|| Error::UnexpectedResponse {
                    function: EV_TRANSFER.to_string(),
                    reason: "event lacks a decodable tokenId field".into(),
                })?;
            if seen.insert(token_id) {
                ids.push(token_id);
            }
        }
        debug!(%owner, events = events.len(), unique = ids.len(), "scanned transfer history");

        let checks = ids.iter().map(|&token_id| async move {
            Ok::<Option<TokenId>, Error>(if self.is_deposited(token_id, family).await? {
                Some(token_id)
            } else {
                None
            })
        });
        let kept = try_join_all(checks).await?;
        Ok(kept.into_iter().flatten().collect())
    }

    /// Whether the position's pool triple resolves to the family's pool.
    ///
    /// The triple is fixed at mint, so for a given family this answer can
    /// only change if the family configuration changes.
    pub async fn is_eligible(&self, token_id: TokenId, family: &FarmFamily) -> Result<bool> {
        if family.pool().is_zero() {
            return Err(Error::MissingConfig("farm family pool address"));
        }
        let position = self
            .chain
            .call(
                self.contracts.position_manager,
                FN_POSITIONS,
                &[AbiValue::Uint(BigUint::from(token_id))],
            )
            .await?;
        // positions() = (nonce, operator, token0, token1, fee, …)
        let token0 = abi::address_component(&position, 2, FN_POSITIONS)?;
        let token1 = abi::address_component(&position, 3, FN_POSITIONS)?;
        let fee = abi::uint_component(&position, 4, FN_POSITIONS)?.clone();

        let out = self
            .chain
            .call(
                self.contracts.factory,
                FN_GET_POOL,
                &[
                    AbiValue::Address(token0),
                    AbiValue::Address(token1),
                    AbiValue::Uint(fee),
                ],
            )
            .await?;
        let pool = abi::address_component(&out, 0, FN_GET_POOL)?;
        Ok(pool == family.pool())
    }

    /// Deposit record check: ticks still open and pool matches the family.
    async fn is_deposited(&self, token_id: TokenId, family: &FarmFamily) -> Result<bool> {
        let deposit = self
            .chain
            .call(
                self.contracts.staker,
                FN_DEPOSITS,
                &[AbiValue::Uint(BigUint::from(token_id))],
            )
            .await?;
        // deposits() = (owner, numberOfStakes, tickLower, tickUpper)
        let tick_lower = abi::int_component(&deposit, 2, FN_DEPOSITS)?;
        let tick_upper = abi::int_component(&deposit, 3, FN_DEPOSITS)?;
        if tick_lower == tick_upper {
            return Ok(false);
        }
        self.is_eligible(token_id, family).await
    }

    // ── Stake state ──────────────────────────────────────────────────────────

    /// Indices (ascending) of the family's incentives under which this
    /// position currently has nonzero staked liquidity.
    ///
    /// This is the single source of truth for current enrollment. It is
    /// recomputed on every call: liquidity can change between reads through
    /// partial unstakes or program expiry, so the result must never be
    /// cached beyond one logical operation.
    pub async fn current_stake_indices(
        &self,
        token_id: TokenId,
        family: &FarmFamily,
    ) -> Result<Vec<usize>> {
        let reads = family.incentives().iter().map(|incentive| {
            let identity = incentive.id();
            async move {
                let out = self
                    .chain
                    .call(
                        self.contracts.staker,
                        FN_STAKES,
                        &[
                            AbiValue::Uint(BigUint::from(token_id)),
                            AbiValue::Word(identity?.to_word()),
                        ],
                    )
                    .await?;
                // stakes() = (secondsPerLiquidityInsideInitialX128, liquidity)
                let liquidity = abi::uint_component(&out, 1, FN_STAKES)?;
                Ok::<bool, Error>(!liquidity.is_zero())
            }
        });
        let staked = try_join_all(reads).await?;

        let indices: Vec<usize> = staked
            .into_iter()
            .enumerate()
            .filter_map(|(index, is_staked)| is_staked.then_some(index))
            .collect();
        debug!(token_id, ?indices, "resolved current stakes");
        Ok(indices)
    }

    // ── Rewards ──────────────────────────────────────────────────────────────

    /// Pending (accrued-but-unclaimed) rewards for one position, summed over
    /// every incentive it is currently staked in.
    ///
    /// Programs overlap, so a position can accrue under several incentives
    /// at once; all of them count. Zero when not staked anywhere — a failed
    /// lookup is an error, never a zero.
    pub async fn pending_rewards_for_position(
        &self,
        token_id: TokenId,
        family: &FarmFamily,
    ) -> Result<Amount> {
        let indices = self.current_stake_indices(token_id, family).await?;

        let reads = indices.into_iter().map(|index| async move {
            let out = self
                .chain
                .call(
                    self.contracts.staker,
                    FN_GET_REWARD_INFO,
                    &[
                        family.incentives()[index].key_value(),
                        AbiValue::Uint(BigUint::from(token_id)),
                    ],
                )
                .await?;
            // getRewardInfo() = (reward, secondsInsideX128)
            Ok::<Amount, Error>(abi::uint_component(&out, 0, FN_GET_REWARD_INFO)?.clone())
        });
        let amounts = try_join_all(reads).await?;
        Ok(amounts.into_iter().sum())
    }

    /// Pending rewards summed across every position `owner` has deposited
    /// into this family.
    ///
    /// Per-position lookups run concurrently; if any branch fails the whole
    /// call fails — a partial total would silently undercount.
    pub async fn pending_rewards_for_user(
        &self,
        owner: Address,
        family: &FarmFamily,
    ) -> Result<Amount> {
        let ids = self.deposited_positions(owner, family).await?;

        let sums = ids.into_iter().map(|token_id| {
            let pending = self.pending_rewards_for_position(token_id, family);
            async move {
                pending.await.map_err(|e| Error::Aggregation {
                    token_id,
                    source: Box::new(e),
                })
            }
        });
        let amounts = try_join_all(sums).await?;
        let total: Amount = amounts.into_iter().sum();
        debug!(%owner, %total, "aggregated pending rewards");
        Ok(total)
    }

    /// Finalized, claim-ready rewards from the staker's global per-account
    /// ledger — independent of per-incentive accrual.
    pub async fn accrued_rewards(&self, owner: Address, reward_token: Address) -> Result<Amount> {
        let out = self
            .chain
            .call(
                self.contracts.staker,
                FN_REWARDS,
                &[AbiValue::Address(reward_token), AbiValue::Address(owner)],
            )
            .await?;
        Ok(abi::uint_component(&out, 0, FN_REWARDS)?.clone())
    }

    // ── Transaction builders ─────────────────────────────────────────────────

    /// Compose the deposit-and-stake transfer: custody of the position moves
    /// to the staker, which reads the attached incentive key as an implicit
    /// stake instruction. Always targets the family's most recent incentive.
    ///
    /// Pure over configuration — no chain reads.
    pub fn build_deposit_and_stake(
        &self,
        token_id: TokenId,
        family: &FarmFamily,
        user: Address,
    ) -> Result<TransactionRequest> {
        let key = family.most_recent().encode_key()?;
        Ok(TransactionRequest {
            from: user,
            to: self.contracts.position_manager,
            function: FN_SAFE_TRANSFER_FROM.to_string(),
            args: vec![
                AbiValue::Address(user),
                AbiValue::Address(self.contracts.staker),
                AbiValue::Uint(BigUint::from(token_id)),
                AbiValue::Bytes(key),
            ],
        })
    }

    /// Compose the full exit: one `unstakeToken` per currently-staked
    /// incentive (ascending family order), then exactly one `withdrawToken`,
    /// batched into a single atomic `multicall`.
    ///
    /// The withdraw must come last — it is only valid once every stake has
    /// been released. The staking contract enforces that and reverts the
    /// whole batch otherwise, leaving custody unchanged.
    pub async fn build_withdraw(
        &self,
        token_id: TokenId,
        family: &FarmFamily,
        user: Address,
    ) -> Result<TransactionRequest> {
        let indices = self.current_stake_indices(token_id, family).await?;

        let mut calls = Vec::with_capacity(indices.len() + 1);
        for index in indices {
            calls.push(abi::encode_call(
                FN_UNSTAKE_TOKEN,
                &[
                    family.incentives()[index].key_value(),
                    AbiValue::Uint(BigUint::from(token_id)),
                ],
            )?);
        }
        calls.push(abi::encode_call(
            FN_WITHDRAW_TOKEN,
            &[
                AbiValue::Uint(BigUint::from(token_id)),
                AbiValue::Address(user),
                AbiValue::Bytes(Vec::new()),
            ],
        )?);

        Ok(TransactionRequest {
            from: user,
            to: self.contracts.staker,
            function: FN_MULTICALL.to_string(),
            args: vec![AbiValue::BytesArray(calls)],
        })
    }

    /// Compose the claim of the full global accrued balance for one reward
    /// token (amount 0 means "everything" to the staking contract). Leaves
    /// per-incentive stake records untouched.
    pub fn build_claim(&self, user: Address, reward_token: Address) -> Result<TransactionRequest> {
        Ok(TransactionRequest {
            from: user,
            to: self.contracts.staker,
            function: FN_CLAIM_REWARD.to_string(),
            args: vec![
                AbiValue::Address(reward_token),
                AbiValue::Address(user),
                AbiValue::Uint(BigUint::zero()),
            ],
        })
    }

    // ── Submission ───────────────────────────────────────────────────────────

    /// Forward a composed transaction through the chain capability.
    /// Signing and receipt-waiting remain the capability's concern.
    pub async fn submit(&self, tx: &TransactionRequest) -> Result<TxHash> {
        self.chain.send(tx).await
    }
}
