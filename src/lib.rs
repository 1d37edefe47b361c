//! v3-farm-sdk
//!
//! Client-side tracker for liquidity-provider positions across multiple,
//! possibly overlapping, on-chain staking incentive programs ("farms").
//! Resolves which positions a user holds or has deposited, which programs
//! each one is currently staked in, aggregates pending rewards across all of
//! them, and composes the minimal atomic transactions to enter, exit, or
//! claim — without ever submitting anything itself.
//!
//! All chain access flows through the [`ChainQuery`] capability, implemented
//! by whatever RPC client the surrounding application already uses. The SDK
//! holds no provider, wallet, or session state, and caches nothing: the
//! chain is the sole source of truth, and stale stake data would silently
//! corrupt reward sums.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use v3_farm_sdk::{ChainQuery, Contracts, FarmClient, FarmFamily};
//! use v3_farm_sdk::types::Address;
//!
//! async fn report<C: ChainQuery>(
//!     chain: C,
//!     family: &FarmFamily,
//!     user: Address,
//! ) -> Result<(), v3_farm_sdk::Error> {
//!     let client = FarmClient::new(chain, Contracts::mainnet())?;
//!
//!     let pending = client.pending_rewards_for_user(user, family).await?;
//!     println!("pending across all farms: {pending}");
//!
//!     for token_id in client.deposited_positions(user, family).await? {
//!         let exit = client.build_withdraw(token_id, family, user).await?;
//!         println!("exit calldata for #{token_id}: {} bytes", exit.calldata()?.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Feature Overview
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`FarmClient::owned_positions`] | Enumerate position tokens held by an account |
//! | [`FarmClient::deposited_positions`] | Positions historically moved into the staker, deduplicated and filtered |
//! | [`FarmClient::is_eligible`] | Does a position's pool triple match a farm family |
//! | [`FarmClient::current_stake_indices`] | Which incentives a position is staked in right now |
//! | [`FarmClient::pending_rewards_for_position`] | Pending rewards summed across overlapping programs |
//! | [`FarmClient::pending_rewards_for_user`] | Pending rewards across every deposited position |
//! | [`FarmClient::accrued_rewards`] | Finalized claim-ready balance from the global ledger |
//! | [`FarmClient::build_deposit_and_stake`] | Transfer-with-data targeting the most recent incentive |
//! | [`FarmClient::build_withdraw`] | Unstake-everything-then-withdraw as one atomic multicall |
//! | [`FarmClient::build_claim`] | Claim the global accrued balance for one reward token |
//! | [`StakingRewardsClient`] | Legacy single-token StakingRewards contracts |

pub mod abi;
pub mod chain;
pub mod client;
pub mod error;
pub mod registry;
pub mod staking;
pub mod types;

pub use chain::{BlockRange, ChainQuery, Event, EventFilter, TransactionRequest};
pub use client::FarmClient;
pub use error::{Error, Result};
pub use registry::{Contracts, FarmFamily, FarmStatus, Incentive};
pub use staking::StakingRewardsClient;
pub use types::{Address, Amount, IncentiveId, TokenId, TxHash};
