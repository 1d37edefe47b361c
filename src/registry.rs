//! Static farm configuration: incentive records, farm families, and the
//! contract address table.
//!
//! Everything here is immutable after load. Families validate their shape at
//! construction so positional rules (deposits always target the most recent
//! incentive) never trust unchecked configuration at call time.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::abi::{self, AbiValue};
use crate::error::{Error, Result};
use crate::types::{Address, IncentiveId};

// ─── Incentive ────────────────────────────────────────────────────────────────

/// One time-bounded incentive program.
///
/// The five fields are exactly the on-chain incentive key; the program's
/// identity is recomputable from them alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incentive {
    pub reward_token: Address,
    pub pool: Address,
    /// Program start, unix seconds.
    pub start_time: u64,
    /// Program end, unix seconds.
    pub end_time: u64,
    /// Recipient of unclaimed rewards after the program ends.
    pub refundee: Address,
}

/// Where an incentive sits relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmStatus {
    Upcoming,
    Active,
    Expired,
}

impl Incentive {
    /// Reject records the staking contract would never have accepted.
    pub fn validate(&self) -> Result<()> {
        if self.reward_token.is_zero() {
            return Err(Error::InvalidIncentive("reward token address is zero".into()));
        }
        if self.pool.is_zero() {
            return Err(Error::InvalidIncentive("pool address is zero".into()));
        }
        if self.refundee.is_zero() {
            return Err(Error::InvalidIncentive("refundee address is zero".into()));
        }
        if self.end_time <= self.start_time {
            return Err(Error::InvalidIncentive(format!(
                "end time {} is not after start time {}",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }

    /// The incentive key as a call argument:
    /// `(rewardToken, pool, startTime, endTime, refundee)`.
    pub fn key_value(&self) -> AbiValue {
        AbiValue::Tuple(vec![
            AbiValue::Address(self.reward_token),
            AbiValue::Address(self.pool),
            AbiValue::Uint(BigUint::from(self.start_time)),
            AbiValue::Uint(BigUint::from(self.end_time)),
            AbiValue::Address(self.refundee),
        ])
    }

    /// ABI-encode the incentive key, byte-exact against the staking contract.
    pub fn encode_key(&self) -> Result<Vec<u8>> {
        self.validate()?;
        abi::encode(&[self.key_value()])
    }

    /// Derive the incentive's identity: keccak-256 of the encoded key.
    ///
    /// Identical field tuples always produce identical identities; the
    /// staking contract indexes stake records by the same digest.
    pub fn id(&self) -> Result<IncentiveId> {
        Ok(IncentiveId::new(abi::keccak256(&self.encode_key()?)))
    }

    pub fn status(&self, now: u64) -> FarmStatus {
        if now < self.start_time {
            FarmStatus::Upcoming
        } else if now < self.end_time {
            FarmStatus::Active
        } else {
            FarmStatus::Expired
        }
    }
}

// ─── Farm family ──────────────────────────────────────────────────────────────

/// The ordered set of all incentive programs ever created for one pool,
/// chronological by program start. New deposits only ever target the most
/// recent entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawFarmFamily")]
pub struct FarmFamily {
    name: String,
    pool: Address,
    incentives: Vec<Incentive>,
}

#[derive(Deserialize)]
struct RawFarmFamily {
    name: String,
    pool: Address,
    incentives: Vec<Incentive>,
}

impl TryFrom<RawFarmFamily> for FarmFamily {
    type Error = Error;

    fn try_from(raw: RawFarmFamily) -> Result<Self> {
        FarmFamily::new(raw.name, raw.pool, raw.incentives)
    }
}

impl FarmFamily {
    /// Build a validated family. Fails if the pool address is unset, the
    /// incentive list is empty or out of chronological order, or any
    /// incentive is malformed or tied to a different pool.
    pub fn new(
        name: impl Into<String>,
        pool: Address,
        incentives: Vec<Incentive>,
    ) -> Result<Self> {
        let name = name.into();
        if pool.is_zero() {
            return Err(Error::MissingConfig("farm family pool address"));
        }
        if incentives.is_empty() {
            return Err(Error::InvalidFarmFamily {
                family: name,
                reason: "incentive list is empty".into(),
            });
        }
        for (index, incentive) in incentives.iter().enumerate() {
            incentive.validate().map_err(|e| Error::InvalidFarmFamily {
                family: name.clone(),
                reason: format!("incentive {index}: {e}"),
            })?;
            if incentive.pool != pool {
                return Err(Error::InvalidFarmFamily {
                    family: name,
                    reason: format!(
                        "incentive {index} targets pool {}, family governs {pool}",
                        incentive.pool
                    ),
                });
            }
        }
        if incentives.windows(2).any(|w| w[0].start_time > w[1].start_time) {
            return Err(Error::InvalidFarmFamily {
                family: name,
                reason: "incentives are not in chronological order".into(),
            });
        }
        Ok(FarmFamily { name, pool, incentives })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> Address {
        self.pool
    }

    pub fn incentives(&self) -> &[Incentive] {
        &self.incentives
    }

    pub fn len(&self) -> usize {
        self.incentives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incentives.is_empty()
    }

    /// The only incentive eligible for new deposits.
    pub fn most_recent(&self) -> &Incentive {
        // non-empty is enforced by the constructor
        &self.incentives[self.incentives.len() - 1]
    }

    /// Incentives whose program window contains `now`.
    pub fn active(&self, now: u64) -> Vec<(usize, &Incentive)> {
        self.with_status(now, FarmStatus::Active)
    }

    /// Incentives that have not started yet.
    pub fn upcoming(&self, now: u64) -> Vec<(usize, &Incentive)> {
        self.with_status(now, FarmStatus::Upcoming)
    }

    /// Incentives whose program window has closed.
    pub fn expired(&self, now: u64) -> Vec<(usize, &Incentive)> {
        self.with_status(now, FarmStatus::Expired)
    }

    fn with_status(&self, now: u64, status: FarmStatus) -> Vec<(usize, &Incentive)> {
        self.incentives
            .iter()
            .enumerate()
            .filter(|(_, incentive)| incentive.status(now) == status)
            .collect()
    }
}

// ─── Contract addresses ───────────────────────────────────────────────────────

/// The static contract address table supplied at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contracts {
    /// Position-token (NFT) manager.
    pub position_manager: Address,
    /// Pool factory, for canonical pool lookups.
    pub factory: Address,
    /// Staking contract holding deposits, stakes, and reward ledgers.
    pub staker: Address,
}

impl Contracts {
    pub fn new(position_manager: Address, factory: Address, staker: Address) -> Self {
        Contracts { position_manager, factory, staker }
    }

    /// Canonical mainnet deployment.
    pub fn mainnet() -> Self {
        Contracts {
            position_manager: known("0xc36442b4a4522e871399cd717abdd847ab11fe88"),
            factory: known("0x1f98431c8ad98523631ae4a59f267346ea31f984"),
            staker: known("0x1f98407aab862cddef78ed252d6f557aa5b0f00d"),
        }
    }

    /// Fail fast on unset addresses, before any read or compose work begins.
    pub fn validate(&self) -> Result<()> {
        if self.position_manager.is_zero() {
            return Err(Error::MissingConfig("position manager address"));
        }
        if self.factory.is_zero() {
            return Err(Error::MissingConfig("factory address"));
        }
        if self.staker.is_zero() {
            return Err(Error::MissingConfig("staker address"));
        }
        Ok(())
    }
}

fn known(literal: &str) -> Address {
    // compile-time constants, parse cannot fail
    literal.parse().unwrap()
}
