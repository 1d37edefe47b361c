//! Classic single-token StakingRewards client.
//!
//! Covers the Synthetix-style staking contracts that predate the
//! incentive-key staker: stake a fungible LP token, accrue one reward
//! stream, claim or exit. One client per deployed contract address.

use crate::abi::{self, AbiValue};
use crate::chain::{ChainQuery, TransactionRequest};
use crate::error::{Error, Result};
use crate::types::{Address, Amount};

const FN_STAKE: &str = "stake(uint256)";
const FN_WITHDRAW: &str = "withdraw(uint256)";
const FN_GET_REWARD: &str = "getReward()";
const FN_EXIT: &str = "exit()";
const FN_EARNED: &str = "earned(address)";
const FN_TOTAL_SUPPLY: &str = "totalSupply()";

/// Client for one StakingRewards deployment.
pub struct StakingRewardsClient<C: ChainQuery> {
    chain: C,
    contract: Address,
}

impl<C: ChainQuery> StakingRewardsClient<C> {
    pub fn new(chain: C, contract: Address) -> Result<Self> {
        if contract.is_zero() {
            return Err(Error::MissingConfig("staking rewards address"));
        }
        Ok(StakingRewardsClient { chain, contract })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Reward accrued by `account` and not yet claimed.
    ///
    /// A failed read is an error, never zero — the caller must be able to
    /// tell "nothing earned" from "could not look it up".
    pub async fn earned(&self, account: Address) -> Result<Amount> {
        let out = self
            .chain
            .call(self.contract, FN_EARNED, &[AbiValue::Address(account)])
            .await?;
        Ok(abi::uint_component(&out, 0, FN_EARNED)?.clone())
    }

    /// Total LP tokens staked in the contract.
    pub async fn total_staked(&self) -> Result<Amount> {
        let out = self.chain.call(self.contract, FN_TOTAL_SUPPLY, &[]).await?;
        Ok(abi::uint_component(&out, 0, FN_TOTAL_SUPPLY)?.clone())
    }

    // ── Transaction builders ─────────────────────────────────────────────────

    pub fn build_stake(&self, account: Address, amount: Amount) -> TransactionRequest {
        self.request(account, FN_STAKE, vec![AbiValue::Uint(amount)])
    }

    pub fn build_unstake(&self, account: Address, amount: Amount) -> TransactionRequest {
        self.request(account, FN_WITHDRAW, vec![AbiValue::Uint(amount)])
    }

    pub fn build_claim(&self, account: Address) -> TransactionRequest {
        self.request(account, FN_GET_REWARD, Vec::new())
    }

    /// Unstake everything and claim in one call.
    pub fn build_exit(&self, account: Address) -> TransactionRequest {
        self.request(account, FN_EXIT, Vec::new())
    }

    fn request(&self, from: Address, function: &str, args: Vec<AbiValue>) -> TransactionRequest {
        TransactionRequest {
            from,
            to: self.contract,
            function: function.to_string(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::selector;

    struct NoChain;

    #[async_trait::async_trait]
    impl ChainQuery for NoChain {
        async fn call(
            &self,
            _contract: Address,
            _function: &str,
            _args: &[AbiValue],
        ) -> Result<Vec<AbiValue>> {
            unreachable!("builders make no chain calls")
        }

        async fn send(&self, _tx: &TransactionRequest) -> Result<crate::types::TxHash> {
            unreachable!("builders make no chain calls")
        }

        async fn past_events(
            &self,
            _contract: Address,
            _event: &str,
            _range: crate::chain::BlockRange,
            _filter: &crate::chain::EventFilter,
        ) -> Result<Vec<crate::chain::Event>> {
            unreachable!("builders make no chain calls")
        }
    }

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::new(bytes)
    }

    #[test]
    fn zero_contract_address_is_rejected() {
        assert!(matches!(
            StakingRewardsClient::new(NoChain, Address::ZERO),
            Err(Error::MissingConfig(_))
        ));
    }

    #[test]
    fn builders_target_the_contract() {
        let client = StakingRewardsClient::new(NoChain, addr(9)).unwrap();
        let user = addr(1);

        let stake = client.build_stake(user, Amount::from(500u32));
        assert_eq!(stake.to, addr(9));
        assert_eq!(stake.from, user);
        assert_eq!(&stake.calldata().unwrap()[..4], &selector(FN_STAKE));

        let exit = client.build_exit(user);
        assert_eq!(exit.calldata().unwrap(), selector(FN_EXIT).to_vec());
    }
}
