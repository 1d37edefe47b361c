//! End-to-end flows over an in-memory chain: position resolution, stake
//! tracking across overlapping programs, reward aggregation, and the
//! composed enter/exit/claim transactions.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

use v3_farm_sdk::abi::{self, AbiValue};
use v3_farm_sdk::chain::{BlockRange, ChainQuery, Event, EventFilter, TransactionRequest};
use v3_farm_sdk::types::{Address, TokenId, TxHash};
use v3_farm_sdk::{Contracts, Error, FarmClient, FarmFamily, Incentive, Result, StakingRewardsClient};

// ─── Fixture addresses ────────────────────────────────────────────────────────

fn addr(last: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    Address::new(bytes)
}

fn contracts() -> Contracts {
    Contracts::new(addr(0x10), addr(0x11), addr(0x12))
}

const POOL: u8 = 0x20;
const OTHER_POOL: u8 = 0x21;
const REWARD_TOKEN: u8 = 0x30;
const REFUNDEE: u8 = 0x31;
const USER: u8 = 0x40;

fn incentive(start: u64, end: u64) -> Incentive {
    Incentive {
        reward_token: addr(REWARD_TOKEN),
        pool: addr(POOL),
        start_time: start,
        end_time: end,
        refundee: addr(REFUNDEE),
    }
}

fn family(windows: &[(u64, u64)]) -> FarmFamily {
    let incentives = windows.iter().map(|&(s, e)| incentive(s, e)).collect();
    FarmFamily::new("dpi-eth", addr(POOL), incentives).unwrap()
}

// ─── Mock chain ───────────────────────────────────────────────────────────────

/// In-memory rendering of the position manager, factory, and staker.
#[derive(Default)]
struct MockChain {
    /// owner → tokens, in enumeration order
    owned: HashMap<Address, Vec<TokenId>>,
    /// token → (token0, token1, fee)
    positions: HashMap<TokenId, (Address, Address, u32)>,
    /// (token0, token1, fee) → pool
    pools: HashMap<(Address, Address, u32), Address>,
    /// token → (tick_lower, tick_upper)
    deposits: HashMap<TokenId, (i64, i64)>,
    /// (token, incentive id) → staked liquidity
    stakes: HashMap<(TokenId, [u8; 32]), u128>,
    /// (token, incentive id) → pending reward
    reward_info: HashMap<(TokenId, [u8; 32]), u128>,
    /// (reward token, owner) → finalized accrual
    ledger: HashMap<(Address, Address), u128>,
    /// StakingRewards: account → earned
    earned: HashMap<Address, u128>,
    total_staked: u128,
    /// position-manager Transfer history, oldest first
    transfers: Vec<(Address, Address, TokenId)>,
    /// tokens whose getRewardInfo read fails (simulated node trouble)
    broken_reward_reads: HashSet<TokenId>,
    sent: Mutex<Vec<TransactionRequest>>,
}

impl MockChain {
    /// A position in the family pool, deposited into the staker with open ticks.
    fn add_deposited_position(&mut self, token_id: TokenId, user: Address, staker: Address) {
        self.positions
            .insert(token_id, (addr(1), addr(2), 3000));
        self.pools.insert((addr(1), addr(2), 3000), addr(POOL));
        self.deposits.insert(token_id, (-60, 60));
        self.transfers.push((user, staker, token_id));
    }

    fn stake(&mut self, token_id: TokenId, incentive: &Incentive, liquidity: u128, reward: u128) {
        let id = incentive.id().unwrap().to_word();
        self.stakes.insert((token_id, id), liquidity);
        self.reward_info.insert((token_id, id), reward);
    }

    fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }
}

fn uint_arg(args: &[AbiValue], index: usize) -> u64 {
    args[index].as_uint().unwrap().to_u64().unwrap()
}

fn addr_arg(args: &[AbiValue], index: usize) -> Address {
    args[index].as_address().unwrap()
}

/// The staker derives incentive ids from the key tuple exactly like we do.
fn id_of_key_arg(args: &[AbiValue]) -> [u8; 32] {
    abi::keccak256(&abi::encode(&[args[0].clone()]).unwrap())
}

#[async_trait]
impl ChainQuery for MockChain {
    async fn call(
        &self,
        _contract: Address,
        function: &str,
        args: &[AbiValue],
    ) -> Result<Vec<AbiValue>> {
        let name = function.split('(').next().unwrap_or(function);
        match name {
            "balanceOf" => {
                let count = self.owned.get(&addr_arg(args, 0)).map_or(0, Vec::len);
                Ok(vec![AbiValue::Uint(BigUint::from(count))])
            }
            "tokenOfOwnerByIndex" => {
                let owner = addr_arg(args, 0);
                let index = uint_arg(args, 1) as usize;
                let token = self.owned.get(&owner).and_then(|v| v.get(index)).ok_or_else(
                    || Error::UnexpectedResponse {
                        function: function.to_string(),
                        reason: "index out of range".into(),
                    },
                )?;
                Ok(vec![AbiValue::Uint(BigUint::from(*token))])
            }
            "positions" => {
                let (token0, token1, fee) = self
                    .positions
                    .get(&uint_arg(args, 0))
                    .copied()
                    .unwrap_or((Address::ZERO, Address::ZERO, 0));
                Ok(vec![
                    AbiValue::Uint(BigUint::from(0u8)), // nonce
                    AbiValue::Address(Address::ZERO),   // operator
                    AbiValue::Address(token0),
                    AbiValue::Address(token1),
                    AbiValue::Uint(BigUint::from(fee)),
                ])
            }
            "getPool" => {
                let key = (
                    addr_arg(args, 0),
                    addr_arg(args, 1),
                    uint_arg(args, 2) as u32,
                );
                let pool = self.pools.get(&key).copied().unwrap_or(Address::ZERO);
                Ok(vec![AbiValue::Address(pool)])
            }
            "deposits" => {
                let (lower, upper) = self
                    .deposits
                    .get(&uint_arg(args, 0))
                    .copied()
                    .unwrap_or((0, 0));
                Ok(vec![
                    AbiValue::Address(Address::ZERO), // owner
                    AbiValue::Uint(BigUint::from(0u8)), // numberOfStakes
                    AbiValue::Int(lower),
                    AbiValue::Int(upper),
                ])
            }
            "stakes" => {
                let token_id = uint_arg(args, 0);
                let id = match &args[1] {
                    AbiValue::Word(word) => *word,
                    other => panic!("stakes expects bytes32, got {other:?}"),
                };
                let liquidity = self.stakes.get(&(token_id, id)).copied().unwrap_or(0);
                Ok(vec![
                    AbiValue::Uint(BigUint::from(0u8)),
                    AbiValue::Uint(BigUint::from(liquidity)),
                ])
            }
            "getRewardInfo" => {
                let token_id = uint_arg(args, 1);
                if self.broken_reward_reads.contains(&token_id) {
                    return Err(Error::chain(std::io::Error::other("node unavailable")));
                }
                let id = id_of_key_arg(args);
                let reward = self.reward_info.get(&(token_id, id)).copied().unwrap_or(0);
                Ok(vec![
                    AbiValue::Uint(BigUint::from(reward)),
                    AbiValue::Uint(BigUint::from(0u8)),
                ])
            }
            "rewards" => {
                let key = (addr_arg(args, 0), addr_arg(args, 1));
                let amount = self.ledger.get(&key).copied().unwrap_or(0);
                Ok(vec![AbiValue::Uint(BigUint::from(amount))])
            }
            "earned" => {
                let amount = self.earned.get(&addr_arg(args, 0)).copied().unwrap_or(0);
                Ok(vec![AbiValue::Uint(BigUint::from(amount))])
            }
            "totalSupply" => Ok(vec![AbiValue::Uint(BigUint::from(self.total_staked))]),
            other => Err(Error::UnexpectedResponse {
                function: other.to_string(),
                reason: "mock does not implement this function".into(),
            }),
        }
    }

    async fn send(&self, tx: &TransactionRequest) -> Result<TxHash> {
        let hash = abi::keccak256(&tx.calldata()?);
        self.sent.lock().unwrap().push(tx.clone());
        Ok(TxHash::new(hash))
    }

    async fn past_events(
        &self,
        _contract: Address,
        _event: &str,
        _range: BlockRange,
        filter: &EventFilter,
    ) -> Result<Vec<Event>> {
        Ok(self
            .transfers
            .iter()
            .enumerate()
            .map(|(block, (from, to, token_id))| {
                Event::new(
                    block as u64,
                    vec![
                        ("from".into(), AbiValue::Address(*from)),
                        ("to".into(), AbiValue::Address(*to)),
                        ("tokenId".into(), AbiValue::Uint(BigUint::from(*token_id))),
                    ],
                )
            })
            .filter(|event| filter.matches(event))
            .collect())
    }
}

fn client(mock: MockChain) -> FarmClient<MockChain> {
    FarmClient::new(mock, contracts()).unwrap()
}

// ─── Position resolution ──────────────────────────────────────────────────────

#[tokio::test]
async fn owned_positions_enumerate_by_index() {
    let mut mock = MockChain::default();
    mock.owned.insert(addr(USER), vec![7, 9]);
    let client = client(mock);

    let ids = client.owned_positions(addr(USER)).await.unwrap();
    assert_eq!(ids, vec![7, 9]);
}

#[tokio::test]
async fn eligibility_is_stable_and_pool_scoped() {
    let family = family(&[(100, 200)]);
    let mut mock = MockChain::default();
    mock.add_deposited_position(7, addr(USER), contracts().staker);
    // a position from an unrelated pool
    mock.positions.insert(8, (addr(4), addr(5), 500));
    mock.pools.insert((addr(4), addr(5), 500), addr(OTHER_POOL));
    let client = client(mock);

    assert!(client.is_eligible(7, &family).await.unwrap());
    assert!(client.is_eligible(7, &family).await.unwrap());
    assert!(!client.is_eligible(8, &family).await.unwrap());
}

#[tokio::test]
async fn deposit_history_is_deduplicated() {
    let family = family(&[(100, 200)]);
    let staker = contracts().staker;
    let mut mock = MockChain::default();
    mock.add_deposited_position(5, addr(USER), staker);
    // restaked after a partial withdraw: second transfer of the same token
    mock.transfers.push((addr(USER), staker, 5));
    let client = client(mock);

    let ids = client.deposited_positions(addr(USER), &family).await.unwrap();
    assert_eq!(ids, vec![5]);
}

#[tokio::test]
async fn deposit_listing_skips_closed_ticks_and_foreign_pools() {
    let family = family(&[(100, 200)]);
    let staker = contracts().staker;
    let mut mock = MockChain::default();
    mock.add_deposited_position(1, addr(USER), staker);

    // liquidity withdrawn: ticks collapsed
    mock.add_deposited_position(2, addr(USER), staker);
    mock.deposits.insert(2, (0, 0));

    // deposited, but LP of a different pool
    mock.positions.insert(3, (addr(4), addr(5), 500));
    mock.pools.insert((addr(4), addr(5), 500), addr(OTHER_POOL));
    mock.deposits.insert(3, (-10, 10));
    mock.transfers.push((addr(USER), staker, 3));

    let client = client(mock);
    let ids = client.deposited_positions(addr(USER), &family).await.unwrap();
    assert_eq!(ids, vec![1]);
}

// ─── Stake state & rewards ────────────────────────────────────────────────────

#[tokio::test]
async fn overlapping_stakes_are_all_reported_and_summed() {
    let family = family(&[(100, 200), (150, 250), (200, 300), (250, 350)]);
    let mut mock = MockChain::default();
    mock.add_deposited_position(7, addr(USER), contracts().staker);
    mock.stake(7, &family.incentives()[1], 500, 50);
    mock.stake(7, &family.incentives()[3], 500, 70);
    let client = client(mock);

    let indices = client.current_stake_indices(7, &family).await.unwrap();
    assert_eq!(indices, vec![1, 3]);

    let pending = client.pending_rewards_for_position(7, &family).await.unwrap();
    assert_eq!(pending, BigUint::from(120u32));
}

#[tokio::test]
async fn unstaked_position_has_zero_pending_rewards() {
    let family = family(&[(100, 200), (200, 300)]);
    let mut mock = MockChain::default();
    mock.add_deposited_position(7, addr(USER), contracts().staker);
    let client = client(mock);

    assert!(client.current_stake_indices(7, &family).await.unwrap().is_empty());
    let pending = client.pending_rewards_for_position(7, &family).await.unwrap();
    assert_eq!(pending, BigUint::from(0u8));
}

#[tokio::test]
async fn consecutive_programs_track_only_the_staked_one() {
    // family = [A(100,200), B(200,300)], position staked only under B
    let family = family(&[(100, 200), (200, 300)]);
    let mut mock = MockChain::default();
    mock.add_deposited_position(7, addr(USER), contracts().staker);
    mock.stake(7, &family.incentives()[1], 5, 42);
    let client = client(mock);

    assert_eq!(client.current_stake_indices(7, &family).await.unwrap(), vec![1]);
    let pending = client.pending_rewards_for_position(7, &family).await.unwrap();
    assert_eq!(pending, BigUint::from(42u8));
}

#[tokio::test]
async fn user_rewards_sum_over_all_deposited_positions() {
    let family = family(&[(100, 200), (200, 300)]);
    let staker = contracts().staker;
    let mut mock = MockChain::default();
    for token_id in [1, 2, 3] {
        mock.add_deposited_position(token_id, addr(USER), staker);
    }
    mock.stake(1, &family.incentives()[0], 10, 100);
    mock.stake(2, &family.incentives()[1], 10, 7);
    mock.stake(3, &family.incentives()[0], 10, 1);
    mock.stake(3, &family.incentives()[1], 10, 2);
    let client = client(mock);

    let total = client.pending_rewards_for_user(addr(USER), &family).await.unwrap();
    assert_eq!(total, BigUint::from(110u32));
}

#[tokio::test]
async fn one_failed_branch_fails_the_whole_aggregate() {
    let family = family(&[(100, 200)]);
    let staker = contracts().staker;
    let mut mock = MockChain::default();
    for token_id in [1, 2, 3] {
        mock.add_deposited_position(token_id, addr(USER), staker);
        mock.stake(token_id, &family.incentives()[0], 10, 5);
    }
    mock.broken_reward_reads.insert(2);
    let client = client(mock);

    let err = client.pending_rewards_for_user(addr(USER), &family).await.unwrap_err();
    match err {
        Error::Aggregation { token_id, .. } => assert_eq!(token_id, 2),
        other => panic!("expected Aggregation error, got {other}"),
    }
}

#[tokio::test]
async fn accrued_rewards_read_the_global_ledger() {
    let mut mock = MockChain::default();
    mock.ledger.insert((addr(REWARD_TOKEN), addr(USER)), 9999);
    let client = client(mock);

    let accrued = client.accrued_rewards(addr(USER), addr(REWARD_TOKEN)).await.unwrap();
    assert_eq!(accrued, BigUint::from(9999u32));
}

// ─── Transaction composition ──────────────────────────────────────────────────

#[tokio::test]
async fn deposit_targets_the_most_recent_incentive() {
    let family = family(&[(100, 200), (200, 300), (300, 400)]);
    let client = client(MockChain::default());

    let tx = client.build_deposit_and_stake(7, &family, addr(USER)).unwrap();
    assert_eq!(tx.from, addr(USER));
    assert_eq!(tx.to, contracts().position_manager);
    assert_eq!(tx.args[0], AbiValue::Address(addr(USER)));
    assert_eq!(tx.args[1], AbiValue::Address(contracts().staker));
    assert_eq!(tx.args[2], AbiValue::Uint(BigUint::from(7u8)));

    let expected_key = family.most_recent().encode_key().unwrap();
    assert_eq!(tx.args[3], AbiValue::Bytes(expected_key));

    let calldata = tx.calldata().unwrap();
    assert_eq!(
        &calldata[..4],
        &abi::selector("safeTransferFrom(address,address,uint256,bytes)")
    );
}

#[tokio::test]
async fn withdraw_unstakes_everything_then_withdraws_once() {
    let family = family(&[(100, 200), (200, 300), (300, 400)]);
    let mut mock = MockChain::default();
    mock.add_deposited_position(7, addr(USER), contracts().staker);
    mock.stake(7, &family.incentives()[0], 10, 1);
    mock.stake(7, &family.incentives()[2], 10, 1);
    let client = client(mock);

    let tx = client.build_withdraw(7, &family, addr(USER)).await.unwrap();
    assert_eq!(tx.to, contracts().staker);
    assert_eq!(tx.function, "multicall(bytes[])");

    let calls = match &tx.args[0] {
        AbiValue::BytesArray(calls) => calls,
        other => panic!("expected bytes[] argument, got {other:?}"),
    };
    assert_eq!(calls.len(), 3);

    let unstake_sig = "unstakeToken((address,address,uint256,uint256,address),uint256)";
    let expected_first = abi::encode_call(
        unstake_sig,
        &[
            family.incentives()[0].key_value(),
            AbiValue::Uint(BigUint::from(7u8)),
        ],
    )
    .unwrap();
    let expected_second = abi::encode_call(
        unstake_sig,
        &[
            family.incentives()[2].key_value(),
            AbiValue::Uint(BigUint::from(7u8)),
        ],
    )
    .unwrap();
    let expected_last = abi::encode_call(
        "withdrawToken(uint256,address,bytes)",
        &[
            AbiValue::Uint(BigUint::from(7u8)),
            AbiValue::Address(addr(USER)),
            AbiValue::Bytes(Vec::new()),
        ],
    )
    .unwrap();
    assert_eq!(calls[0], expected_first);
    assert_eq!(calls[1], expected_second);
    assert_eq!(calls[2], expected_last);
}

#[tokio::test]
async fn claim_and_submit_round_trip() {
    let client = client(MockChain::default());

    let tx = client.build_claim(addr(USER), addr(REWARD_TOKEN)).unwrap();
    assert_eq!(tx.function, "claimReward(address,address,uint256)");
    // amount 0 = claim the full accrued balance
    assert_eq!(tx.args[2], AbiValue::Uint(BigUint::from(0u8)));

    let hash = client.submit(&tx).await.unwrap();
    let sent = client.chain().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], tx);
    assert_eq!(hash.as_bytes(), &abi::keccak256(&tx.calldata().unwrap()));
}

// ─── Legacy StakingRewards ────────────────────────────────────────────────────

#[tokio::test]
async fn staking_rewards_reads_and_builders() {
    let mut mock = MockChain::default();
    mock.earned.insert(addr(USER), 314);
    mock.total_staked = 100_000;
    let contract = addr(0x50);
    let staking = StakingRewardsClient::new(mock, contract).unwrap();

    assert_eq!(staking.earned(addr(USER)).await.unwrap(), BigUint::from(314u32));
    assert_eq!(staking.total_staked().await.unwrap(), BigUint::from(100_000u32));

    let stake = staking.build_stake(addr(USER), BigUint::from(500u32));
    assert_eq!(stake.to, contract);
    assert_eq!(&stake.calldata().unwrap()[..4], &abi::selector("stake(uint256)"));
}
