//! Fixtures shared by the vault unit tests

use alloy::primitives::{address, Address, U256};

use super::Vault;
use crate::chain::{Chain, FungibleLedger};
use crate::config::VaultParams;
use crate::error::VaultResult;
use crate::venue::{DualAssetLp, LendingVenue, PositionVenue, SingleSidedLp};

pub(crate) const MANAGER: Address = address!("00000000000000000000000000000000000a11ce");
pub(crate) const ALICE: Address = address!("000000000000000000000000000000000000a11c");
pub(crate) const BOB: Address = address!("0000000000000000000000000000000000000b0b");
pub(crate) const KEEPER: Address = address!("000000000000000000000000000000000000cafe");

/// Starting balance of every token for each test account
pub(crate) const FUNDING: u64 = 1_000_000_000_000;

/// Depth of every seeded pool, per side
const POOL_DEPTH: u64 = 1_000_000_000_000;

/// Block timestamp the fixtures start at
pub(crate) const GENESIS: u64 = 1_700_000_000;

pub(crate) fn u(value: u64) -> U256 {
    U256::from(value)
}

pub(crate) struct Env<V: PositionVenue> {
    pub chain: Chain,
    pub vault: Vault<V>,
    /// Token single-asset depositors pay in
    pub asset: Address,
    /// Lending pool or pair behind the vault
    pub pool: Address,
    /// Pair tokens for LP venues
    pub venue_tokens: (Address, Address),
    pub reward_token: Address,
    pub controller: Address,
    /// reward -> compounding token
    pub reward_pair: Address,
    pub weth: Address,
    /// reward -> WETH
    pub reward_weth_pair: Address,
    /// WETH -> compounding token
    pub weth_pair: Address,
}

impl<V: PositionVenue> Env<V> {
    pub fn deposit(&mut self, who: Address, amount: u64) -> VaultResult<U256> {
        self.vault
            .deposit(&mut self.chain, who, who, u(amount), U256::ZERO)
    }

    /// Credit `amount` of rewards to the vault's position
    pub fn accrue_rewards(&mut self, amount: u64) {
        self.chain
            .accrue_rewards(
                self.controller,
                self.vault.venue().position_token(),
                self.vault.address(),
                u(amount),
            )
            .unwrap();
    }
}

struct Market {
    chain: Chain,
    reward_token: Address,
    controller: Address,
    weth: Address,
}

fn market() -> Market {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut chain = Chain::new(GENESIS);
    let reward_token = chain.deploy_token("REWARD", 18);
    let weth = chain.deploy_token("WETH", 18);
    let controller = chain.deploy_rewards_controller(reward_token).unwrap();
    Market {
        chain,
        reward_token,
        controller,
        weth,
    }
}

fn fund(chain: &mut Chain, token: Address, spender: Address) {
    for account in [ALICE, BOB] {
        chain.mint(token, account, u(FUNDING)).unwrap();
        chain.approve(token, account, spender, U256::MAX).unwrap();
    }
}

fn seeded_pair(chain: &mut Chain, a: Address, b: Address) -> Address {
    let pair = chain.deploy_pair(a, b).unwrap();
    chain.seed_pair(pair, u(POOL_DEPTH), u(POOL_DEPTH)).unwrap();
    pair
}

fn finish<V: PositionVenue>(
    market: Market,
    venue: V,
    params: VaultParams,
    asset: Address,
    pool: Address,
    venue_tokens: (Address, Address),
) -> Env<V> {
    let Market {
        mut chain,
        reward_token,
        controller,
        weth,
    } = market;

    let target = venue.compounding_token();
    let reward_pair = seeded_pair(&mut chain, reward_token, target);
    let reward_weth_pair = seeded_pair(&mut chain, reward_token, weth);
    let weth_pair = seeded_pair(&mut chain, weth, target);

    let vault = Vault::new(&mut chain, venue, params)
        .unwrap()
        .with_rewards_controller(controller);
    if venue_tokens.0 == asset {
        fund(&mut chain, asset, vault.address());
    } else {
        // LP vaults are funded with both pair tokens, never minted LP
        fund(&mut chain, venue_tokens.0, vault.address());
        fund(&mut chain, venue_tokens.1, vault.address());
    }

    Env {
        chain,
        vault,
        asset,
        pool,
        venue_tokens,
        reward_token,
        controller,
        reward_pair,
        weth,
        reward_weth_pair,
        weth_pair,
    }
}

/// USDC vault supplying an Aave-style reserve
pub(crate) fn lending_env(params: VaultParams) -> Env<LendingVenue> {
    let mut market = market();
    let usdc = market.chain.deploy_token("USDC", 6);
    let (pool, _) = market.chain.deploy_lending_pool(usdc, "aUSDC").unwrap();
    let venue = LendingVenue::new(&market.chain, pool).unwrap();
    finish(market, venue, params, usdc, pool, (usdc, usdc))
}

/// USDC vault holding USDC/DAI LP
pub(crate) fn single_lp_env(params: VaultParams) -> Env<SingleSidedLp> {
    let mut market = market();
    let usdc = market.chain.deploy_token("USDC", 18);
    let dai = market.chain.deploy_token("DAI", 18);
    let pair = seeded_pair(&mut market.chain, usdc, dai);
    let venue = SingleSidedLp::new(&market.chain, pair, usdc).unwrap();
    finish(market, venue, params, usdc, pair, (usdc, usdc))
}

/// DAI/USDC LP vault with a 1,000,000 / 1,000,000 pool
pub(crate) fn dual_lp_env(params: VaultParams) -> Env<DualAssetLp> {
    let mut market = market();
    let dai = market.chain.deploy_token("DAI", 18);
    let usdc = market.chain.deploy_token("USDC", 18);
    let pair = market.chain.deploy_pair(dai, usdc).unwrap();
    market
        .chain
        .seed_pair(pair, u(1_000_000), u(1_000_000))
        .unwrap();
    let venue = DualAssetLp::new(&market.chain, pair).unwrap();
    let tokens = (venue.token0, venue.token1);
    finish(market, venue, params, pair, pair, tokens)
}
