//! Vault simulation
//!
//! Run with: cargo run --example vault_sim
//!
//! Walks a lending vault through deposit, interest, harvest and a timelocked
//! exit on the in-memory chain. When RPC_URL (and optionally PAIRS) is set,
//! also prints live single-sided entry quotes for the configured pairs.

use alloy::primitives::{address, Address, U256};
use vault_engine::{
    Chain, FungibleLedger, LendingVenue, NetworkConfig, PairOracle, PositionVenue, SwapRoute,
    Vault, VaultParams,
};

const MANAGER: Address = address!("00000000000000000000000000000000000a11ce");
const ALICE: Address = address!("000000000000000000000000000000000000a11c");
const KEEPER: Address = address!("000000000000000000000000000000000000cafe");

const DAY: u64 = 86_400;
const USDC: u64 = 1_000_000;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    simulate()?;

    match NetworkConfig::from_env() {
        Ok(config) => live_quotes(config).await?,
        Err(_) => println!("\nRPC_URL not set, skipping live quotes"),
    }

    Ok(())
}

fn simulate() -> eyre::Result<()> {
    println!("\n========================================");
    println!("       Lending vault simulation");
    println!("========================================");

    let mut chain = Chain::new(1_700_000_000);
    let usdc = chain.deploy_token("USDC", 6);
    let reward = chain.deploy_token("REWARD", 18);
    let (pool, _) = chain.deploy_lending_pool(usdc, "aUSDC")?;
    let controller = chain.deploy_rewards_controller(reward)?;
    let reward_pair = chain.deploy_pair(reward, usdc)?;
    chain.seed_pair(
        reward_pair,
        U256::from(1_000_000 * USDC),
        U256::from(1_000_000 * USDC),
    )?;

    let params = VaultParams::new(MANAGER)
        .with_lock_period(7 * DAY)
        .with_min_tokens_to_harvest(U256::from(10 * USDC))
        .with_reinvest_reward_bps(50);
    let venue = LendingVenue::new(&chain, pool)?;
    let mut vault = Vault::new(&mut chain, venue, params)?.with_rewards_controller(controller);
    vault.set_route(&mut chain, MANAGER, SwapRoute::direct(usdc, reward_pair))?;

    chain.mint(usdc, ALICE, U256::from(10_000 * USDC))?;
    chain.approve(usdc, ALICE, vault.address(), U256::MAX)?;

    let shares = vault.deposit(
        &mut chain,
        ALICE,
        ALICE,
        U256::from(10_000 * USDC),
        U256::ZERO,
    )?;
    println!("Deposited 10,000 USDC for {} {}", shares, vault.symbol());

    // A month of 0.4% interest and some incentives
    chain.warp(30 * DAY);
    chain.accrue_interest(pool, 40)?;
    chain.accrue_rewards(
        controller,
        vault.venue().position_token(),
        vault.address(),
        U256::from(25 * USDC),
    )?;
    println!("Total assets after interest: {}", vault.total_assets(&chain)?);
    println!("Pending rewards: {}", vault.unclaimed_rewards(&chain)?);

    let report = vault.harvest(&mut chain, KEEPER, U256::ZERO)?;
    println!(
        "Harvest: claimed={} swapped={} keeper={} reinvested={}",
        report.claimed, report.swapped, report.caller_reward, report.reinvested
    );
    println!("Total assets after harvest: {}", vault.total_assets(&chain)?);

    let request = vault.request_unlock(&mut chain, ALICE, ALICE, shares)?;
    println!(
        "Unlock request #{} for {} shares, unlocks at {}",
        request.id,
        request.shares,
        request.unlocks_at(vault.get_lock_period())
    );

    if let Err(e) = vault.redeem(&mut chain, ALICE, ALICE, ALICE, shares, U256::ZERO) {
        println!("Early exit refused: {}", e);
    }

    chain.warp(vault.get_lock_period());
    let assets = vault.redeem(&mut chain, ALICE, ALICE, ALICE, shares, U256::ZERO)?;
    println!("Redeemed {} shares for {} USDC units", shares, assets);
    println!("Alice balance: {}", chain.balance_of(usdc, ALICE)?);

    Ok(())
}

async fn live_quotes(config: NetworkConfig) -> eyre::Result<()> {
    println!("\n========================================");
    println!("       Live single-sided quotes");
    println!("========================================");
    println!("Chain {} via {}", config.chain_id, config.rpc_url);

    let oracle = PairOracle::new(config)?;
    for reserves in oracle.watched_reserves().await? {
        // 1% of the token0 side
        let amount = reserves.reserve0 / U256::from(100);
        let (symbol, _) = oracle.token_info(reserves.token0).await?;
        let plan = oracle
            .quote_single_sided(reserves.pair, reserves.token0, amount)
            .await?;
        println!(
            "Pair {}: deposit {} {} -> swap {} for {}, mint {} LP",
            reserves.pair,
            amount,
            symbol,
            plan.swap_amount,
            plan.swap_output,
            plan.liquidity
        );
    }

    Ok(())
}
