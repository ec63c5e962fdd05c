//! PairOracle - live reserve reads from Uniswap V2 style pairs over JSON-RPC

use crate::config::NetworkConfig;
use crate::contracts::{IUniswapV2Pair, IERC20};
use crate::engine::{ConversionEngine, SingleSidedPlan, Topology};
use crate::types::PairReserves;
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use eyre::{Context, Result};
use std::sync::Arc;

/// Type alias for read-only provider
type ReadProvider = Arc<RootProvider<Ethereum>>;

/// Read-only client for pair reserves and single-sided entry quotes
pub struct PairOracle {
    config: NetworkConfig,
    provider: ReadProvider,
}

impl PairOracle {
    /// Create a new PairOracle
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let url: Url = config.rpc_url.parse().context("Invalid RPC URL")?;
        // Read-only provider without fillers (we only do eth_call operations)
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(url);

        Ok(Self {
            config,
            provider: Arc::new(provider),
        })
    }

    /// Get the network configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<Bytes> {
        self.provider
            .call(
                alloy::rpc::types::TransactionRequest::default()
                    .with_to(to)
                    .with_input(call.abi_encode()),
            )
            .await
            .with_context(|| format!("Failed to call {} on {}", C::SIGNATURE, to))
    }

    /// Live reserves and LP supply of `pair`
    pub async fn reserves(&self, pair: Address) -> Result<PairReserves> {
        let (token0, token1, reserves, supply) = tokio::try_join!(
            self.call(pair, IUniswapV2Pair::token0Call {}),
            self.call(pair, IUniswapV2Pair::token1Call {}),
            self.call(pair, IUniswapV2Pair::getReservesCall {}),
            self.call(pair, IUniswapV2Pair::totalSupplyCall {}),
        )?;

        let reserves = decode_reserves(pair, &token0, &token1, &reserves, &supply)?;
        tracing::debug!(
            "Pair {}: reserve0={} reserve1={} supply={}",
            pair,
            reserves.reserve0,
            reserves.reserve1,
            reserves.total_supply
        );
        Ok(reserves)
    }

    /// Symbol and decimals of an ERC20 token
    pub async fn token_info(&self, token: Address) -> Result<(String, u8)> {
        let (symbol, decimals) = tokio::try_join!(
            self.call(token, IERC20::symbolCall {}),
            self.call(token, IERC20::decimalsCall {}),
        )?;
        let symbol =
            IERC20::symbolCall::abi_decode_returns(&symbol).context("Failed to decode symbol")?;
        let decimals = IERC20::decimalsCall::abi_decode_returns(&decimals)
            .context("Failed to decode decimals")?;
        Ok((symbol, decimals))
    }

    /// ERC20 balance of `owner`, e.g. the LP held by a deployed vault
    pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        let result = self
            .call(token, IERC20::balanceOfCall { account: owner })
            .await?;
        IERC20::balanceOfCall::abi_decode_returns(&result).context("Failed to decode balance")
    }

    /// Reserves of every configured pair, fetched concurrently
    pub async fn watched_reserves(&self) -> Result<Vec<PairReserves>> {
        futures::future::try_join_all(self.config.pairs.iter().map(|pair| self.reserves(*pair)))
            .await
    }

    /// How a single-sided deposit of `amount` of `token_in` would enter
    /// `pair` right now
    pub async fn quote_single_sided(
        &self,
        pair: Address,
        token_in: Address,
        amount: U256,
    ) -> Result<SingleSidedPlan> {
        let reserves = self.reserves(pair).await?;
        eyre::ensure!(
            reserves.contains(token_in),
            "Token {} is not part of pair {}",
            token_in,
            pair
        );

        let engine = ConversionEngine::new(Topology::SingleLpToken, token_in);
        engine
            .single_sided_plan(&reserves, amount)
            .context("Failed to simulate single-sided entry")
    }
}

/// Assemble a snapshot from raw `eth_call` return data
fn decode_reserves(
    pair: Address,
    token0: &[u8],
    token1: &[u8],
    reserves: &[u8],
    supply: &[u8],
) -> Result<PairReserves> {
    let token0 =
        IUniswapV2Pair::token0Call::abi_decode_returns(token0).context("Failed to decode token0")?;
    let token1 =
        IUniswapV2Pair::token1Call::abi_decode_returns(token1).context("Failed to decode token1")?;
    let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(reserves)
        .context("Failed to decode reserves")?;
    let total_supply = IUniswapV2Pair::totalSupplyCall::abi_decode_returns(supply)
        .context("Failed to decode totalSupply")?;

    Ok(PairReserves {
        pair,
        token0,
        token1,
        reserve0: U256::from(reserves.reserve0),
        reserve1: U256::from(reserves.reserve1),
        total_supply,
    })
}
