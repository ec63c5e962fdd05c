//! Network and vault configuration

use alloy::primitives::{Address, U256};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{BPS_DENOMINATOR, DEFAULT_LIQUIDITY_SLIPPAGE_BPS, MAX_REINVEST_REWARD_BPS};
use crate::error::{VaultError, VaultResult};
use crate::math::DivisionOrder;

/// Default chain when `CHAIN_ID` is not set (Ethereum mainnet)
const DEFAULT_CHAIN_ID: u64 = 1;

/// Network configuration for the live reserve oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Uniswap V2 style pairs to watch
    pub pairs: Vec<Address>,
}

impl NetworkConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            rpc_url: rpc_url.into(),
            pairs: Vec::new(),
        }
    }

    /// Load from the environment, reading a `.env` file first if present.
    ///
    /// `RPC_URL` is required; `CHAIN_ID` and a comma-separated `PAIRS` list
    /// are optional.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let rpc_url = std::env::var("RPC_URL").context("RPC_URL environment variable must be set")?;
        let mut config = Self::new(rpc_url);

        if let Ok(chain_id) = std::env::var("CHAIN_ID") {
            config.chain_id = chain_id
                .trim()
                .parse()
                .with_context(|| format!("Invalid CHAIN_ID: {chain_id}"))?;
        }
        if let Ok(pairs) = std::env::var("PAIRS") {
            config.pairs = parse_pairs(&pairs)?;
        }
        Ok(config)
    }

    /// Set the chain ID
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Add a pair to watch
    pub fn with_pair(mut self, pair: Address) -> Self {
        self.pairs.push(pair);
        self
    }
}

fn parse_pairs(raw: &str) -> Result<Vec<Address>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<Address>()
                .with_context(|| format!("Invalid pair address: {entry}"))
        })
        .collect()
}

/// Per-vault parameters fixed at construction, except for the harvest
/// settings the manager may update later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultParams {
    /// Only address allowed to change routes and harvest settings
    pub manager: Address,
    /// Cooldown between an unlock request and the withdrawal, in seconds.
    /// Zero disables the timelock.
    pub lock_period: u64,
    /// Smallest reward claim a harvest accepts
    pub min_tokens_to_harvest: U256,
    /// Harvest incentive, in units of `1/1000` of the swapped amount
    pub reinvest_reward_bps: u16,
    /// Tolerance applied to router minimums when adding or removing
    /// liquidity, in basis points
    pub liquidity_slippage_bps: u16,
    /// Operation order for dual-asset deposit amounts
    pub division_order: DivisionOrder,
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            manager: Address::ZERO,
            lock_period: 0,
            min_tokens_to_harvest: U256::ZERO,
            reinvest_reward_bps: 0,
            liquidity_slippage_bps: DEFAULT_LIQUIDITY_SLIPPAGE_BPS,
            division_order: DivisionOrder::default(),
        }
    }
}

impl VaultParams {
    pub fn new(manager: Address) -> Self {
        Self {
            manager,
            ..Default::default()
        }
    }

    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json).context("Failed to parse vault params")?;
        params.validate().context("Invalid vault params")?;
        Ok(params)
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.reinvest_reward_bps > MAX_REINVEST_REWARD_BPS {
            return Err(VaultError::RewardBpsTooHigh {
                bps: self.reinvest_reward_bps,
                max: MAX_REINVEST_REWARD_BPS,
            });
        }
        if u64::from(self.liquidity_slippage_bps) > BPS_DENOMINATOR {
            return Err(VaultError::InvalidParameter("liquidity slippage above 100%"));
        }
        Ok(())
    }

    pub fn with_lock_period(mut self, seconds: u64) -> Self {
        self.lock_period = seconds;
        self
    }

    pub fn with_min_tokens_to_harvest(mut self, amount: U256) -> Self {
        self.min_tokens_to_harvest = amount;
        self
    }

    pub fn with_reinvest_reward_bps(mut self, bps: u16) -> Self {
        self.reinvest_reward_bps = bps;
        self
    }

    pub fn with_liquidity_slippage_bps(mut self, bps: u16) -> Self {
        self.liquidity_slippage_bps = bps;
        self
    }

    pub fn with_division_order(mut self, order: DivisionOrder) -> Self {
        self.division_order = order;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(
            "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc, 0xA478c2975Ab1Ea89e8196811F51A7B7Ade33eB11,",
        )
        .unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(parse_pairs("0x1234").is_err());
        assert!(parse_pairs("").unwrap().is_empty());
    }

    #[test]
    fn test_builder() {
        let pair = Address::repeat_byte(7);
        let config = NetworkConfig::new("http://localhost:8545")
            .with_chain_id(31337)
            .with_pair(pair);
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.pairs, vec![pair]);
    }

    #[test]
    fn test_vault_params_defaults() {
        let params: VaultParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.liquidity_slippage_bps, DEFAULT_LIQUIDITY_SLIPPAGE_BPS);
        assert_eq!(params.division_order, DivisionOrder::MultiplyFirst);
        assert_eq!(params.lock_period, 0);
    }

    #[test]
    fn test_vault_params_from_json() {
        let params = VaultParams::from_json(
            r#"{
                "manager": "0x0000000000000000000000000000000000000001",
                "lock_period": 86400,
                "min_tokens_to_harvest": "0x1f4",
                "reinvest_reward_bps": 50,
                "division_order": "divide_first"
            }"#,
        )
        .unwrap();
        assert_eq!(params.lock_period, 86_400);
        assert_eq!(params.min_tokens_to_harvest, U256::from(500u64));
        assert_eq!(params.division_order, DivisionOrder::DivideFirst);

        assert!(VaultParams::from_json(r#"{"reinvest_reward_bps": 151}"#).is_err());
        assert!(VaultParams::from_json(r#"{"liquidity_slippage_bps": 10001}"#).is_err());
    }

    #[test]
    fn test_validate_reward_cap() {
        assert_eq!(
            VaultParams::default().with_reinvest_reward_bps(151).validate(),
            Err(VaultError::RewardBpsTooHigh { bps: 151, max: 150 })
        );
        assert!(VaultParams::default()
            .with_reinvest_reward_bps(150)
            .validate()
            .is_ok());
    }
}
