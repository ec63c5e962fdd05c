//! Vault events (ERC-4626 plus timelock and harvest extensions)

use alloy::sol;

sol! {
    /// Emitted on deposit and mint
    #[derive(Debug, PartialEq, Eq)]
    event Deposit(address indexed sender, address indexed owner, uint256 assets, uint256 shares);

    /// Emitted on withdraw and redeem
    #[derive(Debug, PartialEq, Eq)]
    event Withdraw(
        address indexed sender,
        address indexed receiver,
        address indexed owner,
        uint256 assets,
        uint256 shares
    );

    /// Emitted when an owner earmarks shares for a timelocked exit
    #[derive(Debug, PartialEq, Eq)]
    event UnlockRequested(address indexed owner, uint256 id, uint256 shares, uint64 startedAt);

    /// Emitted when a pending unlock request is dropped
    #[derive(Debug, PartialEq, Eq)]
    event UnlockCancelled(address indexed owner, uint256 id);

    /// Emitted after rewards are claimed, swapped and compounded
    #[derive(Debug, PartialEq, Eq)]
    event Harvest(
        address indexed caller,
        uint256 claimed,
        uint256 swapped,
        uint256 callerReward,
        uint256 reinvested
    );

    /// Emitted when the manager sets the reward liquidation route
    #[derive(Debug, PartialEq, Eq)]
    event RouteSet(address indexed intermediateToken, address pair1, address pair2);

    /// Emitted when the manager changes the minimum claim for a harvest
    #[derive(Debug, PartialEq, Eq)]
    event MinTokensToHarvestUpdated(uint256 minTokens);

    /// Emitted when the manager changes the harvest incentive
    #[derive(Debug, PartialEq, Eq)]
    event ReinvestRewardBpsUpdated(uint16 bps);
}
