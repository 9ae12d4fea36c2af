//! Function and event names of the external contracts, as they appear
//! in the deployed ABIs. The bindings are the only modules that should
//! reference these.

/// Group-savings contract surface.
pub mod savings {
  pub const CREATE_GROUP: &str = "createGroup";
  pub const JOIN_GROUP: &str = "joinGroup";
  pub const CONTRIBUTE: &str = "contribute";
  pub const TRIGGER_PAYOUT: &str = "triggerPayout";
  pub const WITHDRAW: &str = "withdraw";
  pub const GET_GROUP_INFO: &str = "getGroupInfo";
  pub const IS_MEMBER: &str = "isMember";
  pub const GROUP_COUNTER: &str = "groupCounter";

  pub const EV_GROUP_CREATED: &str = "GroupCreated";
  pub const EV_GROUP_JOINED: &str = "GroupJoined";
  pub const EV_CONTRIBUTION_MADE: &str = "ContributionMade";
  pub const EV_PAYOUT_TRIGGERED: &str = "PayoutTriggered";
  pub const EV_WITHDRAWAL_MADE: &str = "WithdrawalMade";
}

/// Collateralized-token (cAnchor) contract surface.
pub mod anchor {
  pub const MINT: &str = "mint";
  pub const BURN: &str = "burn";
  pub const TRANSFER: &str = "transfer";
  pub const BALANCE_OF: &str = "balanceOf";
  pub const COLLATERAL_BALANCE: &str = "getUserCollateralBalance";
  pub const DEBT_BALANCE: &str = "getUserDebtBalance";
  pub const SUPPORTED_COLLATERALS: &str = "getSupportedCollaterals";
  pub const PRICE_ORACLE: &str = "getPriceOracle";
  pub const TARGET_PRICE: &str = "getTargetPrice";
  pub const MIN_COLLATERAL_RATIO: &str = "getMinCollateralRatio";
  pub const LIQUIDATION_RATIO: &str = "getLiquidationRatio";
  pub const STABILITY_FEE: &str = "getStabilityFee";
  pub const TOTAL_COLLATERAL_VALUE: &str = "getTotalCollateralValue";
  pub const TOTAL_SUPPLY: &str = "totalSupply";

  pub const EV_MINT: &str = "Mint";
  pub const EV_BURN: &str = "Burn";
  pub const EV_TRANSFER: &str = "Transfer";
}

/// Standard ERC-20 surface used for collateral token metadata and
/// approvals.
pub mod erc20 {
  pub const NAME: &str = "name";
  pub const SYMBOL: &str = "symbol";
  pub const DECIMALS: &str = "decimals";
  pub const BALANCE_OF: &str = "balanceOf";
  pub const APPROVE: &str = "approve";
  pub const ALLOWANCE: &str = "allowance";
  pub const TRANSFER: &str = "transfer";
}

/// Price oracle referenced by the anchor contract.
pub mod oracle {
  pub const GET_PRICE: &str = "getPrice";
}
