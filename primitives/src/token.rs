use {
  crate::{Address, Amount},
  serde::{Deserialize, Serialize},
};

/// Metadata of an ERC-20 style token, fetched on demand and never
/// persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TokenInfo {
  pub address: Address,
  pub symbol: String,
  pub name: String,
  pub decimals: u8,
}

impl TokenInfo {
  /// Degraded entry used when a token's metadata calls fail. The list
  /// of supported collaterals must still render, one bad token must not
  /// blank the whole picker.
  pub fn placeholder(address: Address) -> Self {
    Self {
      address,
      symbol: "UNKNOWN".into(),
      name: "Unknown Token".into(),
      decimals: 18,
    }
  }
}

/// Per-user aggregates shown on the dashboard landing page. Derived,
/// recomputed on every refresh, never cached durably. The all-zero value
/// doubles as the degraded result when chain reads fail.
#[derive(
  Clone, Copy, PartialEq, Serialize, Deserialize, Debug, Default,
)]
pub struct UserStats {
  pub total_contributed: f64,
  pub total_received: f64,
  pub active_groups: usize,
  pub pending_payouts: usize,
}

/// Protocol-level figures of the collateralized token, assembled from
/// six independent on-chain reads.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct AnchorParameters {
  pub target_price: Amount,
  pub min_collateral_ratio: u64,
  pub liquidation_ratio: u64,
  pub stability_fee: u64,
  pub total_collateral_value: Amount,
  pub total_supply: Amount,
}
