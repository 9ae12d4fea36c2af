use {
  crate::{Amount, TxHash},
  serde::{Deserialize, Serialize},
};

#[derive(
  Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug,
)]
pub enum ActivityKind {
  Contribution,
  Payout,
  GroupJoined,
  GroupCreated,
  Mint,
  Burn,
  Transfer,
}

/// One row of the dashboard activity feed, reconstructed from event
/// logs in a bounded recent-block window on each load. Purely
/// presentational.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct ActivityItem {
  pub kind: ActivityKind,
  pub title: String,
  pub description: String,
  pub amount: Option<Amount>,
  pub timestamp: u64,
  pub tx_hash: Option<TxHash>,
}
