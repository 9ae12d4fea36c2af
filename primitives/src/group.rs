use {
  crate::{Address, Amount},
  serde::{Deserialize, Serialize},
  std::{fmt::Display, str::FromStr},
  thiserror::Error,
};

/// Index of a savings group in the group contract's registry.
#[derive(
  Copy,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Debug,
)]
pub struct GroupId(pub u64);

impl Display for GroupId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<u64> for GroupId {
  fn from(id: u64) -> Self {
    Self(id)
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown payout policy '{0}'")]
pub struct UnknownPolicy(String);

/// How the contract picks each round's beneficiary. Encoded on chain as
/// a plain string parameter.
#[derive(
  Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug, Default,
)]
pub enum PayoutPolicy {
  /// Members are paid in join order, one per round.
  #[default]
  Rotation,
  /// The contract draws a random unpaid member each round.
  Random,
}

impl Display for PayoutPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PayoutPolicy::Rotation => write!(f, "rotation"),
      PayoutPolicy::Random => write!(f, "random"),
    }
  }
}

impl FromStr for PayoutPolicy {
  type Err = UnknownPolicy;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "rotation" => Ok(PayoutPolicy::Rotation),
      "random" => Ok(PayoutPolicy::Random),
      other => Err(UnknownPolicy(other.into())),
    }
  }
}

/// One savings group as reported by the group contract.
///
/// Created by an external transaction and mutated only by further
/// transactions (join, contribute, trigger payout). Never deleted, only
/// marked completed. The invariants that `members.len() <= group_size`
/// and `current_round <= group_size` are properties of the contract and
/// are not re-checked here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Group {
  pub id: GroupId,
  pub creator: Address,
  pub token: Address,
  pub contribution_amount: Amount,
  pub round_duration_days: u64,
  pub group_size: u64,
  pub payout_policy: PayoutPolicy,
  pub current_round: u64,
  pub started: bool,
  pub completed: bool,
  pub members: Vec<Address>,
}

impl Group {
  pub fn is_member(&self, address: &Address) -> bool {
    self.members.contains(address)
  }

  pub fn is_full(&self) -> bool {
    self.members.len() as u64 >= self.group_size
  }

  pub fn is_active(&self) -> bool {
    self.started && !self.completed
  }

  /// The member due to be paid in the current round, for rotation
  /// groups. Random groups pick on chain, so there is nothing to
  /// predict client-side.
  pub fn next_recipient(&self) -> Option<&Address> {
    match self.payout_policy {
      PayoutPolicy::Rotation => self.members.get(self.current_round as usize),
      PayoutPolicy::Random => None,
    }
  }

  /// Whether a rotation member still has an unpaid round ahead of them.
  pub fn payout_pending_for(&self, address: &Address) -> bool {
    if !self.is_active() || self.payout_policy != PayoutPolicy::Rotation {
      return false;
    }
    self
      .members
      .iter()
      .position(|m| m == address)
      .map(|index| index as u64 >= self.current_round)
      .unwrap_or(false)
  }
}
