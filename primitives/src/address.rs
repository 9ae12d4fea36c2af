use {
  serde::{Deserialize, Serialize},
  std::{
    fmt::{Debug, Display},
    str::FromStr,
  },
  thiserror::Error,
};

#[derive(Debug, Error, PartialEq)]
pub enum AddressError {
  #[error("expected 20 bytes of hex, got {0} characters")]
  InvalidLength(usize),

  #[error("invalid hex encoding: {0}")]
  InvalidHex(#[from] hex::FromHexError),
}

/// A 20-byte account or contract address.
///
/// The same type identifies externally owned wallets and deployed
/// contracts. The all-zero address is reserved as the "not configured"
/// sentinel and is never a valid call target.
#[derive(
  Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Address([u8; 20]);

impl Address {
  pub const ZERO: Address = Address([0u8; 20]);

  pub const fn new(bytes: [u8; 20]) -> Self {
    Self(bytes)
  }

  pub fn is_zero(&self) -> bool {
    *self == Self::ZERO
  }
}

impl AsRef<[u8]> for Address {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "0x{}", hex::encode(self.0))
  }
}

impl Debug for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "address(0x{})", hex::encode(self.0))
  }
}

impl From<Address> for String {
  fn from(addr: Address) -> Self {
    addr.to_string()
  }
}

impl FromStr for Address {
  type Err = AddressError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    if stripped.len() != 40 {
      return Err(AddressError::InvalidLength(stripped.len()));
    }
    let mut bytes = [0u8; 20];
    hex::decode_to_slice(stripped, &mut bytes)?;
    Ok(Self(bytes))
  }
}

impl TryFrom<&str> for Address {
  type Error = AddressError;

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    FromStr::from_str(value)
  }
}
