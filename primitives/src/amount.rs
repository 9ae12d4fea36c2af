use {
  serde::{Deserialize, Serialize},
  std::fmt::Display,
  thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
  #[error("empty amount string")]
  Empty,

  #[error("invalid character '{0}' in amount")]
  InvalidDigit(char),

  #[error("more than {0} fractional digits")]
  PrecisionLoss(u8),

  #[error("amount does not fit in 128 bits")]
  Overflow,
}

/// A token amount in the contract's fixed-point representation.
///
/// Contracts store integers scaled by 10^decimals; users type decimal
/// strings. This type holds the raw integer together with the declared
/// precision so the conversion in either direction is lossless.
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
pub struct Amount {
  raw: u128,
  decimals: u8,
}

impl Amount {
  pub const fn from_raw(raw: u128, decimals: u8) -> Self {
    Self { raw, decimals }
  }

  pub const fn zero(decimals: u8) -> Self {
    Self { raw: 0, decimals }
  }

  /// Parses a decimal string such as "1.5" into the fixed-point
  /// representation with the given precision. Fractional digits beyond
  /// the declared precision are rejected rather than silently truncated.
  pub fn parse(s: &str, decimals: u8) -> Result<Self, AmountError> {
    let s = s.trim();
    if s.is_empty() {
      return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = match s.split_once('.') {
      Some((i, f)) => (i, f),
      None => (s, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
      return Err(AmountError::Empty);
    }

    if frac_part.len() > decimals as usize {
      return Err(AmountError::PrecisionLoss(decimals));
    }

    let mut raw: u128 = 0;
    let scale = 10u128
      .checked_pow(decimals as u32)
      .ok_or(AmountError::Overflow)?;

    for c in int_part.chars() {
      let digit = c.to_digit(10).ok_or(AmountError::InvalidDigit(c))? as u128;
      raw = raw
        .checked_mul(10)
        .and_then(|r| r.checked_add(digit))
        .ok_or(AmountError::Overflow)?;
    }
    raw = raw.checked_mul(scale).ok_or(AmountError::Overflow)?;

    let mut frac: u128 = 0;
    for c in frac_part.chars() {
      let digit = c.to_digit(10).ok_or(AmountError::InvalidDigit(c))? as u128;
      frac = frac * 10 + digit;
    }
    // scale the fraction up to the full precision, e.g. "5" -> 5 * 10^17
    frac *= 10u128.pow((decimals as usize - frac_part.len()) as u32);

    raw = raw.checked_add(frac).ok_or(AmountError::Overflow)?;
    Ok(Self { raw, decimals })
  }

  pub const fn raw(&self) -> u128 {
    self.raw
  }

  pub const fn decimals(&self) -> u8 {
    self.decimals
  }

  pub const fn is_zero(&self) -> bool {
    self.raw == 0
  }

  pub fn checked_add(&self, other: Amount) -> Option<Amount> {
    if self.decimals != other.decimals {
      return None;
    }
    Some(Self {
      raw: self.raw.checked_add(other.raw)?,
      decimals: self.decimals,
    })
  }

  /// Approximate value for display-level aggregation. Not used anywhere
  /// amounts flow back on chain.
  pub fn to_f64(&self) -> f64 {
    self.raw as f64 / 10f64.powi(self.decimals as i32)
  }
}

impl Display for Amount {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let scale = match 10u128.checked_pow(self.decimals as u32) {
      Some(scale) => scale,
      // a precision 10^decimals cannot scale renders as the raw integer
      None => return write!(f, "{}", self.raw),
    };
    let int = self.raw / scale;
    let frac = self.raw % scale;
    if frac == 0 {
      return write!(f, "{int}");
    }
    let frac = format!("{frac:0width$}", width = self.decimals as usize);
    write!(f, "{int}.{}", frac.trim_end_matches('0'))
  }
}
