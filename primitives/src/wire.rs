use {
  crate::Address,
  serde::{Deserialize, Serialize},
  std::fmt::{Debug, Display},
  thiserror::Error,
};

/// A 32-byte transaction hash.
#[derive(
  Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TxHash(pub [u8; 32]);

impl Display for TxHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "0x{}", hex::encode(self.0))
  }
}

impl Debug for TxHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "tx(0x{})", hex::encode(self.0))
  }
}

/// A single value crossing the contract boundary, in either direction.
///
/// Contract reads come back as dynamically shaped tuples; every field is
/// decoded through this tagged representation so that a shape mismatch
/// surfaces as a [`ValueError`] at the binding layer instead of a bad
/// record leaking into the views.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum Value {
  Uint(u128),
  Bool(bool),
  Address(Address),
  Str(String),
  Addresses(Vec<Address>),
}

impl Value {
  fn tag(&self) -> &'static str {
    match self {
      Value::Uint(_) => "uint",
      Value::Bool(_) => "bool",
      Value::Address(_) => "address",
      Value::Str(_) => "string",
      Value::Addresses(_) => "address[]",
    }
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
  #[error("expected {expected} at field {index}, found {found}")]
  Mismatch {
    index: usize,
    expected: &'static str,
    found: &'static str,
  },

  #[error("expected {expected} return values, found {found}")]
  Arity { expected: usize, found: usize },
}

/// Cursor over a contract return tuple. Each accessor consumes one
/// field; [`Decoder::finish`] asserts nothing is left over, so both
/// too-short and too-long shapes are rejected.
pub struct Decoder<'a> {
  values: &'a [Value],
  index: usize,
}

impl<'a> Decoder<'a> {
  pub fn new(values: &'a [Value]) -> Self {
    Self { values, index: 0 }
  }

  fn next(&mut self) -> Result<&'a Value, ValueError> {
    let value = self.values.get(self.index).ok_or(ValueError::Arity {
      expected: self.index + 1,
      found: self.values.len(),
    })?;
    self.index += 1;
    Ok(value)
  }

  fn mismatch(&self, expected: &'static str, found: &Value) -> ValueError {
    ValueError::Mismatch {
      index: self.index - 1,
      expected,
      found: found.tag(),
    }
  }

  pub fn uint(&mut self) -> Result<u128, ValueError> {
    match self.next()? {
      Value::Uint(v) => Ok(*v),
      other => Err(self.mismatch("uint", other)),
    }
  }

  pub fn bool(&mut self) -> Result<bool, ValueError> {
    match self.next()? {
      Value::Bool(v) => Ok(*v),
      other => Err(self.mismatch("bool", other)),
    }
  }

  pub fn address(&mut self) -> Result<Address, ValueError> {
    match self.next()? {
      Value::Address(v) => Ok(*v),
      other => Err(self.mismatch("address", other)),
    }
  }

  pub fn str(&mut self) -> Result<&'a str, ValueError> {
    match self.next()? {
      Value::Str(v) => Ok(v),
      other => Err(self.mismatch("string", other)),
    }
  }

  pub fn addresses(&mut self) -> Result<Vec<Address>, ValueError> {
    match self.next()? {
      Value::Addresses(v) => Ok(v.clone()),
      other => Err(self.mismatch("address[]", other)),
    }
  }

  pub fn finish(self) -> Result<(), ValueError> {
    if self.index != self.values.len() {
      return Err(ValueError::Arity {
        expected: self.index,
        found: self.values.len(),
      });
    }
    Ok(())
  }
}

/// An invocation of one contract function, read-only or mutating.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Call {
  pub to: Address,
  pub method: String,
  pub args: Vec<Value>,
  pub sender: Option<Address>,
}

impl Call {
  pub fn new(to: Address, method: impl Into<String>) -> Self {
    Self {
      to,
      method: method.into(),
      args: vec![],
      sender: None,
    }
  }

  pub fn arg(mut self, value: Value) -> Self {
    self.args.push(value);
    self
  }

  pub fn from(mut self, sender: Address) -> Self {
    self.sender = Some(sender);
    self
  }
}

/// Outcome of a mined transaction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Receipt {
  pub tx_hash: TxHash,
  pub block_number: u64,
  pub success: bool,
}

/// Selects event logs by emitting contract, event names and block range
/// (both bounds inclusive).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct LogFilter {
  pub contract: Address,
  pub events: Vec<String>,
  pub from_block: u64,
  pub to_block: u64,
}

/// One decoded event log.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct LogEntry {
  pub contract: Address,
  pub event: String,
  pub params: Vec<Value>,
  pub block_number: u64,
  pub timestamp: u64,
  pub tx_hash: TxHash,
}
