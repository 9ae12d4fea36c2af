use {
  crate::provider::ProviderError,
  coincircle_primitives::{
    AmountError,
    GroupId,
    TxHash,
    UnknownPolicy,
    ValueError,
  },
  std::time::Duration,
  thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("wallet provider is not available")]
  WalletUnavailable,

  #[error("wallet provider exposed no accounts")]
  NoAccounts,

  #[error("session is not connected")]
  NotConnected,

  #[error("{0} contract address is not configured")]
  ContractNotConfigured(&'static str),

  #[error("{0} contract is not initialized")]
  ContractNotInitialized(&'static str),

  #[error("unknown group {0}")]
  UnknownGroup(GroupId),

  #[error("token reports an unsupported precision of {0} decimals")]
  UnsupportedDecimals(u128),

  #[error("transaction {0} reverted")]
  Reverted(TxHash),

  #[error("transaction {hash} not confirmed within {timeout:?}")]
  ConfirmationTimeout { hash: TxHash, timeout: Duration },

  #[error(transparent)]
  Provider(#[from] ProviderError),

  #[error("malformed contract response: {0}")]
  Decode(#[from] ValueError),

  #[error(transparent)]
  Policy(#[from] UnknownPolicy),

  #[error(transparent)]
  Amount(#[from] AmountError),
}
