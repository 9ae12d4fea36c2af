mod abi;
mod anchor;
mod config;
mod data;
mod erc20;
mod error;
mod provider;
mod savings;
mod session;

pub use {
  anchor::{AnchorEvent, AnchorLog, AnchorTokenContract},
  coincircle_primitives as primitives,
  config::{
    fallback_collateral_tokens,
    Config,
    ContractAddresses,
    Limits,
    NativeCurrency,
    NetworkConfig,
    NATIVE_DECIMALS,
  },
  data::ChainDataService,
  erc20::Erc20Contract,
  error::Error,
  provider::{PendingTransaction, Provider, ProviderError, WalletEvent},
  savings::{SavingsEvent, SavingsGroupContract, SavingsLog},
  session::Session,
};
