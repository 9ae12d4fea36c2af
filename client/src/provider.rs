use {
  crate::Error,
  coincircle_primitives::{
    Address,
    Amount,
    Call,
    LogEntry,
    LogFilter,
    Receipt,
    TxHash,
    Value,
  },
  futures::{future::BoxFuture, stream::BoxStream},
  std::{sync::Arc, time::Duration},
  thiserror::Error,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
  /// The injected wallet object is absent. Fatal to any connect
  /// attempt.
  #[error("no wallet provider available")]
  Unavailable,

  #[error("transport error: {0}")]
  Transport(String),

  #[error("call to {method} reverted: {reason}")]
  Reverted { method: String, reason: String },
}

/// Session-relevant notifications pushed by the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
  /// The set of exposed accounts changed. Empty means the user revoked
  /// access entirely.
  AccountsChanged(Vec<Address>),
  /// The wallet switched chains.
  ChainChanged(u64),
}

/// The wallet/RPC collaborator: an injected object exposing account
/// access, read calls, transaction submission and event subscription.
///
/// Methods return boxed futures so sessions and bindings can share a
/// single `Arc<dyn Provider>` regardless of the concrete transport.
pub trait Provider: Send + Sync {
  /// Requests account access from the wallet. Fails with
  /// [`ProviderError::Unavailable`] when no wallet is injected.
  fn request_accounts(
    &self,
  ) -> BoxFuture<'_, Result<Vec<Address>, ProviderError>>;

  fn chain_id(&self) -> BoxFuture<'_, Result<u64, ProviderError>>;

  /// Height of the most recent block.
  fn block_number(&self) -> BoxFuture<'_, Result<u64, ProviderError>>;

  /// Native currency balance of an account.
  fn native_balance(
    &self,
    address: Address,
  ) -> BoxFuture<'_, Result<Amount, ProviderError>>;

  /// Read-only contract call. Returns the raw return tuple.
  fn call(
    &self,
    call: Call,
  ) -> BoxFuture<'_, Result<Vec<Value>, ProviderError>>;

  /// Submits a state-mutating transaction and returns its hash without
  /// waiting for inclusion.
  fn send_transaction(
    &self,
    call: Call,
  ) -> BoxFuture<'_, Result<TxHash, ProviderError>>;

  /// The receipt of a transaction, or `None` while it is still pending.
  fn transaction_receipt(
    &self,
    hash: TxHash,
  ) -> BoxFuture<'_, Result<Option<Receipt>, ProviderError>>;

  /// Event logs matching a filter.
  fn logs(
    &self,
    filter: LogFilter,
  ) -> BoxFuture<'_, Result<Vec<LogEntry>, ProviderError>>;

  /// Stream of wallet notifications. The stream ends when the provider
  /// goes away; consumers drop their subscription on teardown.
  fn subscribe(&self) -> BoxStream<'static, WalletEvent>;
}

/// A submitted but not yet confirmed transaction.
///
/// Submission always precedes the confirmation wait; callers must not
/// treat the on-chain effect as applied until [`wait`](Self::wait)
/// resolves.
#[derive(Clone)]
pub struct PendingTransaction {
  hash: TxHash,
  provider: Arc<dyn Provider>,
  poll: Duration,
}

impl PendingTransaction {
  pub fn new(
    hash: TxHash,
    provider: Arc<dyn Provider>,
    poll: Duration,
  ) -> Self {
    Self {
      hash,
      provider,
      poll,
    }
  }

  pub fn hash(&self) -> TxHash {
    self.hash
  }

  /// Polls for the receipt until the transaction is mined, the node
  /// reports a revert, or `timeout` elapses.
  pub async fn wait(&self, timeout: Duration) -> Result<Receipt, Error> {
    let confirmed = async {
      let mut interval = tokio::time::interval(self.poll);
      interval.set_missed_tick_behavior(
        tokio::time::MissedTickBehavior::Skip,
      );
      loop {
        interval.tick().await;
        if let Some(receipt) =
          self.provider.transaction_receipt(self.hash).await?
        {
          return Ok::<Receipt, Error>(receipt);
        }
      }
    };

    let receipt = tokio::time::timeout(timeout, confirmed)
      .await
      .map_err(|_| Error::ConfirmationTimeout {
        hash: self.hash,
        timeout,
      })??;

    if !receipt.success {
      return Err(Error::Reverted(self.hash));
    }
    Ok(receipt)
  }
}
