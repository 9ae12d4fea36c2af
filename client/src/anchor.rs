use {
  crate::{
    abi::anchor as abi,
    config::NATIVE_DECIMALS,
    provider::{PendingTransaction, Provider, ProviderError},
    Error,
  },
  coincircle_primitives::{
    Address,
    Amount,
    AnchorParameters,
    Call,
    Decoder,
    LogEntry,
    LogFilter,
    TxHash,
    Value,
  },
  futures::try_join,
  std::{sync::Arc, time::Duration},
  tracing::warn,
};

/// A decoded collateralized-token contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorEvent {
  Mint { account: Address, amount: Amount },
  Burn { account: Address, amount: Amount },
  Transfer { from: Address, to: Address, value: Amount },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorLog {
  pub event: AnchorEvent,
  pub block_number: u64,
  pub timestamp: u64,
  pub tx_hash: TxHash,
}

/// Typed binding for the collateralized-token (cAnchor) contract.
#[derive(Clone)]
pub struct AnchorTokenContract {
  address: Address,
  provider: Arc<dyn Provider>,
  poll: Duration,
}

impl AnchorTokenContract {
  pub fn new(
    provider: Arc<dyn Provider>,
    address: Address,
    poll: Duration,
  ) -> Result<Self, Error> {
    if address.is_zero() {
      return Err(Error::ContractNotConfigured("anchor token"));
    }
    Ok(Self {
      address,
      provider,
      poll,
    })
  }

  pub fn address(&self) -> Address {
    self.address
  }

  async fn read_uint(&self, method: &'static str) -> Result<u128, Error> {
    let values =
      self.provider.call(Call::new(self.address, method)).await?;
    let mut decoder = Decoder::new(&values);
    let value = decoder.uint()?;
    decoder.finish()?;
    Ok(value)
  }

  async fn read_balance(
    &self,
    method: &'static str,
    account: Address,
  ) -> Result<Amount, Error> {
    let values = self
      .provider
      .call(Call::new(self.address, method).arg(Value::Address(account)))
      .await?;
    let mut decoder = Decoder::new(&values);
    let raw = decoder.uint()?;
    decoder.finish()?;
    Ok(Amount::from_raw(raw, NATIVE_DECIMALS))
  }

  pub async fn balance_of(&self, account: Address) -> Result<Amount, Error> {
    self.read_balance(abi::BALANCE_OF, account).await
  }

  pub async fn collateral_balance(
    &self,
    account: Address,
  ) -> Result<Amount, Error> {
    self.read_balance(abi::COLLATERAL_BALANCE, account).await
  }

  pub async fn debt_balance(
    &self,
    account: Address,
  ) -> Result<Amount, Error> {
    self.read_balance(abi::DEBT_BALANCE, account).await
  }

  pub async fn supported_collaterals(&self) -> Result<Vec<Address>, Error> {
    let values = self
      .provider
      .call(Call::new(self.address, abi::SUPPORTED_COLLATERALS))
      .await?;
    let mut decoder = Decoder::new(&values);
    let collaterals = decoder.addresses()?;
    decoder.finish()?;
    Ok(collaterals)
  }

  pub async fn price_oracle(&self) -> Result<Address, Error> {
    let values = self
      .provider
      .call(Call::new(self.address, abi::PRICE_ORACLE))
      .await?;
    let mut decoder = Decoder::new(&values);
    let oracle = decoder.address()?;
    decoder.finish()?;
    Ok(oracle)
  }

  /// Fetches the six protocol parameters in parallel. Failure here
  /// propagates: these are core dashboard figures with no sensible
  /// degraded rendering.
  pub async fn parameters(&self) -> Result<AnchorParameters, Error> {
    let (
      target_price,
      min_collateral_ratio,
      liquidation_ratio,
      stability_fee,
      total_collateral_value,
      total_supply,
    ) = try_join!(
      self.read_uint(abi::TARGET_PRICE),
      self.read_uint(abi::MIN_COLLATERAL_RATIO),
      self.read_uint(abi::LIQUIDATION_RATIO),
      self.read_uint(abi::STABILITY_FEE),
      self.read_uint(abi::TOTAL_COLLATERAL_VALUE),
      self.read_uint(abi::TOTAL_SUPPLY),
    )?;

    Ok(AnchorParameters {
      target_price: Amount::from_raw(target_price, NATIVE_DECIMALS),
      min_collateral_ratio: min_collateral_ratio as u64,
      liquidation_ratio: liquidation_ratio as u64,
      stability_fee: stability_fee as u64,
      total_collateral_value: Amount::from_raw(
        total_collateral_value,
        NATIVE_DECIMALS,
      ),
      total_supply: Amount::from_raw(total_supply, NATIVE_DECIMALS),
    })
  }

  async fn submit(&self, call: Call) -> Result<PendingTransaction, Error> {
    let hash = self.provider.send_transaction(call).await?;
    Ok(PendingTransaction::new(hash, self.provider.clone(), self.poll))
  }

  /// Deposits collateral and mints against it.
  pub async fn mint(
    &self,
    collateral_token: Address,
    collateral_amount: Amount,
    mint_amount: Amount,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    self
      .submit(
        Call::new(self.address, abi::MINT)
          .arg(Value::Address(collateral_token))
          .arg(Value::Uint(collateral_amount.raw()))
          .arg(Value::Uint(mint_amount.raw()))
          .from(sender),
      )
      .await
  }

  /// Burns tokens, releasing the corresponding debt.
  pub async fn burn(
    &self,
    amount: Amount,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    self
      .submit(
        Call::new(self.address, abi::BURN)
          .arg(Value::Uint(amount.raw()))
          .from(sender),
      )
      .await
  }

  pub async fn transfer(
    &self,
    to: Address,
    amount: Amount,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    self
      .submit(
        Call::new(self.address, abi::TRANSFER)
          .arg(Value::Address(to))
          .arg(Value::Uint(amount.raw()))
          .from(sender),
      )
      .await
  }

  /// Mint, burn and transfer events in the inclusive block range.
  /// Undecodable entries are logged and skipped.
  pub async fn events(
    &self,
    from_block: u64,
    to_block: u64,
  ) -> Result<Vec<AnchorLog>, Error> {
    let entries = self
      .provider
      .logs(LogFilter {
        contract: self.address,
        events: vec![
          abi::EV_MINT.into(),
          abi::EV_BURN.into(),
          abi::EV_TRANSFER.into(),
        ],
        from_block,
        to_block,
      })
      .await?;

    let mut logs = Vec::with_capacity(entries.len());
    for entry in entries {
      match decode_event(&entry) {
        Ok(event) => logs.push(AnchorLog {
          event,
          block_number: entry.block_number,
          timestamp: entry.timestamp,
          tx_hash: entry.tx_hash,
        }),
        Err(e) => warn!("skipping malformed {} log: {e}", entry.event),
      }
    }
    Ok(logs)
  }
}

fn decode_event(entry: &LogEntry) -> Result<AnchorEvent, Error> {
  let mut decoder = Decoder::new(&entry.params);
  let event = match entry.event.as_str() {
    abi::EV_MINT => AnchorEvent::Mint {
      account: decoder.address()?,
      amount: Amount::from_raw(decoder.uint()?, NATIVE_DECIMALS),
    },
    abi::EV_BURN => AnchorEvent::Burn {
      account: decoder.address()?,
      amount: Amount::from_raw(decoder.uint()?, NATIVE_DECIMALS),
    },
    abi::EV_TRANSFER => AnchorEvent::Transfer {
      from: decoder.address()?,
      to: decoder.address()?,
      value: Amount::from_raw(decoder.uint()?, NATIVE_DECIMALS),
    },
    other => {
      return Err(Error::Provider(ProviderError::Transport(format!(
        "unexpected event '{other}' in filtered logs"
      ))))
    }
  };
  decoder.finish()?;
  Ok(event)
}
