use {
  crate::{
    abi::erc20 as abi,
    provider::{PendingTransaction, Provider},
    Error,
  },
  coincircle_primitives::{
    Address,
    Amount,
    Call,
    Decoder,
    TokenInfo,
    Value,
  },
  futures::try_join,
  std::{sync::Arc, time::Duration},
};

/// Binding for a standard ERC-20 token, used for collateral metadata,
/// balances and spending approvals.
#[derive(Clone)]
pub struct Erc20Contract {
  address: Address,
  provider: Arc<dyn Provider>,
  poll: Duration,
}

impl Erc20Contract {
  pub fn new(
    provider: Arc<dyn Provider>,
    address: Address,
    poll: Duration,
  ) -> Result<Self, Error> {
    if address.is_zero() {
      return Err(Error::ContractNotConfigured("token"));
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

  async fn read_str(&self, method: &'static str) -> Result<String, Error> {
    let values =
      self.provider.call(Call::new(self.address, method)).await?;
    let mut decoder = Decoder::new(&values);
    let value = decoder.str()?.to_owned();
    decoder.finish()?;
    Ok(value)
  }

  pub async fn decimals(&self) -> Result<u8, Error> {
    let values = self
      .provider
      .call(Call::new(self.address, abi::DECIMALS))
      .await?;
    let mut decoder = Decoder::new(&values);
    let decimals = decoder.uint()?;
    decoder.finish()?;
    // 10^39 overflows u128, so 38 is the highest precision the
    // fixed-point representation can scale
    if decimals > 38 {
      return Err(Error::UnsupportedDecimals(decimals));
    }
    Ok(decimals as u8)
  }

  /// Name, symbol and decimals fetched concurrently.
  pub async fn metadata(&self) -> Result<TokenInfo, Error> {
    let (name, symbol, decimals) = try_join!(
      self.read_str(abi::NAME),
      self.read_str(abi::SYMBOL),
      self.decimals(),
    )?;
    Ok(TokenInfo {
      address: self.address,
      symbol,
      name,
      decimals,
    })
  }

  pub async fn balance_of(&self, account: Address) -> Result<Amount, Error> {
    let decimals = self.decimals().await?;
    let values = self
      .provider
      .call(
        Call::new(self.address, abi::BALANCE_OF)
          .arg(Value::Address(account)),
      )
      .await?;
    let mut decoder = Decoder::new(&values);
    let raw = decoder.uint()?;
    decoder.finish()?;
    Ok(Amount::from_raw(raw, decimals))
  }

  pub async fn allowance(
    &self,
    owner: Address,
    spender: Address,
  ) -> Result<Amount, Error> {
    let decimals = self.decimals().await?;
    let values = self
      .provider
      .call(
        Call::new(self.address, abi::ALLOWANCE)
          .arg(Value::Address(owner))
          .arg(Value::Address(spender)),
      )
      .await?;
    let mut decoder = Decoder::new(&values);
    let raw = decoder.uint()?;
    decoder.finish()?;
    Ok(Amount::from_raw(raw, decimals))
  }

  pub async fn approve(
    &self,
    spender: Address,
    amount: Amount,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    let hash = self
      .provider
      .send_transaction(
        Call::new(self.address, abi::APPROVE)
          .arg(Value::Address(spender))
          .arg(Value::Uint(amount.raw()))
          .from(sender),
      )
      .await?;
    Ok(PendingTransaction::new(hash, self.provider.clone(), self.poll))
  }

  pub async fn transfer(
    &self,
    to: Address,
    amount: Amount,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    let hash = self
      .provider
      .send_transaction(
        Call::new(self.address, abi::TRANSFER)
          .arg(Value::Address(to))
          .arg(Value::Uint(amount.raw()))
          .from(sender),
      )
      .await?;
    Ok(PendingTransaction::new(hash, self.provider.clone(), self.poll))
  }
}
