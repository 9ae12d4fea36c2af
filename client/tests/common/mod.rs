//! In-memory chain shared by the integration tests. Implements the
//! `Provider` seam with programmable per-method failures so tests can
//! exercise the degraded paths without a real wallet or node.

use {
  coincircle_client::{
    primitives::{
      Address,
      Amount,
      Call,
      Group,
      GroupId,
      LogEntry,
      LogFilter,
      PayoutPolicy,
      Receipt,
      TxHash,
      Value,
    },
    Config,
    Limits,
    Provider,
    ProviderError,
    WalletEvent,
  },
  futures::{
    channel::mpsc::{unbounded, UnboundedSender},
    future::BoxFuture,
    stream::BoxStream,
    StreamExt,
  },
  parking_lot::Mutex,
  std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
  },
};

pub const DECIMALS: u8 = 18;

pub fn addr(byte: u8) -> Address {
  Address::new([byte; 20])
}

pub fn amount(s: &str) -> Amount {
  Amount::parse(s, DECIMALS).unwrap()
}

/// The wallet account the mock exposes by default.
pub fn user() -> Address {
  addr(0xAA)
}

pub const SAVINGS: Address = Address::new([0x51; 20]);
pub const ANCHOR: Address = Address::new([0x52; 20]);
pub const ORACLE: Address = Address::new([0x53; 20]);

#[derive(Default)]
struct Inner {
  accounts: Vec<Address>,
  block_number: u64,
  native: HashMap<Address, u128>,
  // anchor token state
  balances: HashMap<Address, u128>,
  collateral: HashMap<Address, u128>,
  debt: HashMap<Address, u128>,
  supported: Vec<Address>,
  target_price: u128,
  min_collateral_ratio: u128,
  liquidation_ratio: u128,
  stability_fee: u128,
  total_collateral_value: u128,
  total_supply: u128,
  prices: HashMap<Address, u128>,
  // erc20 metadata and balances per token contract
  tokens: HashMap<Address, (String, String, u8)>,
  token_balances: HashMap<(Address, Address), u128>,
  // savings groups
  groups: Vec<Group>,
  broken_groups: HashSet<u64>,
  // event logs
  logs: Vec<LogEntry>,
  // failure injection, keyed by method name or "method:contract"
  fail: HashSet<String>,
  revert: HashSet<String>,
  defer_receipts: bool,
  receipts: HashMap<TxHash, Receipt>,
  deferred: Vec<(String, TxHash, Receipt)>,
  next_tx: u64,
}

pub struct MockChain {
  inner: Mutex<Inner>,
  subscribers: Mutex<Vec<UnboundedSender<WalletEvent>>>,
}

impl MockChain {
  pub fn new() -> Arc<Self> {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();

    let mut inner = Inner {
      accounts: vec![user()],
      block_number: 20_000,
      ..Inner::default()
    };
    inner.native.insert(user(), amount("100").raw());
    Arc::new(Self {
      inner: Mutex::new(inner),
      subscribers: Mutex::new(vec![]),
    })
  }

  /// Configuration pointing at the mock contracts, with fast timers.
  pub fn config() -> Config {
    let mut config = Config::default();
    config.contracts.savings = SAVINGS;
    config.contracts.anchor = ANCHOR;
    config.limits = Limits {
      refresh_interval: Duration::from_millis(50),
      confirmation_timeout: Duration::from_millis(500),
      confirmation_poll: Duration::from_millis(5),
      ..Limits::default()
    };
    config
  }

  pub fn set_accounts(&self, accounts: Vec<Address>) {
    self.inner.lock().accounts = accounts;
  }

  pub fn set_native_balance(&self, account: Address, balance: Amount) {
    self.inner.lock().native.insert(account, balance.raw());
  }

  pub fn set_token_balance(
    &self,
    token: Address,
    account: Address,
    balance: Amount,
  ) {
    self
      .inner
      .lock()
      .token_balances
      .insert((token, account), balance.raw());
  }

  pub fn fail(&self, key: &str) {
    self.inner.lock().fail.insert(key.into());
  }

  pub fn revert(&self, method: &str) {
    self.inner.lock().revert.insert(method.into());
  }

  /// Submitted transactions stay unconfirmed until
  /// [`confirm`](Self::confirm) releases them.
  pub fn defer_receipts(&self) {
    self.inner.lock().defer_receipts = true;
  }

  /// Confirms the oldest deferred transaction submitted through the
  /// given method. Keyed by method so tests stay independent of task
  /// scheduling order.
  pub fn confirm(&self, method: &str) {
    let mut inner = self.inner.lock();
    if let Some(pos) =
      inner.deferred.iter().position(|(m, ..)| m == method)
    {
      let (_, hash, receipt) = inner.deferred.remove(pos);
      inner.receipts.insert(hash, receipt);
    }
  }

  pub fn seed_group(&self, group: Group) {
    self.inner.lock().groups.push(group);
  }

  pub fn break_group(&self, id: u64) {
    self.inner.lock().broken_groups.insert(id);
  }

  pub fn set_supported_collaterals(&self, tokens: Vec<Address>) {
    self.inner.lock().supported = tokens;
  }

  pub fn add_token(&self, address: Address, name: &str, symbol: &str) {
    self.add_token_with_decimals(address, name, symbol, DECIMALS);
  }

  pub fn add_token_with_decimals(
    &self,
    address: Address,
    name: &str,
    symbol: &str,
    decimals: u8,
  ) {
    self
      .inner
      .lock()
      .tokens
      .insert(address, (name.into(), symbol.into(), decimals));
  }

  pub fn set_price(&self, token: Address, price: Amount) {
    let mut inner = self.inner.lock();
    inner.prices.insert(token, price.raw());
    inner.supported.push(token);
  }

  pub fn set_oracle_defaults(&self) {
    let mut inner = self.inner.lock();
    inner.target_price = amount("1").raw();
    inner.min_collateral_ratio = 150;
    inner.liquidation_ratio = 120;
    inner.stability_fee = 2;
    inner.total_collateral_value = amount("1000000").raw();
    inner.total_supply = amount("500000").raw();
  }

  pub fn set_anchor_balances(
    &self,
    account: Address,
    balance: Amount,
    collateral: Amount,
    debt: Amount,
  ) {
    let mut inner = self.inner.lock();
    inner.balances.insert(account, balance.raw());
    inner.collateral.insert(account, collateral.raw());
    inner.debt.insert(account, debt.raw());
  }

  /// Appends an event log at the given block height and timestamp.
  pub fn push_log(
    &self,
    contract: Address,
    event: &str,
    params: Vec<Value>,
    block_number: u64,
    timestamp: u64,
  ) {
    let mut inner = self.inner.lock();
    let hash = next_hash(&mut inner);
    inner.logs.push(LogEntry {
      contract,
      event: event.into(),
      params,
      block_number,
      timestamp,
      tx_hash: hash,
    });
  }

  pub fn push_event(&self, event: WalletEvent) {
    self
      .subscribers
      .lock()
      .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
  }

  fn failing(inner: &Inner, method: &str, to: Address) -> bool {
    inner.fail.contains(method)
      || inner.fail.contains(&format!("{method}:{to}"))
  }

  fn dispatch_call(&self, call: &Call) -> Result<Vec<Value>, ProviderError> {
    let inner = self.inner.lock();
    if Self::failing(&inner, &call.method, call.to) {
      return Err(ProviderError::Transport(format!(
        "simulated failure of {}",
        call.method
      )));
    }

    let method = call.method.as_str();
    match (call.to, method) {
      (SAVINGS, "groupCounter") => {
        Ok(vec![Value::Uint(inner.groups.len() as u128)])
      }
      (SAVINGS, "getGroupInfo") => {
        let id = arg_uint(call, 0)? as u64;
        if inner.broken_groups.contains(&id) {
          return Err(ProviderError::Transport(format!(
            "simulated bad read of group {id}"
          )));
        }
        let group = inner.groups.get(id as usize).ok_or_else(|| {
          ProviderError::Reverted {
            method: method.into(),
            reason: "group does not exist".into(),
          }
        })?;
        Ok(encode_group(group))
      }
      (SAVINGS, "isMember") => {
        let id = arg_uint(call, 0)? as u64;
        let who = arg_address(call, 1)?;
        let member = inner
          .groups
          .get(id as usize)
          .map(|g| g.is_member(&who))
          .unwrap_or(false);
        Ok(vec![Value::Bool(member)])
      }
      (ANCHOR, "balanceOf") => {
        let who = arg_address(call, 0)?;
        Ok(vec![Value::Uint(
          inner.balances.get(&who).copied().unwrap_or(0),
        )])
      }
      (ANCHOR, "getUserCollateralBalance") => {
        let who = arg_address(call, 0)?;
        Ok(vec![Value::Uint(
          inner.collateral.get(&who).copied().unwrap_or(0),
        )])
      }
      (ANCHOR, "getUserDebtBalance") => {
        let who = arg_address(call, 0)?;
        Ok(vec![Value::Uint(inner.debt.get(&who).copied().unwrap_or(0))])
      }
      (ANCHOR, "getSupportedCollaterals") => {
        Ok(vec![Value::Addresses(inner.supported.clone())])
      }
      (ANCHOR, "getPriceOracle") => Ok(vec![Value::Address(ORACLE)]),
      (ANCHOR, "getTargetPrice") => Ok(vec![Value::Uint(inner.target_price)]),
      (ANCHOR, "getMinCollateralRatio") => {
        Ok(vec![Value::Uint(inner.min_collateral_ratio)])
      }
      (ANCHOR, "getLiquidationRatio") => {
        Ok(vec![Value::Uint(inner.liquidation_ratio)])
      }
      (ANCHOR, "getStabilityFee") => {
        Ok(vec![Value::Uint(inner.stability_fee)])
      }
      (ANCHOR, "getTotalCollateralValue") => {
        Ok(vec![Value::Uint(inner.total_collateral_value)])
      }
      (ANCHOR, "totalSupply") => Ok(vec![Value::Uint(inner.total_supply)]),
      (ORACLE, "getPrice") => {
        let token = arg_address(call, 0)?;
        let price = inner.prices.get(&token).copied().ok_or_else(|| {
          ProviderError::Transport(format!("no price for {token}"))
        })?;
        Ok(vec![Value::Uint(price)])
      }
      (token, "name") => {
        let (name, _, _) = token_meta(&inner, token, method)?;
        Ok(vec![Value::Str(name)])
      }
      (token, "symbol") => {
        let (_, symbol, _) = token_meta(&inner, token, method)?;
        Ok(vec![Value::Str(symbol)])
      }
      (token, "decimals") => {
        let (_, _, decimals) = token_meta(&inner, token, method)?;
        Ok(vec![Value::Uint(decimals as u128)])
      }
      (token, "balanceOf") => {
        let who = arg_address(call, 0)?;
        Ok(vec![Value::Uint(
          inner.token_balances.get(&(token, who)).copied().unwrap_or(0),
        )])
      }
      (to, method) => Err(ProviderError::Transport(format!(
        "unhandled call {method} on {to}"
      ))),
    }
  }

  fn dispatch_send(&self, call: &Call) -> Result<TxHash, ProviderError> {
    let mut inner = self.inner.lock();
    if Self::failing(&inner, &call.method, call.to) {
      return Err(ProviderError::Transport(format!(
        "simulated failure of {}",
        call.method
      )));
    }

    let sender = call.sender.unwrap_or_else(user);
    match call.method.as_str() {
      "createGroup" => {
        let id = inner.groups.len() as u64;
        let group = Group {
          id: GroupId(id),
          creator: sender,
          token: arg_address(call, 3)?,
          contribution_amount: Amount::from_raw(arg_uint(call, 0)?, DECIMALS),
          round_duration_days: arg_uint(call, 1)? as u64,
          group_size: arg_uint(call, 2)? as u64,
          payout_policy: arg_str(call, 4)?
            .parse()
            .map_err(|_| ProviderError::Reverted {
              method: call.method.clone(),
              reason: "bad payout policy".into(),
            })?,
          current_round: 0,
          started: false,
          completed: false,
          members: vec![sender],
        };
        inner.groups.push(group);
      }
      "joinGroup" => {
        let id = arg_uint(call, 0)? as usize;
        if let Some(group) = inner.groups.get_mut(id) {
          group.members.push(sender);
        }
      }
      "mint" => {
        let collateral = arg_uint(call, 1)?;
        let minted = arg_uint(call, 2)?;
        *inner.balances.entry(sender).or_default() += minted;
        *inner.collateral.entry(sender).or_default() += collateral;
        *inner.debt.entry(sender).or_default() += minted;
      }
      "burn" => {
        let burned = arg_uint(call, 0)?;
        let balance = inner.balances.entry(sender).or_default();
        *balance = balance.saturating_sub(burned);
        let debt = inner.debt.entry(sender).or_default();
        *debt = debt.saturating_sub(burned);
      }
      // contribute, triggerPayout, withdraw, approve, transfer: the
      // on-chain effects are irrelevant to these tests
      _ => {}
    }

    let hash = next_hash(&mut inner);
    let receipt = Receipt {
      tx_hash: hash,
      block_number: inner.block_number,
      success: !inner.revert.contains(&call.method),
    };
    if inner.defer_receipts {
      inner.deferred.push((call.method.clone(), hash, receipt));
    } else {
      inner.receipts.insert(hash, receipt);
    }
    Ok(hash)
  }
}

impl Provider for MockChain {
  fn request_accounts(
    &self,
  ) -> BoxFuture<'_, Result<Vec<Address>, ProviderError>> {
    Box::pin(async move {
      let inner = self.inner.lock();
      if inner.fail.contains("requestAccounts") {
        return Err(ProviderError::Unavailable);
      }
      Ok(inner.accounts.clone())
    })
  }

  fn chain_id(&self) -> BoxFuture<'_, Result<u64, ProviderError>> {
    Box::pin(async move { Ok(44787) })
  }

  fn block_number(&self) -> BoxFuture<'_, Result<u64, ProviderError>> {
    Box::pin(async move {
      let inner = self.inner.lock();
      if inner.fail.contains("blockNumber") {
        return Err(ProviderError::Transport("simulated failure".into()));
      }
      Ok(inner.block_number)
    })
  }

  fn native_balance(
    &self,
    address: Address,
  ) -> BoxFuture<'_, Result<Amount, ProviderError>> {
    Box::pin(async move {
      let inner = self.inner.lock();
      if inner.fail.contains("nativeBalance") {
        return Err(ProviderError::Transport("simulated failure".into()));
      }
      Ok(Amount::from_raw(
        inner.native.get(&address).copied().unwrap_or(0),
        DECIMALS,
      ))
    })
  }

  fn call(
    &self,
    call: Call,
  ) -> BoxFuture<'_, Result<Vec<Value>, ProviderError>> {
    Box::pin(async move { self.dispatch_call(&call) })
  }

  fn send_transaction(
    &self,
    call: Call,
  ) -> BoxFuture<'_, Result<TxHash, ProviderError>> {
    Box::pin(async move { self.dispatch_send(&call) })
  }

  fn transaction_receipt(
    &self,
    hash: TxHash,
  ) -> BoxFuture<'_, Result<Option<Receipt>, ProviderError>> {
    Box::pin(async move {
      Ok(self.inner.lock().receipts.get(&hash).cloned())
    })
  }

  fn logs(
    &self,
    filter: LogFilter,
  ) -> BoxFuture<'_, Result<Vec<LogEntry>, ProviderError>> {
    Box::pin(async move {
      let inner = self.inner.lock();
      if inner.fail.contains("getLogs") {
        return Err(ProviderError::Transport("simulated failure".into()));
      }
      Ok(
        inner
          .logs
          .iter()
          .filter(|log| {
            log.contract == filter.contract
              && filter.events.contains(&log.event)
              && log.block_number >= filter.from_block
              && log.block_number <= filter.to_block
          })
          .cloned()
          .collect(),
      )
    })
  }

  fn subscribe(&self) -> BoxStream<'static, WalletEvent> {
    let (tx, rx) = unbounded();
    self.subscribers.lock().push(tx);
    rx.boxed()
  }
}

fn next_hash(inner: &mut Inner) -> TxHash {
  inner.next_tx += 1;
  let mut bytes = [0u8; 32];
  bytes[..8].copy_from_slice(&inner.next_tx.to_be_bytes());
  TxHash(bytes)
}

fn token_meta(
  inner: &Inner,
  token: Address,
  method: &str,
) -> Result<(String, String, u8), ProviderError> {
  inner.tokens.get(&token).cloned().ok_or_else(|| {
    ProviderError::Reverted {
      method: method.into(),
      reason: format!("no token at {token}"),
    }
  })
}

fn arg_uint(call: &Call, index: usize) -> Result<u128, ProviderError> {
  match call.args.get(index) {
    Some(Value::Uint(v)) => Ok(*v),
    other => Err(bad_arg(call, index, other)),
  }
}

fn arg_address(call: &Call, index: usize) -> Result<Address, ProviderError> {
  match call.args.get(index) {
    Some(Value::Address(v)) => Ok(*v),
    other => Err(bad_arg(call, index, other)),
  }
}

fn arg_str(call: &Call, index: usize) -> Result<String, ProviderError> {
  match call.args.get(index) {
    Some(Value::Str(v)) => Ok(v.clone()),
    other => Err(bad_arg(call, index, other)),
  }
}

fn bad_arg(call: &Call, index: usize, arg: Option<&Value>) -> ProviderError {
  ProviderError::Reverted {
    method: call.method.clone(),
    reason: format!("unexpected argument {index}: {arg:?}"),
  }
}

fn encode_group(group: &Group) -> Vec<Value> {
  vec![
    Value::Address(group.creator),
    Value::Address(group.token),
    Value::Uint(group.contribution_amount.raw()),
    Value::Uint(group.round_duration_days as u128),
    Value::Uint(group.group_size as u128),
    Value::Str(group.payout_policy.to_string()),
    Value::Uint(group.current_round as u128),
    Value::Bool(group.started),
    Value::Bool(group.completed),
    Value::Addresses(group.members.clone()),
  ]
}

/// A started rotation group seeded directly into the mock registry.
pub fn sample_group(id: u64, members: Vec<Address>) -> Group {
  Group {
    id: GroupId(id),
    creator: members.first().copied().unwrap_or_else(user),
    token: addr(0x77),
    contribution_amount: amount("0.1"),
    round_duration_days: 30,
    group_size: 10,
    payout_policy: PayoutPolicy::Rotation,
    current_round: 0,
    started: true,
    completed: false,
    members,
  }
}
