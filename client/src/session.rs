use {
  crate::{
    anchor::AnchorTokenContract,
    config::{Config, NATIVE_DECIMALS},
    data::ChainDataService,
    erc20::Erc20Contract,
    provider::{Provider, ProviderError, WalletEvent},
    savings::SavingsGroupContract,
    Error,
  },
  coincircle_primitives::{
    Address,
    Amount,
    Group,
    GroupId,
    PayoutPolicy,
    Receipt,
  },
  dashmap::DashMap,
  futures::StreamExt,
  parking_lot::{Mutex, RwLock},
  std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
  },
  tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
  },
  tracing::{info, warn},
};

/// Registry of in-flight transactions.
///
/// Each action acquires its own token for the duration of the
/// submit-and-confirm sequence, so one action finishing can never
/// clear the pending indication while another is still in flight.
#[derive(Default)]
struct TxTracker {
  inflight: DashMap<u64, &'static str>,
  next: AtomicU64,
}

impl TxTracker {
  fn begin(self: &Arc<Self>, action: &'static str) -> PendingToken {
    let id = self.next.fetch_add(1, Ordering::Relaxed);
    self.inflight.insert(id, action);
    PendingToken {
      id,
      tracker: self.clone(),
    }
  }

  fn is_pending(&self) -> bool {
    !self.inflight.is_empty()
  }
}

/// Released on every exit path, including panics and early returns.
struct PendingToken {
  id: u64,
  tracker: Arc<TxTracker>,
}

impl Drop for PendingToken {
  fn drop(&mut self) {
    self.tracker.inflight.remove(&self.id);
  }
}

#[derive(Default)]
struct SessionState {
  account: Option<Address>,
  native_balance: Option<Amount>,
  anchor_balance: Option<Amount>,
  collateral_balance: Option<Amount>,
  debt_balance: Option<Amount>,
  token_balance: Option<Amount>,
  savings: Option<SavingsGroupContract>,
  anchor: Option<AnchorTokenContract>,
  token: Option<Erc20Contract>,
}

/// Owns the wallet connection and its derived contract bindings for
/// the lifetime of a page session.
///
/// Action methods submit a transaction, await its confirmation, and
/// only then refresh cached state, in that order. Concurrent actions
/// are supported; each carries its own pending token.
pub struct Session {
  provider: Arc<dyn Provider>,
  config: Config,
  state: Arc<RwLock<SessionState>>,
  tracker: Arc<TxTracker>,
  tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
  pub fn new(provider: Arc<dyn Provider>, config: Config) -> Self {
    Self {
      provider,
      config,
      state: Arc::new(RwLock::new(SessionState::default())),
      tracker: Arc::new(TxTracker::default()),
      tasks: Mutex::new(vec![]),
    }
  }

  /// Requests account access, reads the native balance, instantiates
  /// the contract bindings and starts the wallet-event listener and
  /// the periodic balance refresh. A missing wallet provider is fatal;
  /// a misconfigured contract address is logged and leaves that
  /// binding absent.
  pub async fn connect(&self) -> Result<Address, Error> {
    let accounts =
      self.provider.request_accounts().await.map_err(|e| match e {
        ProviderError::Unavailable => Error::WalletUnavailable,
        other => Error::Provider(other),
      })?;
    let account = *accounts.first().ok_or(Error::NoAccounts)?;

    let native_balance = self.provider.native_balance(account).await?;

    let poll = self.config.limits.confirmation_poll;
    let savings = SavingsGroupContract::new(
      self.provider.clone(),
      self.config.contracts.savings,
      poll,
    )
    .map_err(|e| warn!("savings group binding unavailable: {e}"))
    .ok();
    let anchor = AnchorTokenContract::new(
      self.provider.clone(),
      self.config.contracts.anchor,
      poll,
    )
    .map_err(|e| warn!("anchor token binding unavailable: {e}"))
    .ok();

    // no state guard may live across an await
    let refresh = anchor.clone();
    {
      let mut state = self.state.write();
      *state = SessionState {
        account: Some(account),
        native_balance: Some(native_balance),
        savings,
        anchor,
        ..SessionState::default()
      };
    }

    if let Some(anchor) = refresh {
      refresh_anchor_balances(&anchor, account, &self.state).await;
    }

    self.restart_tasks();
    info!("connected as {account}");
    Ok(account)
  }

  /// Resets all session state to its initial empty values. Revokes
  /// nothing on chain.
  pub fn disconnect(&self) {
    self.abort_tasks();
    *self.state.write() = SessionState::default();
    info!("session disconnected");
  }

  fn restart_tasks(&self) {
    self.abort_tasks();
    let mut tasks = self.tasks.lock();
    tasks.push(tokio::spawn(watch_wallet(
      self.provider.clone(),
      self.state.clone(),
    )));
    tasks.push(tokio::spawn(refresh_loop(
      self.provider.clone(),
      self.state.clone(),
      self.config.limits.refresh_interval,
    )));
  }

  fn abort_tasks(&self) {
    for task in self.tasks.lock().drain(..) {
      task.abort();
    }
  }

  pub fn is_connected(&self) -> bool {
    self.state.read().account.is_some()
  }

  pub fn account(&self) -> Option<Address> {
    self.state.read().account
  }

  pub fn native_balance(&self) -> Option<Amount> {
    self.state.read().native_balance
  }

  pub fn anchor_balance(&self) -> Option<Amount> {
    self.state.read().anchor_balance
  }

  pub fn collateral_balance(&self) -> Option<Amount> {
    self.state.read().collateral_balance
  }

  pub fn debt_balance(&self) -> Option<Amount> {
    self.state.read().debt_balance
  }

  /// True while any action's submit-and-confirm sequence is running.
  pub fn is_transaction_pending(&self) -> bool {
    self.tracker.is_pending()
  }

  /// An aggregation service wired to this session's provider and
  /// contract bindings.
  pub fn data_service(&self) -> ChainDataService {
    let mut service =
      ChainDataService::new(self.provider.clone(), self.config.clone());
    let state = self.state.read();
    if let Some(anchor) = &state.anchor {
      service.set_anchor_contract(anchor.clone());
    }
    if let Some(savings) = &state.savings {
      service.set_savings_contract(savings.clone());
    }
    service
  }

  fn required_account(&self) -> Result<Address, Error> {
    self.state.read().account.ok_or(Error::NotConnected)
  }

  fn savings_contract(&self) -> Result<SavingsGroupContract, Error> {
    self
      .state
      .read()
      .savings
      .clone()
      .ok_or(Error::ContractNotInitialized("savings group"))
  }

  fn anchor_contract(&self) -> Result<AnchorTokenContract, Error> {
    self
      .state
      .read()
      .anchor
      .clone()
      .ok_or(Error::ContractNotInitialized("anchor token"))
  }

  pub async fn create_group(
    &self,
    contribution_amount: &str,
    round_duration_days: u64,
    group_size: u64,
    token: Address,
    payout_policy: PayoutPolicy,
  ) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let savings = self.savings_contract()?;
    let amount = Amount::parse(contribution_amount, NATIVE_DECIMALS)?;

    let _pending = self.tracker.begin("createGroup");
    let tx = savings
      .create_group(
        amount,
        round_duration_days,
        group_size,
        token,
        payout_policy,
        account,
      )
      .await?;
    tx.wait(self.config.limits.confirmation_timeout).await
  }

  pub async fn join_group(&self, id: GroupId) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let savings = self.savings_contract()?;

    let _pending = self.tracker.begin("joinGroup");
    let tx = savings.join_group(id, account).await?;
    tx.wait(self.config.limits.confirmation_timeout).await
  }

  pub async fn contribute(&self, id: GroupId) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let savings = self.savings_contract()?;

    let _pending = self.tracker.begin("contribute");
    let tx = savings.contribute(id, account).await?;
    tx.wait(self.config.limits.confirmation_timeout).await
  }

  pub async fn trigger_payout(&self, id: GroupId) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let savings = self.savings_contract()?;

    let _pending = self.tracker.begin("triggerPayout");
    let tx = savings.trigger_payout(id, account).await?;
    tx.wait(self.config.limits.confirmation_timeout).await
  }

  pub async fn withdraw(&self, id: GroupId) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let savings = self.savings_contract()?;

    let _pending = self.tracker.begin("withdraw");
    let tx = savings.withdraw(id, account).await?;
    tx.wait(self.config.limits.confirmation_timeout).await
  }

  /// Deposits collateral and mints anchor tokens, then refreshes the
  /// cached balances.
  pub async fn mint_anchor(
    &self,
    collateral_token: Address,
    collateral_amount: &str,
    mint_amount: &str,
  ) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let anchor = self.anchor_contract()?;
    let collateral = Amount::parse(collateral_amount, NATIVE_DECIMALS)?;
    let minted = Amount::parse(mint_amount, NATIVE_DECIMALS)?;

    let _pending = self.tracker.begin("mint");
    let tx = anchor.mint(collateral_token, collateral, minted, account).await?;
    let receipt = tx.wait(self.config.limits.confirmation_timeout).await?;

    refresh_anchor_balances(&anchor, account, &self.state).await;
    Ok(receipt)
  }

  /// Burns anchor tokens, then refreshes the cached balances.
  pub async fn burn_anchor(&self, amount: &str) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let anchor = self.anchor_contract()?;
    let amount = Amount::parse(amount, NATIVE_DECIMALS)?;

    let _pending = self.tracker.begin("burn");
    let tx = anchor.burn(amount, account).await?;
    let receipt = tx.wait(self.config.limits.confirmation_timeout).await?;

    refresh_anchor_balances(&anchor, account, &self.state).await;
    Ok(receipt)
  }

  /// Transfers anchor tokens, then refreshes the cached balances.
  pub async fn transfer_anchor(
    &self,
    to: Address,
    amount: &str,
  ) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let anchor = self.anchor_contract()?;
    let amount = Amount::parse(amount, NATIVE_DECIMALS)?;

    let _pending = self.tracker.begin("transfer");
    let tx = anchor.transfer(to, amount, account).await?;
    let receipt = tx.wait(self.config.limits.confirmation_timeout).await?;

    refresh_anchor_balances(&anchor, account, &self.state).await;
    Ok(receipt)
  }

  /// Selects the token used for contribution approvals and reads the
  /// user's balance of it.
  pub async fn select_token(&self, address: Address) -> Result<Amount, Error> {
    let account = self.required_account()?;
    let token = Erc20Contract::new(
      self.provider.clone(),
      address,
      self.config.limits.confirmation_poll,
    )?;
    let balance = token.balance_of(account).await?;

    let mut state = self.state.write();
    state.token = Some(token);
    state.token_balance = Some(balance);
    Ok(balance)
  }

  /// Approves the savings group contract (or any spender) to pull the
  /// selected token.
  pub async fn approve_tokens(
    &self,
    spender: Address,
    amount: &str,
  ) -> Result<Receipt, Error> {
    let account = self.required_account()?;
    let token = self
      .state
      .read()
      .token
      .clone()
      .ok_or(Error::ContractNotInitialized("token"))?;
    let amount = Amount::parse(amount, NATIVE_DECIMALS)?;

    let _pending = self.tracker.begin("approve");
    let tx = token.approve(spender, amount, account).await?;
    tx.wait(self.config.limits.confirmation_timeout).await
  }

  /// Cached balance of the selected token, refreshed on demand.
  pub async fn token_balance(&self) -> Result<Amount, Error> {
    let account = self.required_account()?;
    let token = match self.state.read().token.clone() {
      Some(token) => token,
      None => return Ok(Amount::zero(NATIVE_DECIMALS)),
    };
    let balance = token.balance_of(account).await?;
    self.state.write().token_balance = Some(balance);
    Ok(balance)
  }

  pub async fn group_info(&self, id: GroupId) -> Result<Group, Error> {
    self.savings_contract()?.group_info(id).await
  }

  pub async fn all_groups(&self) -> Result<Vec<Group>, Error> {
    let savings = self.savings_contract()?;
    Ok(savings.all_groups(self.config.limits.max_groups).await)
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    self.abort_tasks();
  }
}

/// Re-reads balances after a confirmed token operation or on the
/// periodic refresh. Read failures keep the previous cached values.
async fn refresh_anchor_balances(
  anchor: &AnchorTokenContract,
  account: Address,
  state: &Arc<RwLock<SessionState>>,
) {
  match futures::try_join!(
    anchor.balance_of(account),
    anchor.collateral_balance(account),
    anchor.debt_balance(account),
  ) {
    Ok((balance, collateral, debt)) => {
      let mut state = state.write();
      state.anchor_balance = Some(balance);
      state.collateral_balance = Some(collateral);
      state.debt_balance = Some(debt);
    }
    Err(e) => warn!("failed to refresh anchor balances: {e}"),
  }
}

/// Consumes the wallet notification stream. An empty account set or a
/// chain switch resets the session; a new account becomes the active
/// one.
async fn watch_wallet(
  provider: Arc<dyn Provider>,
  state: Arc<RwLock<SessionState>>,
) {
  let mut events = provider.subscribe();
  while let Some(event) = events.next().await {
    match event {
      WalletEvent::AccountsChanged(accounts) => match accounts.first() {
        Some(&account) => {
          info!("active account changed to {account}");
          state.write().account = Some(account);
          match provider.native_balance(account).await {
            Ok(balance) => state.write().native_balance = Some(balance),
            Err(e) => warn!("failed to read balance of {account}: {e}"),
          }
        }
        None => {
          warn!("wallet revoked account access, resetting session");
          *state.write() = SessionState::default();
        }
      },
      WalletEvent::ChainChanged(chain_id) => {
        warn!("wallet switched to chain {chain_id}, resetting session");
        *state.write() = SessionState::default();
      }
    }
  }
}

/// Periodic balance refresh while connected. Skips ticks while
/// disconnected; torn down by [`Session::disconnect`] or drop.
async fn refresh_loop(
  provider: Arc<dyn Provider>,
  state: Arc<RwLock<SessionState>>,
  period: std::time::Duration,
) {
  let mut ticks = interval(period);
  ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
  loop {
    ticks.tick().await;

    let (account, anchor, token) = {
      let state = state.read();
      (state.account, state.anchor.clone(), state.token.clone())
    };
    let Some(account) = account else { continue };

    match provider.native_balance(account).await {
      Ok(balance) => state.write().native_balance = Some(balance),
      Err(e) => warn!("failed to refresh native balance: {e}"),
    }
    if let Some(anchor) = anchor {
      refresh_anchor_balances(&anchor, account, &state).await;
    }
    if let Some(token) = token {
      match token.balance_of(account).await {
        Ok(balance) => state.write().token_balance = Some(balance),
        Err(e) => warn!("failed to refresh token balance: {e}"),
      }
    }
  }
}
