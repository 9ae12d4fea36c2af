use {
  crate::{
    abi::oracle as oracle_abi,
    anchor::{AnchorEvent, AnchorTokenContract},
    config::{fallback_collateral_tokens, Config, NATIVE_DECIMALS},
    erc20::Erc20Contract,
    provider::Provider,
    savings::{SavingsEvent, SavingsGroupContract},
    Error,
  },
  coincircle_primitives::{
    ActivityItem,
    ActivityKind,
    Address,
    Amount,
    AnchorParameters,
    Call,
    Decoder,
    TokenInfo,
    UserStats,
    Value,
  },
  futures::future::join_all,
  std::{collections::HashMap, sync::Arc},
  tracing::warn,
};

/// Computes display-ready aggregates from raw contract reads.
///
/// This is a stateless read/transform pipeline invoked on demand or on
/// a timer. Every external call is wrapped; the aggregate reads prefer
/// degraded or empty results over errors so the dashboard never blocks
/// on a single failed sub-fetch. The one exception is
/// [`anchor_parameters`](Self::anchor_parameters), which intentionally
/// surfaces failure.
pub struct ChainDataService {
  provider: Arc<dyn Provider>,
  config: Config,
  anchor: Option<AnchorTokenContract>,
  savings: Option<SavingsGroupContract>,
}

impl ChainDataService {
  pub fn new(provider: Arc<dyn Provider>, config: Config) -> Self {
    Self {
      provider,
      config,
      anchor: None,
      savings: None,
    }
  }

  pub fn set_anchor_contract(&mut self, contract: AnchorTokenContract) {
    self.anchor = Some(contract);
  }

  pub fn set_savings_contract(&mut self, contract: SavingsGroupContract) {
    self.savings = Some(contract);
  }

  fn anchor(&self) -> Result<&AnchorTokenContract, Error> {
    self
      .anchor
      .as_ref()
      .ok_or(Error::ContractNotInitialized("anchor token"))
  }

  /// The list of collateral tokens accepted by the anchor contract,
  /// with metadata. A single token's failed metadata fetch degrades to
  /// a placeholder entry; a failed (or impossible) list fetch degrades
  /// to the hard-coded list for the configured network.
  pub async fn supported_collateral_tokens(&self) -> Vec<TokenInfo> {
    let addresses = match self.anchor() {
      Ok(anchor) => match anchor.supported_collaterals().await {
        Ok(addresses) => addresses,
        Err(e) => {
          warn!("failed to fetch supported collaterals: {e}");
          return fallback_collateral_tokens(&self.config.network);
        }
      },
      Err(e) => {
        warn!("{e}, using fallback collateral list");
        return fallback_collateral_tokens(&self.config.network);
      }
    };

    join_all(addresses.into_iter().map(|address| async move {
      match self.token_metadata(address).await {
        Ok(info) => info,
        Err(e) => {
          warn!("failed to fetch metadata for token {address}: {e}");
          TokenInfo::placeholder(address)
        }
      }
    }))
    .await
  }

  async fn token_metadata(&self, address: Address) -> Result<TokenInfo, Error> {
    Erc20Contract::new(
      self.provider.clone(),
      address,
      self.config.limits.confirmation_poll,
    )?
    .metadata()
    .await
  }

  /// Per-user dashboard aggregates. Never fails: any error yields the
  /// zeroed stats object so the dashboard renders regardless.
  pub async fn user_stats(&self, user: Address) -> UserStats {
    match self.try_user_stats(user).await {
      Ok(stats) => stats,
      Err(e) => {
        warn!("failed to compute stats for {user}: {e}");
        UserStats::default()
      }
    }
  }

  async fn try_user_stats(&self, user: Address) -> Result<UserStats, Error> {
    let anchor = self.anchor()?;
    let (collateral, debt) = futures::try_join!(
      anchor.collateral_balance(user),
      anchor.debt_balance(user),
    )?;

    let mut active_groups = 0;
    let mut pending_payouts = 0;
    if let Some(savings) = &self.savings {
      for group in savings.all_groups(self.config.limits.max_groups).await {
        if !group.is_member(&user) {
          continue;
        }
        if group.is_active() {
          active_groups += 1;
        }
        if group.payout_pending_for(&user) {
          pending_payouts += 1;
        }
      }
    }

    Ok(UserStats {
      total_contributed: collateral.to_f64(),
      total_received: debt.to_f64(),
      active_groups,
      pending_payouts,
    })
  }

  /// The user's recent on-chain activity, reconstructed from event
  /// logs in a bounded window below the chain head. Sorted newest
  /// first, capped at the configured item limit. Never fails: any
  /// error yields an empty feed.
  pub async fn user_activity(&self, user: Address) -> Vec<ActivityItem> {
    match self.try_user_activity(user).await {
      Ok(items) => items,
      Err(e) => {
        warn!("failed to fetch activity for {user}: {e}");
        vec![]
      }
    }
  }

  async fn try_user_activity(
    &self,
    user: Address,
  ) -> Result<Vec<ActivityItem>, Error> {
    let head = self.provider.block_number().await?;
    let from = head.saturating_sub(self.config.limits.activity_block_window);

    let mut items = Vec::new();

    for log in self.anchor()?.events(from, head).await? {
      let item = match log.event {
        AnchorEvent::Mint { account, amount } if account == user => {
          ActivityItem {
            kind: ActivityKind::Mint,
            title: "cAnchor Minted".into(),
            description: format!("You minted {amount} cAnchor tokens"),
            amount: Some(amount),
            timestamp: log.timestamp,
            tx_hash: Some(log.tx_hash),
          }
        }
        AnchorEvent::Burn { account, amount } if account == user => {
          ActivityItem {
            kind: ActivityKind::Burn,
            title: "cAnchor Burned".into(),
            description: format!("You burned {amount} cAnchor tokens"),
            amount: Some(amount),
            timestamp: log.timestamp,
            tx_hash: Some(log.tx_hash),
          }
        }
        AnchorEvent::Transfer { from, value, .. } if from == user => {
          ActivityItem {
            kind: ActivityKind::Transfer,
            title: "cAnchor Transferred".into(),
            description: format!("You transferred {value} cAnchor tokens"),
            amount: Some(value),
            timestamp: log.timestamp,
            tx_hash: Some(log.tx_hash),
          }
        }
        _ => continue,
      };
      items.push(item);
    }

    if let Some(savings) = &self.savings {
      for log in savings.events(from, head).await? {
        let item = match log.event {
          SavingsEvent::Created { group, creator } if creator == user => {
            ActivityItem {
              kind: ActivityKind::GroupCreated,
              title: "Group Created".into(),
              description: format!("You created group #{group}"),
              amount: None,
              timestamp: log.timestamp,
              tx_hash: Some(log.tx_hash),
            }
          }
          SavingsEvent::Joined { group, member } if member == user => {
            ActivityItem {
              kind: ActivityKind::GroupJoined,
              title: "Group Joined".into(),
              description: format!("You joined group #{group}"),
              amount: None,
              timestamp: log.timestamp,
              tx_hash: Some(log.tx_hash),
            }
          }
          SavingsEvent::Contribution { group, member, round }
            if member == user =>
          {
            ActivityItem {
              kind: ActivityKind::Contribution,
              title: "Contribution Made".into(),
              description: format!(
                "You contributed to group #{group} in round {round}"
              ),
              amount: None,
              timestamp: log.timestamp,
              tx_hash: Some(log.tx_hash),
            }
          }
          SavingsEvent::Payout { group, beneficiary, round }
            if beneficiary == user =>
          {
            ActivityItem {
              kind: ActivityKind::Payout,
              title: "Payout Received".into(),
              description: format!(
                "You received the round {round} payout of group #{group}"
              ),
              amount: None,
              timestamp: log.timestamp,
              tx_hash: Some(log.tx_hash),
            }
          }
          _ => continue,
        };
        items.push(item);
      }
    }

    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(self.config.limits.activity_limit);
    Ok(items)
  }

  /// Protocol-level figures of the anchor token. Propagates failure.
  pub async fn anchor_parameters(&self) -> Result<AnchorParameters, Error> {
    self.anchor()?.parameters().await
  }

  /// Oracle prices for a set of tokens. A single failed lookup
  /// defaults that token to 1.0 (the stablecoin assumption); a failed
  /// oracle discovery yields an empty map.
  pub async fn token_prices(
    &self,
    tokens: &[Address],
  ) -> HashMap<Address, Amount> {
    let oracle = match self.resolve_oracle().await {
      Ok(oracle) => oracle,
      Err(e) => {
        warn!("failed to resolve price oracle: {e}");
        return HashMap::new();
      }
    };

    let one =
      Amount::from_raw(10u128.pow(NATIVE_DECIMALS as u32), NATIVE_DECIMALS);
    join_all(tokens.iter().map(|&token| {
      async move {
        match self.oracle_price(oracle, token).await {
          Ok(price) => (token, price),
          Err(e) => {
            warn!("failed to fetch price for token {token}: {e}");
            (token, one)
          }
        }
      }
    }))
    .await
    .into_iter()
    .collect()
  }

  async fn resolve_oracle(&self) -> Result<Address, Error> {
    self.anchor()?.price_oracle().await
  }

  async fn oracle_price(
    &self,
    oracle: Address,
    token: Address,
  ) -> Result<Amount, Error> {
    let values = self
      .provider
      .call(
        Call::new(oracle, oracle_abi::GET_PRICE).arg(Value::Address(token)),
      )
      .await?;
    let mut decoder = Decoder::new(&values);
    let raw = decoder.uint()?;
    decoder.finish()?;
    Ok(Amount::from_raw(raw, NATIVE_DECIMALS))
  }
}
