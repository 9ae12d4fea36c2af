use {
  crate::{
    abi::savings as abi,
    config::NATIVE_DECIMALS,
    provider::{PendingTransaction, Provider, ProviderError},
    Error,
  },
  coincircle_primitives::{
    Address,
    Amount,
    Call,
    Decoder,
    Group,
    GroupId,
    LogEntry,
    LogFilter,
    PayoutPolicy,
    TxHash,
    Value,
  },
  std::{sync::Arc, time::Duration},
  tracing::warn,
};

/// A decoded group-savings contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavingsEvent {
  Created { group: GroupId, creator: Address },
  Joined { group: GroupId, member: Address },
  Contribution { group: GroupId, member: Address, round: u64 },
  Payout { group: GroupId, beneficiary: Address, round: u64 },
  Withdrawal { group: GroupId, member: Address },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavingsLog {
  pub event: SavingsEvent,
  pub block_number: u64,
  pub timestamp: u64,
  pub tx_hash: TxHash,
}

/// Typed binding for the group-savings contract. Translates between
/// application-level calls and the on-chain function signatures,
/// converting fixed-point integers to [`Amount`]s at the boundary.
#[derive(Clone)]
pub struct SavingsGroupContract {
  address: Address,
  provider: Arc<dyn Provider>,
  poll: Duration,
}

impl SavingsGroupContract {
  pub fn new(
    provider: Arc<dyn Provider>,
    address: Address,
    poll: Duration,
  ) -> Result<Self, Error> {
    if address.is_zero() {
      return Err(Error::ContractNotConfigured("savings group"));
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

  async fn submit(&self, call: Call) -> Result<PendingTransaction, Error> {
    let hash = self.provider.send_transaction(call).await?;
    Ok(PendingTransaction::new(hash, self.provider.clone(), self.poll))
  }

  /// Submits a group creation. The returned handle must be awaited
  /// before the group can be assumed to exist; there is no idempotence
  /// guarantee on resubmission.
  pub async fn create_group(
    &self,
    contribution_amount: Amount,
    round_duration_days: u64,
    group_size: u64,
    token: Address,
    payout_policy: PayoutPolicy,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    self
      .submit(
        Call::new(self.address, abi::CREATE_GROUP)
          .arg(Value::Uint(contribution_amount.raw()))
          .arg(Value::Uint(round_duration_days as u128))
          .arg(Value::Uint(group_size as u128))
          .arg(Value::Address(token))
          .arg(Value::Str(payout_policy.to_string()))
          .from(sender),
      )
      .await
  }

  pub async fn join_group(
    &self,
    id: GroupId,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    self
      .submit(
        Call::new(self.address, abi::JOIN_GROUP)
          .arg(Value::Uint(id.0 as u128))
          .from(sender),
      )
      .await
  }

  pub async fn contribute(
    &self,
    id: GroupId,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    self
      .submit(
        Call::new(self.address, abi::CONTRIBUTE)
          .arg(Value::Uint(id.0 as u128))
          .from(sender),
      )
      .await
  }

  pub async fn trigger_payout(
    &self,
    id: GroupId,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    self
      .submit(
        Call::new(self.address, abi::TRIGGER_PAYOUT)
          .arg(Value::Uint(id.0 as u128))
          .from(sender),
      )
      .await
  }

  pub async fn withdraw(
    &self,
    id: GroupId,
    sender: Address,
  ) -> Result<PendingTransaction, Error> {
    self
      .submit(
        Call::new(self.address, abi::WITHDRAW)
          .arg(Value::Uint(id.0 as u128))
          .from(sender),
      )
      .await
  }

  pub async fn group_counter(&self) -> Result<u64, Error> {
    let values = self
      .provider
      .call(Call::new(self.address, abi::GROUP_COUNTER))
      .await?;
    let mut decoder = Decoder::new(&values);
    let counter = decoder.uint()? as u64;
    decoder.finish()?;
    Ok(counter)
  }

  /// Fetches one group. An id the contract has never assigned surfaces
  /// as [`Error::UnknownGroup`].
  pub async fn group_info(&self, id: GroupId) -> Result<Group, Error> {
    let values = self
      .provider
      .call(
        Call::new(self.address, abi::GET_GROUP_INFO)
          .arg(Value::Uint(id.0 as u128)),
      )
      .await
      .map_err(|e| match e {
        ProviderError::Reverted { .. } => Error::UnknownGroup(id),
        other => Error::Provider(other),
      })?;

    let mut decoder = Decoder::new(&values);
    let group = Group {
      id,
      creator: decoder.address()?,
      token: decoder.address()?,
      contribution_amount: Amount::from_raw(decoder.uint()?, NATIVE_DECIMALS),
      round_duration_days: decoder.uint()? as u64,
      group_size: decoder.uint()? as u64,
      payout_policy: decoder.str()?.parse()?,
      current_round: decoder.uint()? as u64,
      started: decoder.bool()?,
      completed: decoder.bool()?,
      members: decoder.addresses()?,
    };
    decoder.finish()?;
    Ok(group)
  }

  pub async fn is_member(
    &self,
    id: GroupId,
    user: Address,
  ) -> Result<bool, Error> {
    let values = self
      .provider
      .call(
        Call::new(self.address, abi::IS_MEMBER)
          .arg(Value::Uint(id.0 as u128))
          .arg(Value::Address(user)),
      )
      .await?;
    let mut decoder = Decoder::new(&values);
    let member = decoder.bool()?;
    decoder.finish()?;
    Ok(member)
  }

  /// Fetches every group in `[0, min(counter, limit))`. One bad read
  /// must not fail the aggregate list: a failing individual fetch is
  /// logged and skipped, and a failing counter read degrades to an
  /// empty list.
  pub async fn all_groups(&self, limit: usize) -> Vec<Group> {
    let counter = match self.group_counter().await {
      Ok(counter) => counter,
      Err(e) => {
        warn!("failed to read group counter: {e}");
        return vec![];
      }
    };

    let mut groups = Vec::new();
    for id in (0..counter).take(limit) {
      match self.group_info(GroupId(id)).await {
        Ok(group) => groups.push(group),
        Err(e) => warn!("skipping group {id}: {e}"),
      }
    }
    groups
  }

  /// All contract events in the inclusive block range, decoded.
  /// Undecodable entries are logged and skipped.
  pub async fn events(
    &self,
    from_block: u64,
    to_block: u64,
  ) -> Result<Vec<SavingsLog>, Error> {
    let entries = self
      .provider
      .logs(LogFilter {
        contract: self.address,
        events: vec![
          abi::EV_GROUP_CREATED.into(),
          abi::EV_GROUP_JOINED.into(),
          abi::EV_CONTRIBUTION_MADE.into(),
          abi::EV_PAYOUT_TRIGGERED.into(),
          abi::EV_WITHDRAWAL_MADE.into(),
        ],
        from_block,
        to_block,
      })
      .await?;

    let mut logs = Vec::with_capacity(entries.len());
    for entry in entries {
      match decode_event(&entry) {
        Ok(event) => logs.push(SavingsLog {
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

fn decode_event(entry: &LogEntry) -> Result<SavingsEvent, Error> {
  let mut decoder = Decoder::new(&entry.params);
  let event = match entry.event.as_str() {
    abi::EV_GROUP_CREATED => SavingsEvent::Created {
      group: GroupId(decoder.uint()? as u64),
      creator: decoder.address()?,
    },
    abi::EV_GROUP_JOINED => SavingsEvent::Joined {
      group: GroupId(decoder.uint()? as u64),
      member: decoder.address()?,
    },
    abi::EV_CONTRIBUTION_MADE => SavingsEvent::Contribution {
      group: GroupId(decoder.uint()? as u64),
      member: decoder.address()?,
      round: decoder.uint()? as u64,
    },
    abi::EV_PAYOUT_TRIGGERED => SavingsEvent::Payout {
      group: GroupId(decoder.uint()? as u64),
      beneficiary: decoder.address()?,
      round: decoder.uint()? as u64,
    },
    abi::EV_WITHDRAWAL_MADE => SavingsEvent::Withdrawal {
      group: GroupId(decoder.uint()? as u64),
      member: decoder.address()?,
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
