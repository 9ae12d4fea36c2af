mod activity;
mod address;
mod amount;
mod group;
mod token;
mod wire;

pub use {
  activity::{ActivityItem, ActivityKind},
  address::{Address, AddressError},
  amount::{Amount, AmountError},
  group::{Group, GroupId, PayoutPolicy, UnknownPolicy},
  token::{AnchorParameters, TokenInfo, UserStats},
  wire::{
    Call,
    Decoder,
    LogEntry,
    LogFilter,
    Receipt,
    TxHash,
    Value,
    ValueError,
  },
};
