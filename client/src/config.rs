use {
  coincircle_primitives::{Address, TokenInfo},
  once_cell::sync::Lazy,
  std::time::Duration,
  tracing::warn,
};

/// Decimal precision of the chain's native currency and of all amounts
/// the group contract stores.
pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCurrency {
  pub name: &'static str,
  pub symbol: &'static str,
  pub decimals: u8,
}

/// Chain selection: id, RPC endpoint, explorer and native currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
  pub name: &'static str,
  pub chain_id: u64,
  pub rpc_url: &'static str,
  pub explorer_url: &'static str,
  pub native_currency: NativeCurrency,
}

const ALFAJORES: NetworkConfig = NetworkConfig {
  name: "alfajores",
  chain_id: 44787,
  rpc_url: "https://alfajores-forno.celo-testnet.org",
  explorer_url: "https://alfajores-blockscout.celo-testnet.org",
  native_currency: NativeCurrency {
    name: "CELO",
    symbol: "CELO",
    decimals: 18,
  },
};

impl NetworkConfig {
  /// Looks a network up by name, falling back to the default testnet
  /// for unknown names.
  pub fn named(name: &str) -> NetworkConfig {
    match name.to_ascii_lowercase().as_str() {
      "alfajores" => ALFAJORES,
      other => {
        warn!("unknown network '{other}', using {}", ALFAJORES.name);
        ALFAJORES
      }
    }
  }
}

impl Default for NetworkConfig {
  fn default() -> Self {
    ALFAJORES
  }
}

static ALFAJORES_TOKENS: Lazy<Vec<TokenInfo>> = Lazy::new(|| {
  vec![
    TokenInfo {
      address: parse("0x874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1"),
      symbol: "cUSD".into(),
      name: "Celo Dollar".into(),
      decimals: 18,
    },
    TokenInfo {
      address: parse("0x10c892A6EC43a53E45D0B916B4b7D383B1b78C0F"),
      symbol: "cEUR".into(),
      name: "Celo Euro".into(),
      decimals: 18,
    },
    TokenInfo {
      address: parse("0xF194afDf50B03e69Bd7D057c1Aa9e10c9954E4C9"),
      symbol: "cAnchor".into(),
      name: "cAnchor Native".into(),
      decimals: 18,
    },
  ]
});

/// Known collateral tokens per network, used when the on-chain
/// supported-collaterals call fails. Keeps the collateral picker
/// rendering with sensible entries instead of an empty list.
pub fn fallback_collateral_tokens(network: &NetworkConfig) -> Vec<TokenInfo> {
  match network.name {
    "alfajores" => ALFAJORES_TOKENS.clone(),
    _ => vec![],
  }
}

fn parse(addr: &str) -> Address {
  addr.parse().expect("hardcoded address is valid")
}

/// Deployed contract addresses. The zero address means "not deployed on
/// this network"; bindings refuse to target it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
  pub savings: Address,
  pub anchor: Address,
}

impl Default for ContractAddresses {
  fn default() -> Self {
    Self {
      savings: Address::ZERO,
      anchor: parse("0x6d8b3e655519a31f80cc90bba06c0ad9a97baf69"),
    }
  }
}

/// Client tunables. Defaults match the dashboard's production settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
  /// Cap on how many groups a single listing fetch walks through.
  pub max_groups: usize,

  /// How often cached balances are re-read while connected.
  pub refresh_interval: Duration,

  /// How long to wait for a submitted transaction's receipt.
  pub confirmation_timeout: Duration,

  /// Receipt polling cadence within the confirmation wait.
  pub confirmation_poll: Duration,

  /// How many recent blocks the activity feed scans.
  pub activity_block_window: u64,

  /// Maximum activity items returned per load.
  pub activity_limit: usize,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_groups: 50,
      refresh_interval: Duration::from_secs(30),
      confirmation_timeout: Duration::from_secs(120),
      confirmation_poll: Duration::from_secs(1),
      activity_block_window: 10_000,
      activity_limit: 10,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
  pub network: NetworkConfig,
  pub contracts: ContractAddresses,
  pub limits: Limits,
}

impl Config {
  /// Builds a configuration from environment variables with hard-coded
  /// fallbacks. Recognized variables: `COINCIRCLE_NETWORK`,
  /// `COINCIRCLE_GROUPS_ADDRESS`, `COINCIRCLE_ANCHOR_ADDRESS`. A
  /// malformed address override is logged and ignored.
  pub fn from_env() -> Self {
    let mut config = Config::default();

    if let Ok(name) = std::env::var("COINCIRCLE_NETWORK") {
      config.network = NetworkConfig::named(&name);
    }
    if let Some(addr) = env_address("COINCIRCLE_GROUPS_ADDRESS") {
      config.contracts.savings = addr;
    }
    if let Some(addr) = env_address("COINCIRCLE_ANCHOR_ADDRESS") {
      config.contracts.anchor = addr;
    }

    config
  }
}

fn env_address(var: &str) -> Option<Address> {
  let value = std::env::var(var).ok()?;
  match value.parse() {
    Ok(addr) => Some(addr),
    Err(e) => {
      warn!("ignoring {var}={value}: {e}");
      None
    }
  }
}
