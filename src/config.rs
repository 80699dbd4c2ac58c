//! Runtime configuration.

use std::time::Duration;

/// Sepolia testnet.
pub const DEFAULT_CHAIN_ID: u64 = 11155111;

/// Public Sepolia endpoint.
pub const DEFAULT_RPC_URL: &str = "https://1rpc.io/sepolia";

/// Settlement ledger connection settings.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// JSON-RPC endpoint. `None` runs against the in-process ledger.
    pub rpc_url: Option<String>,
    /// Settlement contract address.
    pub contract: String,
    /// Chain the contract lives on.
    pub chain_id: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract: "0x0000000000000000000000000000000000000000".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rpc_url: std::env::var("CIPHER_BET_RPC_URL").ok().filter(|v| !v.is_empty()),
            contract: std::env::var("CIPHER_BET_CONTRACT").unwrap_or(defaults.contract),
            chain_id: std::env::var("CIPHER_BET_CHAIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.chain_id),
        }
    }
}

/// Configuration for a betting session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Ledger connection.
    pub client: ClientConfig,
    /// Deadline for signed transactions.
    pub submit_timeout: Duration,
    /// Deadline for reads.
    pub query_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            submit_timeout: Duration::from_secs(60),
            query_timeout: Duration::from_secs(15),
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client: ClientConfig::from_env(),
            submit_timeout: secs_var("CIPHER_BET_SUBMIT_TIMEOUT_SECS").unwrap_or(defaults.submit_timeout),
            query_timeout: secs_var("CIPHER_BET_QUERY_TIMEOUT_SECS").unwrap_or(defaults.query_timeout),
        }
    }
}

fn secs_var(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
