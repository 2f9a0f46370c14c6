//! Wire-level constants for the node's JSON-RPC interface.

use std::time::Duration;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = "AuthServiceProxy/0.1";

/// Media type required on requests and responses.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Request timeout used when the endpoint does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Port assumed when the service URL omits one (mainnet RPC).
pub const DEFAULT_RPC_PORT: u16 = 8332;

/// `version` field of single-call envelopes (JSON-RPC 1.1).
pub const SINGLE_CALL_VERSION: &str = "1.1";

/// `jsonrpc` field of batch entries (JSON-RPC 2.0).
pub const BATCH_VERSION: &str = "2.0";

/// Environment variable naming the client configuration file.
pub const CONFIG_PATH_ENV: &str = "TRANSACT_CONFIG";

/// Configuration file read when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "transact.toml";

/// Environment variable overriding the configured service URL.
pub const RPC_URL_ENV: &str = "BITCOIN_RPC_URL";
