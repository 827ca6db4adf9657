//! Server configuration with validation.
//!
//! Sources, lowest precedence first: built-in defaults, a JSON file named by
//! `DIGISEAL_CONFIG`, then the `PORT`, `HOST`, `BLOCKCHAIN_URL`,
//! `CONTRACT_ADDRESS` and `FROM_ACCOUNT` environment variables.

use digiseal_types::{parse_address, Address};
use product_contract::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_PATH_ENV: &str = "DIGISEAL_CONFIG";

/// Main server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener
    pub http: HttpConfig,
    /// Node and contract connection
    pub blockchain: BlockchainConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Request limits
    pub limits: LimitsConfig,
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
}

impl ServerConfig {
    /// Defaults, then the optional file, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`ServerConfig::load`] with an injectable variable lookup.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(lookup)?;
        Ok(config)
    }

    /// Read a JSON config file. Missing sections take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.http.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(host) = lookup("HOST") {
            self.http.host = host.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "HOST",
                value: host.clone(),
            })?;
        }
        if let Some(url) = lookup("BLOCKCHAIN_URL") {
            self.blockchain.url = url;
        }
        if let Some(address) = lookup("CONTRACT_ADDRESS") {
            self.blockchain.contract_address = Some(address);
        }
        if let Some(account) = lookup("FROM_ACCOUNT") {
            self.blockchain.from_account = Some(account);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if self.blockchain.url.trim().is_empty() {
            return Err(ConfigError::Invalid("blockchain url cannot be empty".into()));
        }

        self.blockchain.contract_address()?;
        self.blockchain.from_account()?;

        if self.blockchain.gas_limit == 0 {
            return Err(ConfigError::InvalidLimit("gas_limit cannot be 0".into()));
        }

        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if self.timeouts.request.is_zero() || self.timeouts.rpc.is_zero() {
            return Err(ConfigError::InvalidTimeout("timeouts cannot be 0".into()));
        }

        if self.blockchain.receipt_timeout.is_zero()
            || self.blockchain.receipt_poll_interval.is_zero()
        {
            return Err(ConfigError::InvalidTimeout(
                "receipt_timeout and receipt_poll_interval cannot be 0".into(),
            ));
        }

        if self.timeouts.request <= self.blockchain.receipt_timeout {
            return Err(ConfigError::InvalidTimeout(format!(
                "request timeout ({:?}) must exceed receipt_timeout ({:?})",
                self.timeouts.request, self.blockchain.receipt_timeout
            )));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Settings for the contract binding.
    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        Ok(RegistryConfig {
            contract_address: self.blockchain.contract_address()?,
            from: self.blockchain.from_account()?,
            gas_limit: self.blockchain.gas_limit,
            request_timeout: self.timeouts.rpc,
            receipt_timeout: self.blockchain.receipt_timeout,
            receipt_poll_interval: self.blockchain.receipt_poll_interval,
        })
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 5000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5000,
        }
    }
}

/// Node connection and contract deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint
    pub url: String,
    /// Deployed ProductVerification address (required)
    pub contract_address: Option<String>,
    /// Sending account; the node's first unlocked account when unset
    pub from_account: Option<String>,
    /// Gas limit for every transaction
    pub gas_limit: u64,
    #[serde(with = "humantime_serde")]
    pub receipt_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub receipt_poll_interval: Duration,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7545".to_string(),
            contract_address: None,
            from_account: None,
            gas_limit: 3_000_000,
            receipt_timeout: Duration::from_secs(60),
            receipt_poll_interval: Duration::from_millis(500),
        }
    }
}

impl BlockchainConfig {
    pub fn contract_address(&self) -> Result<Address, ConfigError> {
        let raw = self
            .contract_address
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingContractAddress)?;
        parse_address(raw).map_err(|_| ConfigError::InvalidAddress {
            field: "contract_address",
            value: raw.to_string(),
        })
    }

    pub fn from_account(&self) -> Result<Option<Address>, ConfigError> {
        match self.from_account.as_deref().filter(|s| !s.trim().is_empty()) {
            None => Ok(None),
            Some(raw) => parse_address(raw)
                .map(Some)
                .map_err(|_| ConfigError::InvalidAddress {
                    field: "from_account",
                    value: raw.to_string(),
                }),
        }
    }
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024,
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request budget; must cover the receipt wait of a write
    #[serde(with = "humantime_serde")]
    pub request: Duration,
    /// Single JSON-RPC round trip to the node
    #[serde(with = "humantime_serde")]
    pub rpc: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(120),
            rpc: Duration::from_secs(30),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            max_age: 86400,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {0}")]
    Io(String),
    #[error("cannot parse config file {0}")]
    Parse(String),
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("http port cannot be 0")]
    InvalidPort,
    #[error("contract address is not configured (set CONTRACT_ADDRESS)")]
    MissingContractAddress,
    #[error("invalid {field}: {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
