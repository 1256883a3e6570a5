use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub bitcoin_rpc: BitcoinRpcConfig,
    pub electrs: ElectrsConfig,
    pub trace: TraceConfig,
}

/// Which Ledger Data Port realization serves trace requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Bitcoin Core JSON-RPC (getrawtransaction)
    CoreRpc,
    /// electrs/esplora HTTP index server
    Esplora,
}

/// Bitcoin Core RPC connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinRpcConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for BitcoinRpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8332".to_string(),
            username: "bitcoin".to_string(),
            password: "password".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// electrs/esplora HTTP index server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectrsConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ElectrsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Trace safety bounds and detector sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Default maximum trace depth when the request does not specify one (range 1-100)
    pub default_max_depth: u32,
    /// Hard ceiling on distinct visited outpoints per trace
    pub max_visited: usize,
    /// Upper bound on cycle length considered by the detector
    pub max_cycle_length: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            default_max_depth: 20,
            max_visited: 100,
            max_cycle_length: 15,
        }
    }
}

impl AppConfig {
    /// Load configuration from config.toml file and environment variables.
    /// Environment variables take precedence over file configuration.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name("config").required(false))
    }

    /// Load configuration from an explicit file path (CLI --config)
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        Self::build(File::from(std::path::Path::new(path)).required(true))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        let rpc = BitcoinRpcConfig::default();
        let electrs = ElectrsConfig::default();
        let trace = TraceConfig::default();

        let config = Config::builder()
            // Start with default values
            .set_default("backend", "core_rpc")?
            .set_default("bitcoin_rpc.url", rpc.url)?
            .set_default("bitcoin_rpc.username", rpc.username)?
            .set_default("bitcoin_rpc.password", rpc.password)?
            .set_default("bitcoin_rpc.timeout_seconds", rpc.timeout_seconds)?
            .set_default("bitcoin_rpc.max_retries", rpc.max_retries as i64)?
            .set_default("bitcoin_rpc.retry_delay_ms", rpc.retry_delay_ms)?
            .set_default("electrs.base_url", electrs.base_url)?
            .set_default("electrs.timeout_seconds", electrs.timeout_seconds)?
            .set_default("electrs.max_retries", electrs.max_retries as i64)?
            .set_default("electrs.retry_delay_ms", electrs.retry_delay_ms)?
            .set_default("trace.default_max_depth", trace.default_max_depth as i64)?
            .set_default("trace.max_visited", trace.max_visited as i64)?
            .set_default("trace.max_cycle_length", trace.max_cycle_length as i64)?
            // Load from config.toml if it exists
            .add_source(file)
            // Override with environment variables
            // TRACER_BACKEND, TRACER_BITCOIN_RPC__URL, TRACER_ELECTRS__BASE_URL, etc.
            .add_source(
                config::Environment::with_prefix("TRACER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Get default config values for CLI argument defaults
    pub fn get_defaults() -> Self {
        Self {
            backend: BackendKind::CoreRpc,
            bitcoin_rpc: BitcoinRpcConfig::default(),
            electrs: ElectrsConfig::default(),
            trace: TraceConfig::default(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.trace.default_max_depth == 0 || self.trace.default_max_depth > 100 {
            return Err(ConfigError::Message(format!(
                "trace.default_max_depth must be within 1-100, got {}",
                self.trace.default_max_depth
            )));
        }
        if self.trace.max_visited == 0 {
            return Err(ConfigError::Message(
                "trace.max_visited must be greater than zero".to_string(),
            ));
        }
        if self.trace.max_cycle_length < 3 {
            return Err(ConfigError::Message(format!(
                "trace.max_cycle_length must be at least 3, got {}",
                self.trace.max_cycle_length
            )));
        }
        Ok(())
    }
}
