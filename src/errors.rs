use thiserror::Error;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed trace request - never retried, reported before any port call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ledger data port failures (RPC or indexing server)
    #[error("Ledger port error: {0}")]
    Port(#[from] PortError),

    /// Configuration issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event serialisation
    #[error("Serialisation error: {0}")]
    Serialisation(String),
}

/// Ledger Data Port error taxonomy
///
/// Classifies failures from either realization (Bitcoin Core RPC or an
/// electrs/esplora indexing server) so the walker can decide between
/// retrying, aborting, and surfacing configuration problems distinctly.
#[derive(Error, Debug)]
pub enum PortError {
    /// Transaction exists in valid format but not found on the ledger.
    /// Never retried: the trace is meaningless if a link cannot be resolved.
    #[error("Transaction not found: {txid}")]
    NotFound { txid: String },

    /// Credentials or permissions problem - not retried, operators must fix config
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Connectivity or timeout - retried with bounded attempts and fixed delay
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Anything the port could not classify
    #[error("Unknown port failure: {0}")]
    Unknown(String),
}

impl PortError {
    /// Whether the retry loop may attempt this failure again
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortError::Transient(_))
    }

    /// Map a failure onto the user-facing message emitted in a terminal
    /// Error event, phrased so a client can act on it.
    pub fn user_message(&self) -> String {
        match self {
            PortError::NotFound { txid } => format!(
                "Transaction {} not found. Please verify the TXID is correct and the transaction exists.",
                txid
            ),
            PortError::Unauthorized(_) => {
                "Ledger backend authentication failed. Please check your RPC credentials.".to_string()
            }
            PortError::Transient(_) => {
                "Failed to connect to the ledger backend. Please check your node configuration."
                    .to_string()
            }
            PortError::Unknown(msg) => format!("Trace failed: {}", msg),
        }
    }
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

/// Result type for Ledger Data Port operations
pub type PortResult<T> = Result<T, PortError>;

// Additional From implementations for common error types
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialisation(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
