use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the SCRAPI client.
///
/// Backend-reported problems are *not* errors: engines return them as
/// [`ProblemDetails`](crate::problem::ProblemDetails) and the façade hands them
/// back as data. Everything here is a fault the caller cannot recover from by
/// simply asking again.
#[derive(Debug, Error)]
pub enum ScrapiError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Backend contract ────────────────────────────────────────────────
    #[error("malformed backend response: {0}")]
    MalformedBackendResponse(String),

    #[error("operation {operation} is not supported by engine {engine}")]
    UnsupportedOperation { operation: String, engine: String },

    // ── Signed statements ───────────────────────────────────────────────
    #[error("statement: {0}")]
    Statement(#[from] StatementError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrapiError {
    /// Configuration faults are fatal at construction or first use and are
    /// never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedBackendResponse(_))
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown engine type: {0}")]
    UnknownEngine(String),

    #[error("no transparency service engine specified")]
    EngineNotConfigured,

    #[error("transparency service engine malfunction: {engine}")]
    EngineUnhealthy { engine: String },

    #[error("polling must be bounded by max_attempts or timeout")]
    UnboundedPolling,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("failed to load config: {0}")]
    Load(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Signed statement errors ─────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StatementError {
    #[error("cbor decode failed: {0}")]
    Decode(String),

    #[error("not a COSE_Sign1 structure: {0}")]
    NotSign1(String),

    #[error("cbor encode failed: {0}")]
    Encode(String),

    #[error("envelope has a detached payload")]
    DetachedPayload,
}

// ─── Result alias ────────────────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ScrapiError>;
