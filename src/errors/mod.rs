use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Invalid endpoint {host}:{port}: {reason}")] InvalidEndpoint {
        host: String,
        port: i32,
        reason: String,
    },

    #[error("Resolution failed for {host}: {source}")] Resolution {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")] Config(String),

    #[error("Serialization error: {0}")] Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")] Io(#[from] std::io::Error),
}

impl TraceError {
    /// Whether retrying the same operation later can succeed.
    ///
    /// Resolution failures are transient (DNS outage, daemon restart) and
    /// callers keep polling through them. Invalid input never heals on its
    /// own and configuration problems need operator action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TraceError::Resolution { .. } => true,
            TraceError::Io(_) => true,
            _ => false,
        }
    }
}

pub type TraceResult<T> = Result<T, TraceError>;
