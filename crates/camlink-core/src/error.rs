use thiserror::Error;

/// Adapter error taxonomy.
///
/// Every fault is caught at the boundary of the activity that produced it
/// (config refresh, connect sequence, one control event, one publish tick)
/// and reported as a text diagnostic; none of these terminate the process.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Malformed config value; the previous snapshot stays active.
    #[error("Config error: {0}")]
    Config(String),

    /// A step of the session-establishment sequence failed.
    #[error("Connect failed ({step}): {message}")]
    Connect { step: &'static str, message: String },

    /// The device rejected a motion command.
    #[error("Command error: {0}")]
    Command(String),

    /// A motion command was issued with no active session.
    #[error("No active device session")]
    NotConnected,

    /// State sampling or publishing failed.
    #[error("Publish error: {0}")]
    Publish(String),

    /// Collaborator-boundary passthrough.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Adapter result type.
pub type Result<T> = std::result::Result<T, AdapterError>;

impl AdapterError {
    pub fn config(msg: impl Into<String>) -> Self {
        AdapterError::Config(msg.into())
    }

    pub fn connect(step: &'static str, err: impl std::fmt::Display) -> Self {
        AdapterError::Connect {
            step,
            message: err.to_string(),
        }
    }

    pub fn command(err: impl std::fmt::Display) -> Self {
        AdapterError::Command(err.to_string())
    }

    pub fn publish(err: impl std::fmt::Display) -> Self {
        AdapterError::Publish(err.to_string())
    }
}
