use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SimError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        SimError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type SimResult<T> = std::result::Result<T, SimError>;
