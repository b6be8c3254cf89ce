use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassForgeError {
    #[error("File access failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed roster CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config or summary JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad section setup, unknown tier, or a search too large to run.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Roster or assignment contents that do not describe a class.
    #[error("Invalid class data: {0}")]
    Validation(String),
}

pub type CfResult<T> = Result<T, ClassForgeError>;
