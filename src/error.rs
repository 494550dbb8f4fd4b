use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Request failed after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    #[error("Entrez error (status {status}): {message}")]
    Entrez { status: u16, message: String },

    #[error("GenBank parse error: {0}")]
    Parse(String),

    #[error("Plot rendering failed: {0}")]
    Plot(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, RetrieverError>;
