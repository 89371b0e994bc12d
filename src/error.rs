use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Anonymizer error: {0}")]
    Anonymizer(#[from] AnonymizerError),

    #[error("Outlet error: {0}")]
    Outlet(#[from] OutletError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum AnonymizerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid mask: {0}")]
    InvalidMask(String),
}

#[derive(Error, Debug)]
pub enum OutletError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Outlet unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, EventsError>;
