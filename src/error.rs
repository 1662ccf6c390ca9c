use thirtyfour::error::WebDriverError;

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("failed to initialize browser after {attempts} attempts: {reason}")]
    SessionFailed { attempts: u32, reason: String },

    #[error("webdriver error: {0}")]
    WebDriver(#[from] WebDriverError),

    #[error("page error: {0}")]
    Page(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for CheckError {
    fn from(value: config::ConfigError) -> Self {
        CheckError::Config(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
