use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Invalid domain '{input}': {reason}")]
    InvalidDomain { input: String, reason: String },

    #[error("Batch of {size} domains exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("{count} invalid domain(s), e.g. {}", sample.join(", "))]
    InvalidDomains { count: usize, sample: Vec<String> },

    #[error("Unknown source: {name}")]
    UnknownSource { name: String },

    #[error("{source_id} provider error: {message}")]
    Provider { source_id: String, message: String },

    #[error("Query execution failed: {message}")]
    Query { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EnrichError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EnrichError::ConfigValidation { .. }
            | EnrichError::InvalidConfigValue { .. }
            | EnrichError::MissingConfig { .. } => ErrorCategory::Configuration,
            EnrichError::InvalidDomain { .. }
            | EnrichError::BatchTooLarge { .. }
            | EnrichError::InvalidDomains { .. }
            | EnrichError::UnknownSource { .. }
            | EnrichError::Validation { .. } => ErrorCategory::Validation,
            EnrichError::Http(_) | EnrichError::Provider { .. } | EnrichError::Query { .. } => {
                ErrorCategory::Network
            }
            EnrichError::Serialization(_) => ErrorCategory::Data,
            EnrichError::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Validation | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EnrichError::InvalidDomain { .. } | EnrichError::InvalidDomains { .. } => {
                "Pass bare domains such as 'example.com' (scheme and path are stripped)".to_string()
            }
            EnrichError::BatchTooLarge { max, .. } => {
                format!("Split the input into batches of at most {} domains", max)
            }
            EnrichError::UnknownSource { .. } => {
                "Valid sources: traffic, techstack, financials, filings, hiring, signals".to_string()
            }
            EnrichError::MissingConfig { field } => {
                format!("Set '{}' in the config file or its environment variable", field)
            }
            EnrichError::ConfigValidation { .. } | EnrichError::InvalidConfigValue { .. } => {
                "Check the TOML configuration file".to_string()
            }
            EnrichError::Http(_) | EnrichError::Provider { .. } | EnrichError::Query { .. } => {
                "Check network connectivity and provider credentials, then retry".to_string()
            }
            EnrichError::Io(_) => "Check file paths and permissions".to_string(),
            EnrichError::Serialization(_) | EnrichError::Validation { .. } => {
                "Check the input data format".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Validation => format!("Invalid input: {}", self),
            ErrorCategory::Network => format!("Provider request failed: {}", self),
            ErrorCategory::Data => format!("Could not process data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;
