use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnusedPortsError {
    #[error("Inventory request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Inventory endpoint returned {status}: {message}")]
    InventoryError { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Presentation error: {message}")]
    PresentationError { message: String },
}

/// Failure of a single reachability attempt. Never leaves the probe.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid IP address '{0}'")]
    InvalidAddress(String),

    #[error("probing capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("permission denied while probing: {0}")]
    PermissionDenied(String),

    #[error("probe timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("OS error while probing: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Inventory,
    Io,
    Data,
    Presentation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl UnusedPortsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ApiError(_) | Self::InventoryError { .. } => ErrorCategory::Inventory,
            Self::IoError(_) => ErrorCategory::Io,
            Self::SerializationError(_) => ErrorCategory::Data,
            Self::PresentationError { .. } => ErrorCategory::Presentation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Inventory | ErrorCategory::Presentation => ErrorSeverity::Medium,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InvalidConfigValueError { .. } | Self::ConfigValidationError { .. } => {
                "Check the value against the allowed range shown above and try again"
            }
            Self::MissingConfigError { .. } => {
                "Provide the missing option on the command line or in the config file"
            }
            Self::ApiError(_) => "Verify the inventory endpoint is reachable and retry",
            Self::InventoryError { status, .. } if *status == 401 || *status == 403 => {
                "Refresh the auth token (OS_AUTH_TOKEN) and retry"
            }
            Self::InventoryError { .. } => "Check the inventory endpoint URL and query filters",
            Self::IoError(_) => "Check that the inventory file exists and is readable",
            Self::SerializationError(_) => "Make sure the inventory is a JSON list of ports",
            Self::PresentationError { .. } => "Make sure standard output is still open, or redirect it to a file",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Inventory => format!("Could not retrieve ports: {}", self),
            ErrorCategory::Io => format!("File access failed: {}", self),
            ErrorCategory::Data => format!("Could not read port records: {}", self),
            ErrorCategory::Presentation => format!("Could not render results: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, UnusedPortsError>;
