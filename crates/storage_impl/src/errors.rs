#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("ValueNotFound: {0}")]
    ValueNotFound(String),
    #[error("DuplicateValue: {entity} already exists {key:?}")]
    DuplicateValue {
        entity: &'static str,
        key: Option<String>,
    },
    #[error("Timed out while trying to connect to the database")]
    DatabaseConnectionError,
    #[error("Serialization failure")]
    SerializationFailed,
    #[error("Deserialization failure")]
    DeserializationFailed,
    #[error("MockDb error")]
    MockDbError,
}

impl StorageError {
    pub fn is_db_not_found(&self) -> bool {
        matches!(self, Self::ValueNotFound(_))
    }

    pub fn is_db_unique_violation(&self) -> bool {
        matches!(self, Self::DuplicateValue { .. })
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("Application configuration error: {0}")]
    ConfigurationError(#[from] config::ConfigError),

    #[error("Invalid configuration value provided: {0}")]
    InvalidConfigurationValueError(String),

    #[error("I/O: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to build the outbound HTTP client: {0}")]
    ApiClientError(String),
}
