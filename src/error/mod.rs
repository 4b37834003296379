use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Consolidation error: {0}")]
    Consolidation(#[from] ConsolidationError),

    #[error("Period error: {0}")]
    Period(#[from] PeriodError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Summary not found: {summary_id}")]
    SummaryNotFound { summary_id: String },

    #[error("Corrupt row {row_id}: {message}")]
    CorruptRow { row_id: String, message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Period and retention boundary errors.
///
/// Raised immediately at the boundary - invalid bounds are never coerced
/// into something usable.
#[derive(Debug, Error)]
pub enum PeriodError {
    #[error("Timestamp has no UTC offset: {value}")]
    NaiveTimestamp { value: String },

    #[error("Unparseable timestamp: {value}")]
    Unparseable { value: String },

    #[error("Retention hours must be non-negative, got {hours}")]
    NegativeRetention { hours: i64 },

    #[error("Period start {start} is not before period end {end}")]
    InvertedBounds { start: String, end: String },
}

/// Consolidation run errors
#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("Summary write failed for period {period_label}: {message}")]
    WriteFailed { period_label: String, message: String },

    #[error("Storage error during consolidation: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid period: {0}")]
    Period(#[from] PeriodError),
}

/// Collection-path errors.
///
/// These never escape the aggregator: every variant is converted to the
/// unhealthy sentinel for the affected service slot.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Service unreachable: {service}")]
    ServiceUnreachable { service: String },

    #[error("Collection timed out for {service}")]
    Timeout { service: String },

    #[error("Registry discovery failed: {message}")]
    RegistryDiscovery { message: String },

    #[error("Source does not support this accessor")]
    Unsupported,
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for consolidation operations
pub type ConsolidationResult<T> = Result<T, ConsolidationError>;

/// Result type alias for collection attempts
pub type CollectionResult<T> = Result<T, CollectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing key".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = AppError::Internal {
            message: "unexpected".to_string(),
        };
        assert_eq!(err.to_string(), "Internal error: unexpected");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Connection {
            message: "failed to connect".to_string(),
        };
        assert_eq!(err.to_string(), "Database connection failed: failed to connect");

        let err = StorageError::SummaryNotFound {
            summary_id: "trace_summary_20231009_00".to_string(),
        };
        assert_eq!(err.to_string(), "Summary not found: trace_summary_20231009_00");

        let err = StorageError::Query {
            message: "syntax error".to_string(),
        };
        assert_eq!(err.to_string(), "Query failed: syntax error");
    }

    #[test]
    fn test_period_error_display() {
        let err = PeriodError::NaiveTimestamp {
            value: "2023-10-09T00:00:00".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Timestamp has no UTC offset: 2023-10-09T00:00:00"
        );

        let err = PeriodError::NegativeRetention { hours: -4 };
        assert_eq!(err.to_string(), "Retention hours must be non-negative, got -4");
    }

    #[test]
    fn test_consolidation_error_display() {
        let err = ConsolidationError::WriteFailed {
            period_label: "Week of 2023-10-09".to_string(),
            message: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Summary write failed for period Week of 2023-10-09: disk full"
        );
    }

    #[test]
    fn test_collection_error_display() {
        let err = CollectionError::ServiceUnreachable {
            service: "memory".to_string(),
        };
        assert_eq!(err.to_string(), "Service unreachable: memory");

        let err = CollectionError::Timeout {
            service: "llm_bus".to_string(),
        };
        assert_eq!(err.to_string(), "Collection timed out for llm_bus");
    }

    #[test]
    fn test_period_error_conversion_to_app_error() {
        let period_err = PeriodError::NegativeRetention { hours: -1 };
        let app_err: AppError = period_err.into();
        assert!(matches!(app_err, AppError::Period(_)));
    }

    #[test]
    fn test_storage_error_conversion_to_consolidation_error() {
        let storage_err = StorageError::Query {
            message: "locked".to_string(),
        };
        let cons_err: ConsolidationError = storage_err.into();
        assert!(matches!(cons_err, ConsolidationError::Storage(_)));
        assert!(cons_err.to_string().contains("Query failed"));
    }

    #[test]
    fn test_consolidation_error_conversion_to_app_error() {
        let cons_err = ConsolidationError::WriteFailed {
            period_label: "October 2023".to_string(),
            message: "io".to_string(),
        };
        let app_err: AppError = cons_err.into();
        assert!(matches!(app_err, AppError::Consolidation(_)));
    }
}
