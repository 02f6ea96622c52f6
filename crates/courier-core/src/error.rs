//! Unified error handling for the booking core
//!
//! Every failure the allocator, the rate engine or the orchestrator can
//! produce is a variant of [`AppError`], with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Cache Errors ====================
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Cache connection failed: {0}")]
    CacheConnection(String),

    // ==================== Allocation Errors ====================
    #[error("Consignment ranges exhausted for {0}")]
    RangeExhausted(String),

    #[error("No active consignment range assigned to {0}")]
    NoRangeAssigned(String),

    #[error("Allocation conflict: {0}")]
    AllocationConflict(String),

    // ==================== Pricing Errors ====================
    #[error("Unsupported reverse route to pincode {0}")]
    UnsupportedReverseRoute(String),

    #[error("Invalid service type: {0}")]
    InvalidServiceType(String),

    #[error("Tariff configuration missing: {0}")]
    TariffConfigurationMissing(String),

    // ==================== Booking Errors ====================
    #[error("Booking could not be persisted: {0}")]
    PersistenceFailure(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request: validation and business rule rejections
            AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::MissingField(_)
            | AppError::InvalidServiceType(_)
            | AppError::UnsupportedReverseRoute(_)
            | AppError::RangeExhausted(_)
            | AppError::NoRangeAssigned(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::AllocationConflict(_) | AppError::Conflict(_) => StatusCode::CONFLICT,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Cache(_) => "cache_error",
            AppError::CacheConnection(_) => "cache_connection_error",
            AppError::RangeExhausted(_) => "range_exhausted",
            AppError::NoRangeAssigned(_) => "no_range_assigned",
            AppError::AllocationConflict(_) => "allocation_conflict",
            AppError::UnsupportedReverseRoute(_) => "unsupported_reverse_route",
            AppError::InvalidServiceType(_) => "invalid_service_type",
            AppError::TariffConfigurationMissing(_) => "tariff_configuration_missing",
            AppError::PersistenceFailure(_) => "persistence_failure",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::MissingField(_) => "missing_field",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the failure is a transient uniqueness race worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::AllocationConflict(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::RangeExhausted("corporate:c1".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AllocationConflict("retries exhausted".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::TariffConfigurationMissing("dox 01gm-250gm assam".to_string())
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::PersistenceFailure("insert failed".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::UnsupportedReverseRoute("110001".to_string()).error_code(),
            "unsupported_reverse_route"
        );
        assert_eq!(
            AppError::InvalidServiceType("parcel".to_string()).error_code(),
            "invalid_service_type"
        );
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(AppError::AllocationConflict("taken".to_string()).is_retryable());
        assert!(!AppError::RangeExhausted("office:o1".to_string()).is_retryable());
        assert!(!AppError::Database("down".to_string()).is_retryable());
    }
}
