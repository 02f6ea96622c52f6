//! Common DTOs used across the API

use courier_core::traits::{PaginatedResponse, Pagination, PaginationMeta};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page", deserialize_with = "number_or_string")]
    #[validate(range(min = 1))]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_per_page", deserialize_with = "number_or_string")]
    #[validate(range(min = 1, max = 500))]
    pub per_page: i64,
}

/// Query strings carry numbers as text; JSON bodies carry them as numbers
fn number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Ledger-level pagination
    pub fn to_pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }

    pub fn paginate<T>(&self, data: Vec<T>, total: i64) -> PaginatedResponse<T> {
        PaginatedResponse {
            data,
            pagination: PaginationMeta::new(total, self.page, self.per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_params_from_query() {
        let params = from_pairs(&[("page", "3"), ("per_page", "25")]);
        assert_eq!(params.page, 3);
        assert_eq!(params.to_pagination().offset(), 50);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_pagination_params_bounds() {
        let params = PaginationParams {
            page: 0,
            per_page: 20,
        };
        assert!(params.validate().is_err());

        let params = PaginationParams {
            page: 1,
            per_page: 501,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_paginate_metadata() {
        let params = PaginationParams::default();
        let page = params.paginate(vec![1, 2, 3], 45);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.data.len(), 3);
    }

    #[test]
    fn test_api_response() {
        let resp = ApiResponse::success("ok");
        assert!(resp.message.is_none());

        let resp = ApiResponse::with_message(1, "Booking created");
        assert_eq!(resp.message.as_deref(), Some("Booking created"));
    }

    fn from_pairs(pairs: &[(&str, &str)]) -> PaginationParams {
        let map: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }
}
