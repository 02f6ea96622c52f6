//! Cache key constants and builders
//!
//! # Key Patterns
//!
//! - `tariff:active` - Tariff version currently pricing bookings
//!
//! # Example
//!
//! ```
//! use courier_cache::keys;
//!
//! assert_eq!(keys::active_tariff_key(), "tariff:active");
//! ```

/// Prefix for cached tariffs
pub const TARIFF_PREFIX: &str = "tariff";

/// Default TTL for the active tariff (1 minute)
///
/// Short enough that a newly effective version is picked up promptly.
pub const ACTIVE_TARIFF_TTL_SECS: u64 = 60;

/// Key of the tariff version currently in effect
pub fn active_tariff_key() -> String {
    format!("{}:active", TARIFF_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_tariff_key() {
        assert_eq!(active_tariff_key(), "tariff:active");
        assert!(active_tariff_key().starts_with(TARIFF_PREFIX));
    }
}
