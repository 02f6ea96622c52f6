//! Booking entity identity
//!
//! Ranges and usages are owned by an entity: a corporate client or an
//! office user. The entity is threaded explicitly through every call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of entity that owns consignment ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Corporate client booking through its own portal
    Corporate,
    /// Office user booking at a counter
    Office,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Corporate => write!(f, "corporate"),
            EntityType::Office => write!(f, "office"),
        }
    }
}

impl EntityType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "corporate" => Some(EntityType::Corporate),
            "office" | "office_user" | "officeuser" => Some(EntityType::Office),
            _ => None,
        }
    }
}

/// Reference to the entity a booking is made for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    pub fn corporate(entity_id: impl Into<String>) -> Self {
        Self::new(EntityType::Corporate, entity_id)
    }

    pub fn office(entity_id: impl Into<String>) -> Self {
        Self::new(EntityType::Office, entity_id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_parse() {
        assert_eq!(EntityType::from_str("Corporate"), Some(EntityType::Corporate));
        assert_eq!(EntityType::from_str(" office "), Some(EntityType::Office));
        assert_eq!(EntityType::from_str("admin"), None);
    }

    #[test]
    fn test_entity_display() {
        assert_eq!(EntityRef::corporate("c-17").to_string(), "corporate:c-17");
    }
}
