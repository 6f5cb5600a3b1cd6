//! Identifiers for buildings in a simulation study

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a base building model. Variants of the same model share it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub String);

impl BuildingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildingId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BuildingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A (building, zone) pair. Zone names are only unique within a building.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneKey {
    pub building_id: BuildingId,
    pub zone: String,
}

impl ZoneKey {
    pub fn new(building_id: BuildingId, zone: impl Into<String>) -> Self {
        Self {
            building_id,
            zone: zone.into(),
        }
    }
}
