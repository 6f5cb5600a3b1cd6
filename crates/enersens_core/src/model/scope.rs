//! Structural scopes, analysis levels and confidence classes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structural level at which a modified parameter is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Building,
    Zone,
    Equipment,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Zone => "zone",
            Self::Equipment => "equipment",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four source→target pairings the engine analyzes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    ZoneToZone,
    ZoneToBuilding,
    EquipmentToZone,
    BuildingToBuilding,
}

impl Level {
    pub const ALL: [Level; 4] = [
        Level::ZoneToZone,
        Level::ZoneToBuilding,
        Level::EquipmentToZone,
        Level::BuildingToBuilding,
    ];

    pub fn source_scope(&self) -> Scope {
        match self {
            Self::ZoneToZone | Self::ZoneToBuilding => Scope::Zone,
            Self::EquipmentToZone => Scope::Equipment,
            Self::BuildingToBuilding => Scope::Building,
        }
    }

    pub fn target_scope(&self) -> Scope {
        match self {
            Self::ZoneToZone | Self::EquipmentToZone => Scope::Zone,
            Self::ZoneToBuilding | Self::BuildingToBuilding => Scope::Building,
        }
    }

    /// Correlation multiplier for single-observation scoring.
    ///
    /// The values are carried over unchanged from the established method and
    /// have no statistical derivation.
    pub fn attenuation(&self) -> f64 {
        match self {
            Self::ZoneToZone | Self::BuildingToBuilding => 1.0,
            Self::EquipmentToZone => 0.8,
            Self::ZoneToBuilding => 0.7,
        }
    }

    /// Fixed p-value reported by single-observation scoring
    pub fn placeholder_p_value(&self) -> f64 {
        match self {
            Self::ZoneToBuilding => 0.1,
            Self::ZoneToZone | Self::EquipmentToZone | Self::BuildingToBuilding => 0.05,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZoneToZone => "zone-to-zone",
            Self::ZoneToBuilding => "zone-to-building",
            Self::EquipmentToZone => "equipment-to-zone",
            Self::BuildingToBuilding => "building-to-building",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence class derived from a p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 4] = [
        ConfidenceLevel::High,
        ConfidenceLevel::Medium,
        ConfidenceLevel::Low,
        ConfidenceLevel::VeryLow,
    ];

    /// Thresholds are strict: p = 0.01 is `Medium`, p = 0.05 is `Low`,
    /// p = 0.1 is `VeryLow`.
    pub fn from_p_value(p_value: f64) -> Self {
        if p_value < 0.01 {
            Self::High
        } else if p_value < 0.05 {
            Self::Medium
        } else if p_value < 0.1 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
