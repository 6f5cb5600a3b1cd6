//! Scope resolution for modified objects.
//!
//! Every modified object is classified as building-, zone- or
//! equipment-scoped using the static topology of its building:
//!
//! 1. Building-wide object types or names (materials, constructions,
//!    `ALL_ZONES` style names) are building scope.
//! 2. An object name that embeds a known zone name is zone scope.
//! 3. An equipment-like object type whose name is listed in the building's
//!    equipment table is equipment scope, owned by the listed zone.
//! 4. Anything else falls back to building scope.
//!
//! Resolution never fails. The fallback in step 4 silently reduces unmapped
//! zone or equipment parameters to the least granular level, so it is
//! logged at debug level for auditing.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::model::{BuildingId, Scope};

use super::pattern::{ObjectPattern, compile_all};

/// Static zone and equipment layout of one building
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingTopology {
    /// Zone names as they appear in the model
    #[serde(default)]
    pub zones: Vec<String>,
    /// Equipment object name → owning zone
    #[serde(default)]
    pub equipment_zones: FxHashMap<String, String>,
    /// Zone volumes in m³, used to weight temperature aggregation
    #[serde(default)]
    pub zone_volumes: FxHashMap<String, f64>,
}

impl BuildingTopology {
    pub fn with_zones<S: AsRef<str>>(zones: &[S]) -> Self {
        Self {
            zones: zones.iter().map(|z| z.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn equipment(mut self, object_name: &str, zone: &str) -> Self {
        self.equipment_zones
            .insert(object_name.to_string(), zone.to_string());
        self
    }

    pub fn volume(mut self, zone: &str, volume: f64) -> Self {
        self.zone_volumes.insert(zone.to_string(), volume);
        self
    }
}

/// Topology of every building in a study, keyed by building id
pub type TopologyRegistry = FxHashMap<BuildingId, BuildingTopology>;

/// Pattern sets that drive classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeRules {
    /// Object types that always apply to the whole building
    pub building_object_types: Vec<String>,
    /// Object names that denote the whole building
    pub building_object_names: Vec<String>,
    /// Object types that describe zone-owned equipment
    pub equipment_object_types: Vec<String>,
}

impl Default for ScopeRules {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            building_object_types: strings(&[
                "Material*",
                "Construction*",
                "WindowMaterial:*",
                "Building",
                "Site:*",
                "SimulationControl",
                "Timestep",
                "GlobalGeometryRules",
                "RunPeriod",
            ]),
            building_object_names: strings(&["ALL_ZONES", "ALL ZONES", "BUILDING"]),
            equipment_object_types: strings(&[
                "ZoneHVAC:*",
                "AirTerminal:*",
                "Coil:*",
                "Fan:*",
                "Pump:*",
                "Boiler:*",
                "Chiller:*",
                "ElectricEquipment*",
                "GasEquipment*",
                "Lights*",
                "HVACTemplate:Zone:*",
            ]),
        }
    }
}

/// Resolved scope of one object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeMapping {
    pub scope: Scope,
    pub affected_zones: Vec<String>,
}

impl ScopeMapping {
    pub fn building() -> Self {
        Self {
            scope: Scope::Building,
            affected_zones: Vec::new(),
        }
    }

    fn zone(zone: &str) -> Self {
        Self {
            scope: Scope::Zone,
            affected_zones: vec![zone.to_string()],
        }
    }

    fn equipment(zone: &str) -> Self {
        Self {
            scope: Scope::Equipment,
            affected_zones: vec![zone.to_string()],
        }
    }
}

/// Classifies modified objects against building topology.
///
/// `resolve` is a pure function of its arguments and the topology handed to
/// [`ScopeResolver::new`].
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    topology: TopologyRegistry,
    building_types: Vec<ObjectPattern>,
    building_names: Vec<String>,
    equipment_types: Vec<ObjectPattern>,
}

impl ScopeResolver {
    pub fn new(rules: &ScopeRules, topology: TopologyRegistry) -> Result<Self, RegistryError> {
        Ok(Self {
            topology,
            building_types: compile_all(&rules.building_object_types)?,
            building_names: rules
                .building_object_names
                .iter()
                .map(|name| name.trim().to_ascii_uppercase())
                .collect(),
            equipment_types: compile_all(&rules.equipment_object_types)?,
        })
    }

    /// Resolver with the default rules
    pub fn with_topology(topology: TopologyRegistry) -> Self {
        Self::new(&ScopeRules::default(), topology)
            .unwrap_or_else(|_| unreachable!("default scope rules are valid patterns"))
    }

    pub fn topology(&self) -> &TopologyRegistry {
        &self.topology
    }

    pub fn building_topology(&self, building_id: &BuildingId) -> Option<&BuildingTopology> {
        self.topology.get(building_id)
    }

    pub fn resolve(&self, object_name: &str, object_type: &str, building_id: &BuildingId) -> ScopeMapping {
        if self.is_building_wide(object_name, object_type) {
            return ScopeMapping::building();
        }

        let topology = self.topology.get(building_id);

        if let Some(zone) = topology.and_then(|t| match_zone(object_name, &t.zones)) {
            return ScopeMapping::zone(zone);
        }

        if self.is_equipment(object_type) {
            if let Some(zone) = topology.and_then(|t| owning_zone(object_name, &t.equipment_zones)) {
                return ScopeMapping::equipment(zone);
            }
        }

        tracing::debug!(
            building = %building_id,
            object_type,
            object_name,
            "no zone or equipment mapping, treating as building scope"
        );
        ScopeMapping::building()
    }

    fn is_building_wide(&self, object_name: &str, object_type: &str) -> bool {
        let name = object_name.trim().to_ascii_uppercase();
        self.building_types.iter().any(|p| p.matches(object_type))
            || self.building_names.iter().any(|n| *n == name)
    }

    fn is_equipment(&self, object_type: &str) -> bool {
        self.equipment_types.iter().any(|p| p.matches(object_type))
    }
}

/// Longest zone name embedded in `object_name`; ties go to the
/// lexicographically smallest name so the choice is stable.
fn match_zone<'a>(object_name: &str, zones: &'a [String]) -> Option<&'a str> {
    let haystack = object_name.to_ascii_uppercase();
    zones
        .iter()
        .filter(|zone| !zone.trim().is_empty())
        .filter(|zone| haystack.contains(&zone.trim().to_ascii_uppercase()))
        .min_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
        .map(String::as_str)
}

fn owning_zone<'a>(object_name: &str, equipment: &'a FxHashMap<String, String>) -> Option<&'a str> {
    let name = object_name.trim();
    equipment
        .get(name)
        .or_else(|| {
            equipment
                .iter()
                .filter(|(k, _)| k.trim().eq_ignore_ascii_case(name))
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(_, zone)| zone)
        })
        .map(String::as_str)
}

/// Per-building memo of resolved scopes.
///
/// Topology is static for a run, so each `(object_name, object_type)` pair is
/// resolved once per building and shared by all of its variants.
#[derive(Debug, Default)]
pub struct ScopeMappingCache {
    buildings: FxHashMap<BuildingId, FxHashMap<(String, String), ScopeMapping>>,
}

impl ScopeMappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_resolve(
        &mut self,
        resolver: &ScopeResolver,
        object_name: &str,
        object_type: &str,
        building_id: &BuildingId,
    ) -> ScopeMapping {
        self.buildings
            .entry(building_id.clone())
            .or_default()
            .entry((object_name.to_string(), object_type.to_string()))
            .or_insert_with(|| resolver.resolve(object_name, object_type, building_id))
            .clone()
    }

    /// Number of cached mappings across all buildings
    pub fn len(&self) -> usize {
        self.buildings.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.buildings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ScopeResolver {
        let topology = TopologyRegistry::from_iter([(
            BuildingId::from("b1"),
            BuildingTopology::with_zones(&["Core_ZN", "Perimeter_ZN_1", "Perimeter_ZN_10"])
                .equipment("PSZ-AC Heating Coil 1", "Perimeter_ZN_1")
                .equipment("VAV Box 3", "Core_ZN"),
        )]);
        ScopeResolver::with_topology(topology)
    }

    #[test]
    fn test_material_is_building_scope() {
        let mapping = resolver().resolve("Brick 100mm", "Material", &BuildingId::from("b1"));
        assert_eq!(mapping, ScopeMapping::building());
    }

    #[test]
    fn test_all_zones_name_is_building_scope() {
        let mapping = resolver().resolve(
            "ALL_ZONES",
            "ZoneInfiltration:DesignFlowRate",
            &BuildingId::from("b1"),
        );
        assert_eq!(mapping.scope, Scope::Building);
    }

    #[test]
    fn test_zone_token_longest_match() {
        let mapping = resolver().resolve(
            "PERIMETER_ZN_10 Infiltration",
            "ZoneInfiltration:DesignFlowRate",
            &BuildingId::from("b1"),
        );
        assert_eq!(mapping.scope, Scope::Zone);
        assert_eq!(mapping.affected_zones, vec!["Perimeter_ZN_10".to_string()]);
    }

    #[test]
    fn test_equipment_lookup() {
        let mapping = resolver().resolve(
            "VAV Box 3",
            "AirTerminal:SingleDuct:VAV:Reheat",
            &BuildingId::from("b1"),
        );
        assert_eq!(mapping.scope, Scope::Equipment);
        assert_eq!(mapping.affected_zones, vec!["Core_ZN".to_string()]);
    }

    #[test]
    fn test_equipment_lookup_case_insensitive() {
        let mapping = resolver().resolve(
            "psz-ac heating coil 1",
            "Coil:Heating:Electric",
            &BuildingId::from("b1"),
        );
        assert_eq!(mapping.scope, Scope::Equipment);
        assert_eq!(mapping.affected_zones, vec!["Perimeter_ZN_1".to_string()]);
    }

    #[test]
    fn test_unmapped_falls_back_to_building() {
        let mapping = resolver().resolve("Mystery Fan", "Fan:OnOff", &BuildingId::from("b1"));
        assert_eq!(mapping, ScopeMapping::building());

        let unknown_building =
            resolver().resolve("Core_ZN Lights", "Lights", &BuildingId::from("missing"));
        assert_eq!(unknown_building, ScopeMapping::building());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = resolver();
        let building = BuildingId::from("b1");
        let first = resolver.resolve("Core_ZN People", "People", &building);
        let second = resolver.resolve("Core_ZN People", "People", &building);
        assert_eq!(first, second);
    }

    #[test]
    fn test_cache_reuses_mapping() {
        let resolver = resolver();
        let building = BuildingId::from("b1");
        let mut cache = ScopeMappingCache::new();

        let first = cache.get_or_resolve(&resolver, "Core_ZN People", "People", &building);
        let second = cache.get_or_resolve(&resolver, "Core_ZN People", "People", &building);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
