//! Shared builders for scenario tests

use rustc_hash::FxHashMap;

use crate::analysis::{BuildingTopology, TopologyRegistry};
use crate::model::{BuildingId, CellValue, RawModificationRow, ResultRow, ResultTable, ResultType, SimulationResults};
use crate::source::{InMemorySource, ResultsCache};

pub const HEATING: &str = "Heating:EnergyTransfer";
pub const ELECTRICITY: &str = "Electricity:Facility";

pub fn row(
    building: &str,
    category: &str,
    object_type: &str,
    object_name: &str,
    original: f64,
    new: f64,
) -> RawModificationRow {
    RawModificationRow {
        building_id: BuildingId::from(building),
        variant_id: format!("{building}_v1"),
        category: category.to_string(),
        object_type: object_type.to_string(),
        object_name: object_name.to_string(),
        field_name: "Value".to_string(),
        original_value: Some(CellValue::from(original)),
        new_value: Some(CellValue::from(new)),
    }
}

/// Two-zone office with one terminal unit in each zone
pub fn office_topology(building: &str) -> TopologyRegistry {
    TopologyRegistry::from_iter([(
        BuildingId::from(building),
        BuildingTopology::with_zones(&["Core_ZN", "East_ZN"])
            .equipment("Core VAV Box", "Core_ZN")
            .equipment("East VAV Box", "East_ZN")
            .volume("Core_ZN", 300.0)
            .volume("East_ZN", 100.0),
    )])
}

pub fn results(category: &str, base: Vec<ResultRow>, modified: Vec<ResultRow>) -> SimulationResults {
    SimulationResults {
        base: FxHashMap::from_iter([(category.to_string(), ResultTable::new(base))]),
        modified: FxHashMap::from_iter([(category.to_string(), ResultTable::new(modified))]),
    }
}

pub fn cache(results: SimulationResults) -> ResultsCache<InMemorySource> {
    ResultsCache::new(InMemorySource::new(ResultType::Daily, results))
}
