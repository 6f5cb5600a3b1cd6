//! Baseline-vs-modified output deltas

use serde::{Deserialize, Serialize};

use super::BuildingId;

/// Change of one output variable for one building, or one zone of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDelta {
    pub building_id: BuildingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub output_variable: String,
    pub base_value: f64,
    pub modified_value: f64,
    pub delta: f64,
    pub pct_change: f64,
}

impl OutputDelta {
    pub fn new(
        building_id: BuildingId,
        zone: Option<String>,
        output_variable: impl Into<String>,
        base_value: f64,
        modified_value: f64,
    ) -> Self {
        let delta = modified_value - base_value;
        Self {
            building_id,
            zone,
            output_variable: output_variable.into(),
            base_value,
            modified_value,
            delta,
            pct_change: output_pct_change(base_value, modified_value),
        }
    }
}

/// Percentage change of an output. A zero base yields 0, unlike parameter
/// changes where a zero original value leaves the percentage undefined.
pub fn output_pct_change(base: f64, modified: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        (modified - base) / base * 100.0
    }
}

/// Collection of output deltas at one structural level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeltaTable {
    pub deltas: Vec<OutputDelta>,
}

impl DeltaTable {
    pub fn new(deltas: Vec<OutputDelta>) -> Self {
        Self { deltas }
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputDelta> {
        self.deltas.iter()
    }

    /// Deltas of one building (building-level rows only)
    pub fn for_building<'a>(
        &'a self,
        building_id: &'a BuildingId,
    ) -> impl Iterator<Item = &'a OutputDelta> + 'a {
        self.deltas
            .iter()
            .filter(move |d| d.zone.is_none() && &d.building_id == building_id)
    }

    /// Deltas of one zone of one building. Zone names compare case-insensitively.
    pub fn for_zone<'a>(
        &'a self,
        building_id: &'a BuildingId,
        zone: &'a str,
    ) -> impl Iterator<Item = &'a OutputDelta> + 'a {
        self.deltas.iter().filter(move |d| {
            &d.building_id == building_id
                && d.zone
                    .as_deref()
                    .is_some_and(|z| z.eq_ignore_ascii_case(zone))
        })
    }

    pub fn get(
        &self,
        building_id: &BuildingId,
        zone: Option<&str>,
        output_variable: &str,
    ) -> Option<&OutputDelta> {
        self.deltas.iter().find(|d| {
            &d.building_id == building_id
                && d.output_variable == output_variable
                && match (zone, d.zone.as_deref()) {
                    (None, None) => true,
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    _ => false,
                }
        })
    }

    /// Distinct output variables, sorted
    pub fn output_variables(&self) -> Vec<String> {
        let mut variables: Vec<String> = self
            .deltas
            .iter()
            .map(|d| d.output_variable.clone())
            .collect();
        variables.sort_unstable();
        variables.dedup();
        variables
    }
}

impl FromIterator<OutputDelta> for DeltaTable {
    fn from_iter<I: IntoIterator<Item = OutputDelta>>(iter: I) -> Self {
        Self {
            deltas: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_base_pct_change_is_zero() {
        let delta = OutputDelta::new(BuildingId::from("b1"), None, "Electricity", 0.0, 5.0);
        assert_eq!(delta.delta, 5.0);
        assert_eq!(delta.pct_change, 0.0);
    }

    #[test]
    fn test_pct_change() {
        let delta = OutputDelta::new(BuildingId::from("b1"), None, "Electricity", 200.0, 150.0);
        assert!((delta.pct_change + 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_lookup_by_zone() {
        let building = BuildingId::from("b1");
        let table = DeltaTable::new(vec![
            OutputDelta::new(building.clone(), Some("Core".into()), "Heating", 10.0, 12.0),
            OutputDelta::new(building.clone(), None, "Heating", 30.0, 33.0),
        ]);
        assert_eq!(table.for_zone(&building, "CORE").count(), 1);
        assert_eq!(table.for_building(&building).count(), 1);
        assert!(table.get(&building, Some("core"), "Heating").is_some());
        assert_eq!(table.output_variables(), vec!["Heating".to_string()]);
    }
}
