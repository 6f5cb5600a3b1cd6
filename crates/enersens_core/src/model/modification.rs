//! Modification log rows and the typed records derived from them

use serde::{Deserialize, Serialize};

use super::{BuildingId, Scope};

/// A cell of the modification log that may hold text or a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric interpretation of the cell, `None` when it does not parse
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    pub fn to_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One row of a `modifications_detail_*` log, exactly as written by the
/// modification generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawModificationRow {
    pub building_id: BuildingId,
    pub variant_id: String,
    #[serde(default)]
    pub category: String,
    pub object_type: String,
    pub object_name: String,
    pub field_name: String,
    #[serde(default)]
    pub original_value: Option<CellValue>,
    #[serde(default)]
    pub new_value: Option<CellValue>,
}

/// A parsed modification with its computed change and resolved scope.
///
/// `param_delta` is `None` when either value is not numeric. `param_pct_change`
/// is additionally `None` when the original value is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationRecord {
    pub building_id: BuildingId,
    pub variant_id: String,
    pub category: String,
    pub object_type: String,
    pub object_name: String,
    pub field_name: String,
    pub original_value: Option<CellValue>,
    pub new_value: Option<CellValue>,
    pub param_delta: Option<f64>,
    pub param_pct_change: Option<f64>,
    pub scope: Scope,
    pub affected_zones: Vec<String>,
}

impl ModificationRecord {
    /// Grouping key shared by every object of the same type
    pub fn param_key(&self) -> String {
        format!("{}*{}*{}", self.category, self.object_type, self.field_name)
    }

    /// Key that also identifies the concrete object, used for matrix pivots
    pub fn qualified_key(&self) -> String {
        format!(
            "{}*{}*{}*{}",
            self.category, self.object_type, self.object_name, self.field_name
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.param_delta.is_some()
    }
}

/// Change between two parameter values.
///
/// Returns `(delta, pct_change)`; a zero original value leaves the
/// percentage undefined rather than zero.
pub fn parameter_change(original: Option<f64>, new: Option<f64>) -> (Option<f64>, Option<f64>) {
    let (Some(original), Some(new)) = (original, new) else {
        return (None, None);
    };
    let delta = new - original;
    let pct_change = (original != 0.0).then(|| delta / original * 100.0);
    (Some(delta), pct_change)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_parsing() {
        assert_eq!(CellValue::from("  12.5 ").as_f64(), Some(12.5));
        assert_eq!(CellValue::from(3.0).as_f64(), Some(3.0));
        assert_eq!(CellValue::from("autosize").as_f64(), None);
        assert_eq!(CellValue::from("NaN").as_f64(), None);
    }

    #[test]
    fn test_parameter_change_zero_original_is_missing() {
        assert_eq!(parameter_change(Some(0.0), Some(5.0)), (Some(5.0), None));
    }

    #[test]
    fn test_parameter_change_regular() {
        let (delta, pct) = parameter_change(Some(20.0), Some(25.0));
        assert_eq!(delta, Some(5.0));
        assert!((pct.unwrap() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_parameter_change_non_numeric() {
        assert_eq!(parameter_change(None, Some(5.0)), (None, None));
    }

    #[test]
    fn test_raw_row_accepts_mixed_cells() {
        let json = r#"{
            "building_id": "4136733",
            "variant_id": "variant_0",
            "category": "hvac",
            "object_type": "ZoneHVAC:IdealLoadsAirSystem",
            "object_name": "Zone1 Ideal Loads",
            "field_name": "Maximum Heating Supply Air Temperature",
            "original_value": "50",
            "new_value": 45.5
        }"#;
        let row: RawModificationRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.original_value.unwrap().as_f64(), Some(50.0));
        assert_eq!(row.new_value.unwrap().as_f64(), Some(45.5));
    }
}
