//! External result loaders and the cache that sits in front of them.
//!
//! Loading simulation outputs is the job of an external collaborator that
//! implements [`SimulationResultsSource`]. [`ResultsCache`] memoizes its
//! results per `(result type, categories)` and is owned by the caller, so
//! there is no hidden process-wide state and `clear()` is explicit.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::error::LoadError;
use crate::model::{ResultTable, ResultType, SimulationResults, ValidationScores};

/// Provider of base/modified simulation outputs and validation scores
pub trait SimulationResultsSource {
    /// Load base and modified tables for `categories` (all categories when
    /// empty) at the given resolution
    fn load_simulation_results(
        &self,
        result_type: ResultType,
        categories: &[String],
    ) -> Result<SimulationResults, LoadError>;

    /// CVRMSE scores per building, if the study has been validated
    fn load_validation_scores(&self) -> Result<Option<ValidationScores>, LoadError> {
        Ok(None)
    }
}

type CacheKey = (ResultType, Vec<String>);

/// Memoizing wrapper around a [`SimulationResultsSource`]
#[derive(Debug)]
pub struct ResultsCache<S> {
    source: S,
    entries: FxHashMap<CacheKey, SimulationResults>,
}

impl<S: SimulationResultsSource> ResultsCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: FxHashMap::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return cached results or load them. Categories are order-insensitive.
    pub fn get_or_load(
        &mut self,
        result_type: ResultType,
        categories: &[String],
    ) -> Result<&SimulationResults, LoadError> {
        match self.entries.entry(cache_key(result_type, categories)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let results = self
                    .source
                    .load_simulation_results(result_type, &entry.key().1)?;
                tracing::debug!(
                    result_type = %result_type,
                    categories = entry.key().1.len(),
                    "cached simulation results"
                );
                Ok(entry.insert(results))
            }
        }
    }

    pub fn contains(&self, result_type: ResultType, categories: &[String]) -> bool {
        self.entries
            .contains_key(&cache_key(result_type, categories))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn cache_key(result_type: ResultType, categories: &[String]) -> CacheKey {
    let mut categories = categories.to_vec();
    categories.sort_unstable();
    categories.dedup();
    (result_type, categories)
}

/// Source backed by tables already in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub results: FxHashMap<ResultType, SimulationResults>,
    pub validation: Option<ValidationScores>,
}

impl InMemorySource {
    pub fn new(result_type: ResultType, results: SimulationResults) -> Self {
        Self {
            results: FxHashMap::from_iter([(result_type, results)]),
            validation: None,
        }
    }

    pub fn with_validation(mut self, validation: ValidationScores) -> Self {
        self.validation = Some(validation);
        self
    }
}

impl SimulationResultsSource for InMemorySource {
    fn load_simulation_results(
        &self,
        result_type: ResultType,
        categories: &[String],
    ) -> Result<SimulationResults, LoadError> {
        let Some(all) = self.results.get(&result_type) else {
            return Ok(SimulationResults::default());
        };
        if categories.is_empty() {
            return Ok(all.clone());
        }
        Ok(SimulationResults {
            base: pick_categories(&all.base, categories),
            modified: pick_categories(&all.modified, categories),
        })
    }

    fn load_validation_scores(&self) -> Result<Option<ValidationScores>, LoadError> {
        Ok(self.validation.clone())
    }
}

fn pick_categories(
    tables: &FxHashMap<String, ResultTable>,
    categories: &[String],
) -> FxHashMap<String, ResultTable> {
    categories
        .iter()
        .filter_map(|c| tables.get(c).map(|table| (c.clone(), table.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::model::ResultRow;

    struct CountingSource {
        loads: Cell<usize>,
    }

    impl SimulationResultsSource for CountingSource {
        fn load_simulation_results(
            &self,
            _result_type: ResultType,
            _categories: &[String],
        ) -> Result<SimulationResults, LoadError> {
            self.loads.set(self.loads.get() + 1);
            Ok(SimulationResults::default())
        }
    }

    #[test]
    fn test_cache_loads_once_per_key() {
        let mut cache = ResultsCache::new(CountingSource { loads: Cell::new(0) });
        let energy = vec!["energy".to_string(), "zones".to_string()];
        let reversed = vec!["zones".to_string(), "energy".to_string()];

        cache.get_or_load(ResultType::Daily, &energy).unwrap();
        cache.get_or_load(ResultType::Daily, &reversed).unwrap();
        assert_eq!(cache.source().loads.get(), 1);
        assert!(cache.contains(ResultType::Daily, &energy));

        cache.get_or_load(ResultType::Monthly, &energy).unwrap();
        assert_eq!(cache.source().loads.get(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        cache.get_or_load(ResultType::Daily, &energy).unwrap();
        assert_eq!(cache.source().loads.get(), 3);
    }

    #[test]
    fn test_in_memory_source_filters_categories() {
        let table = ResultTable::new(vec![ResultRow::building("b1", "Electricity", 1.0)]);
        let results = SimulationResults {
            base: FxHashMap::from_iter([
                ("energy".to_string(), table.clone()),
                ("comfort".to_string(), table.clone()),
            ]),
            modified: FxHashMap::from_iter([("energy".to_string(), table)]),
        };
        let source = InMemorySource::new(ResultType::Daily, results);

        let loaded = source
            .load_simulation_results(ResultType::Daily, &["energy".to_string()])
            .unwrap();
        assert_eq!(loaded.base.len(), 1);
        assert_eq!(loaded.shared_categories(), vec!["energy"]);

        let missing = source
            .load_simulation_results(ResultType::Hourly, &[])
            .unwrap();
        assert!(missing.is_empty());
    }
}
