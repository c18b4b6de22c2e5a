use crate::dataset::Dataset;
use crate::model::ModelSpec;

/// Bit-exact equality on raw IEEE-754 patterns. SYSMIS and every other
/// value, NaN payloads included, key as ordinary distinct levels.
#[inline]
pub(crate) fn same_value(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits()
}

/// Weighted frequency table for one variable: `value -> accumulated weight`,
/// materialized as rows sorted ascending by value (IEEE-754 total order).
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    /// Variable position in the dataset.
    pub var: usize,
    rows: Vec<(f64, f64)>,
}

impl FrequencyTable {
    fn new(var: usize) -> Self {
        FrequencyTable { var, rows: Vec::new() }
    }

    fn bump(&mut self, value: f64, weight: f64) {
        for row in self.rows.iter_mut() {
            if same_value(row.0, value) {
                row.1 += weight;
                return;
            }
        }
        self.rows.push((value, weight));
    }

    fn sort(&mut self) {
        self.rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    /// Number of distinct levels.
    pub fn n_levels(&self) -> usize {
        self.rows.len()
    }

    /// The distinct values in ascending order.
    pub fn levels(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.0).collect()
    }

    /// Accumulated weight for a value, by bit-exact lookup.
    pub fn weight_of(&self, value: f64) -> f64 {
        self.rows
            .iter()
            .find(|r| same_value(r.0, value))
            .map_or(0.0, |r| r.1)
    }

    /// Sorted `(value, weight)` rows.
    pub fn iter(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.rows.iter()
    }
}

/// One row of the joint crosstab: the covariate values in main-effect
/// order, the response value last, and the accumulated weight.
#[derive(Debug, Clone)]
pub struct CrosstabRow {
    pub key: Vec<f64>,
    pub weight: f64,
}

/// The joint crosstab over all model variables, keyed on the full
/// covariate+response tuple and sorted lexicographically ascending.
#[derive(Debug, Clone)]
pub struct Crosstab {
    rows: Vec<CrosstabRow>,
    n_covariates: usize,
}

impl Crosstab {
    fn bump(&mut self, key: &[f64], weight: f64) {
        for row in self.rows.iter_mut() {
            if row.key.iter().zip(key).all(|(a, b)| same_value(*a, *b)) {
                row.weight += weight;
                return;
            }
        }
        self.rows.push(CrosstabRow { key: key.to_vec(), weight });
    }

    fn sort(&mut self) {
        self.rows.sort_by(|a, b| {
            a.key
                .iter()
                .zip(&b.key)
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Number of key columns preceding the response.
    pub fn n_covariates(&self) -> usize {
        self.n_covariates
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Sorted crosstab rows.
    pub fn rows(&self) -> &[CrosstabRow] {
        &self.rows
    }
}

/// Frequency tables for every model variable plus the joint crosstab.
#[derive(Debug, Clone)]
pub struct Tabulation {
    /// Parallel to the model's main effects.
    pub tables: Vec<FrequencyTable>,
    /// Frequency table of the dependent variable.
    pub dv_table: FrequencyTable,
    pub crosstab: Crosstab,
}

/// Collapse the dataset into weighted frequency tables and the joint
/// crosstab. Observations with weight <= 0 are skipped silently; SYSMIS
/// values pass through as distinct levels. Tabulation is total over the
/// observation sequence, so there is nothing to fail.
pub fn tabulate(data: &Dataset, model: &ModelSpec) -> Tabulation {
    let mut tables: Vec<FrequencyTable> = model
        .main_effects
        .iter()
        .map(|m| FrequencyTable::new(m.var))
        .collect();
    let mut dv_table = FrequencyTable::new(model.dv);
    let n_covariates = model.main_effects.len();
    let mut crosstab = Crosstab { rows: Vec::new(), n_covariates };

    let mut key = vec![0.0; n_covariates + 1];
    for obs in 0..data.n_obs() {
        let weight = data.weight(obs);
        if weight <= 0.0 {
            continue;
        }
        for (slot, (table, effect)) in tables.iter_mut().zip(&model.main_effects).enumerate() {
            let value = data.get(obs, effect.var);
            table.bump(value, weight);
            key[slot] = value;
        }
        let response = data.get(obs, model.dv);
        dv_table.bump(response, weight);
        key[n_covariates] = response;
        crosstab.bump(&key, weight);
    }

    for table in tables.iter_mut() {
        table.sort();
    }
    dv_table.sort();
    crosstab.sort();

    Tabulation { tables, dv_table, crosstab }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, SYSMIS};
    use crate::model::{ModelSpec, TermKind};

    fn small() -> (Dataset, ModelSpec) {
        let mut ds = Dataset::from_rows(
            vec!["x".into(), "y".into(), "w".into()],
            &[
                vec![1.0, 0.0, 2.0],
                vec![0.0, 1.0, 3.0],
                vec![1.0, 0.0, 4.0],
                vec![0.0, 1.0, -1.0],
                vec![0.0, 0.0, 0.0],
            ],
        )
        .unwrap();
        ds.set_weight_var("w").unwrap();
        let mut model = ModelSpec::new(1);
        model.add_main_effect(0, TermKind::Categorical);
        (ds, model)
    }

    #[test]
    fn test_weighted_counts_and_order() {
        let (ds, model) = small();
        let tab = tabulate(&ds, &model);
        let x = &tab.tables[0];
        assert_eq!(x.levels(), vec![0.0, 1.0]);
        assert_eq!(x.weight_of(0.0), 3.0);
        assert_eq!(x.weight_of(1.0), 6.0);
        // nonpositive weights are skipped entirely
        assert_eq!(tab.dv_table.weight_of(1.0), 3.0);
    }

    #[test]
    fn test_crosstab_sorted_lexicographically() {
        let (ds, model) = small();
        let tab = tabulate(&ds, &model);
        let keys: Vec<Vec<f64>> = tab.crosstab.rows().iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(tab.crosstab.rows()[1].weight, 6.0);
        assert_eq!(tab.crosstab.n_covariates(), 1);
    }

    #[test]
    fn test_sysmis_is_a_distinct_level() {
        let ds = Dataset::from_rows(
            vec!["x".into(), "y".into()],
            &[vec![SYSMIS, 0.0], vec![1.0, 0.0], vec![SYSMIS, 0.0]],
        )
        .unwrap();
        let mut model = ModelSpec::new(1);
        model.add_main_effect(0, TermKind::Categorical);
        let tab = tabulate(&ds, &model);
        assert_eq!(tab.tables[0].n_levels(), 2);
        // SYSMIS is the most negative finite value, so it sorts first
        assert_eq!(tab.tables[0].levels()[0], SYSMIS);
        assert_eq!(tab.tables[0].weight_of(SYSMIS), 2.0);
    }
}
