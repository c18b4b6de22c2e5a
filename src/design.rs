use crate::dataset::Dataset;
use crate::error::MlogitError;
use crate::freq::{same_value, Tabulation};
use crate::model::{ModelSpec, TermKind};
use crate::Parameterization;
use ndarray::{Array1, Array2, Axis};

/// The assembled estimation inputs: X (N x K), Y (N x J), the population
/// totals n, one label per design column, and the crosstab-row to
/// population mapping.
///
/// N populations are the distinct covariate patterns of the sorted
/// crosstab; J response categories are the sorted levels of the dependent
/// variable, the largest being the omitted reference in the likelihood.
#[derive(Debug, Clone)]
pub struct Design {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub n: Array1<f64>,
    /// Design-column labels; all encoding columns of one effect share its label.
    pub labels: Vec<String>,
    /// Sorted response levels, one per Y column.
    pub response_levels: Vec<f64>,
    /// Population index of each crosstab row.
    pub pop_of_row: Vec<usize>,
    /// M: the sum of all positive observation weights.
    pub total_weight: f64,
}

impl Design {
    pub fn n_pops(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_cats(&self) -> usize {
        self.y.ncols()
    }

    pub fn n_cols(&self) -> usize {
        self.x.ncols()
    }

    /// Build the design from the sorted crosstab, the per-variable
    /// frequency tables, and the model descriptor.
    pub fn build(
        tab: &Tabulation,
        model: &ModelSpec,
        data: &Dataset,
        params: Parameterization,
    ) -> Result<Design, MlogitError> {
        let response_levels = tab.dv_table.levels();
        let j_cats = response_levels.len();
        if j_cats < 2 {
            return Err(MlogitError::DegenerateResponse(
                data.var_name(model.dv).to_string(),
            ));
        }

        let rows = tab.crosstab.rows();
        if rows.is_empty() {
            return Err(MlogitError::InvalidOperation(
                "no observations with positive weight".into(),
            ));
        }
        let n_cov = tab.crosstab.n_covariates();

        // Segment the sorted crosstab into populations: a row opens a new
        // population when its covariate prefix differs from its predecessor.
        let mut pop_of_row = Vec::with_capacity(rows.len());
        let mut pop = 0usize;
        for (r, row) in rows.iter().enumerate() {
            if r > 0 {
                let prev = &rows[r - 1].key;
                let differs = row.key[..n_cov]
                    .iter()
                    .zip(&prev[..n_cov])
                    .any(|(a, b)| !same_value(*a, *b));
                if differs {
                    pop += 1;
                }
            }
            pop_of_row.push(pop);
        }
        let n_pops = pop + 1;

        // Column counts and block offsets; the intercept occupies column 0,
        // main-effect blocks follow in declared order, then interactions.
        let mut counts = Vec::with_capacity(model.main_effects.len());
        let mut starts = Vec::with_capacity(model.main_effects.len());
        let mut k_cols = 1usize;
        for (m, effect) in model.main_effects.iter().enumerate() {
            let c = match effect.kind {
                TermKind::Direct => 1,
                TermKind::Categorical => tab.tables[m].n_levels().saturating_sub(1),
            };
            starts.push(k_cols);
            counts.push(c);
            k_cols += c;
        }
        let inter_counts: Vec<usize> = model
            .interactions
            .iter()
            .map(|group| group.iter().map(|&t| counts[t]).product())
            .collect();
        k_cols += inter_counts.iter().sum::<usize>();

        // Main-effect blocks. Each population's covariate tuple is the key
        // prefix of its first crosstab row.
        let mut first_row = vec![usize::MAX; n_pops];
        for (r, &p) in pop_of_row.iter().enumerate() {
            if first_row[p] == usize::MAX {
                first_row[p] = r;
            }
        }
        let mut x = Array2::<f64>::zeros((n_pops, k_cols));
        for p in 0..n_pops {
            let key = &rows[first_row[p]].key;
            x[[p, 0]] = 1.0;
            for (m, effect) in model.main_effects.iter().enumerate() {
                let value = key[m];
                match effect.kind {
                    TermKind::Direct => x[[p, starts[m]]] = value,
                    TermKind::Categorical => {
                        let levels = tab.tables[m].levels();
                        let reference = levels[levels.len() - 1];
                        for k in 0..counts[m] {
                            x[[p, starts[m] + k]] = contrast(params, value, levels[k], reference);
                        }
                    }
                }
            }
        }

        // Interaction blocks: Cartesian products of the constituent
        // main-effect encodings, rightmost term varying fastest.
        let mut col = 1 + counts.iter().sum::<usize>();
        for group in &model.interactions {
            let radices: Vec<usize> = group.iter().map(|&t| counts[t]).collect();
            let total: usize = radices.iter().product();
            for idx in 0..total {
                let mut digits = vec![0usize; group.len()];
                let mut rem = idx;
                for r in (0..group.len()).rev() {
                    digits[r] = rem % radices[r];
                    rem /= radices[r];
                }
                for p in 0..n_pops {
                    let mut prod = 1.0;
                    for (r, &t) in group.iter().enumerate() {
                        prod *= x[[p, starts[t] + digits[r]]];
                    }
                    x[[p, col]] = prod;
                }
                col += 1;
            }
        }

        // Response matrix: column j accumulates the weight observed for
        // (population, y_j). The last column is the omitted category,
        // retained for the deviance.
        let mut y = Array2::<f64>::zeros((n_pops, j_cats));
        for (r, row) in rows.iter().enumerate() {
            let j = response_levels
                .iter()
                .position(|l| same_value(*l, row.key[n_cov]))
                .ok_or_else(|| {
                    MlogitError::InvalidOperation(
                        "crosstab response level missing from frequency table".into(),
                    )
                })?;
            y[[pop_of_row[r], j]] += row.weight;
        }
        let n = y.sum_axis(Axis(1));
        let total_weight = n.sum();

        let mut labels = Vec::with_capacity(k_cols);
        labels.push("Intercept".to_string());
        for (m, effect) in model.main_effects.iter().enumerate() {
            let name = data.var_name(effect.var);
            for _ in 0..counts[m] {
                labels.push(name.to_string());
            }
        }
        for (g, group) in model.interactions.iter().enumerate() {
            let name = group
                .iter()
                .map(|&t| data.var_name(model.main_effects[t].var))
                .collect::<Vec<_>>()
                .join("*");
            for _ in 0..inter_counts[g] {
                labels.push(name.clone());
            }
        }

        Ok(Design {
            x,
            y,
            n,
            labels,
            response_levels,
            pop_of_row,
            total_weight,
        })
    }
}

/// Value of one encoding column for a categorical observation value.
/// The reference level is the largest sorted level: coded -1 everywhere
/// under center-point, all zeros under dummy.
fn contrast(params: Parameterization, value: f64, level: f64, reference: f64) -> f64 {
    if same_value(value, level) {
        1.0
    } else if params == Parameterization::CenterPoint && same_value(value, reference) {
        -1.0
    } else {
        0.0
    }
}
