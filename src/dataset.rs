use crate::error::MlogitError;
use std::io::Read;
use std::path::Path;

/// Sentinel for a logically missing datum: the most negative finite f64.
///
/// Missing values are not filtered anywhere in the estimation pipeline; a
/// SYSMIS cell simply tabulates as one more distinct level of its variable.
pub const SYSMIS: f64 = f64::MIN;

/// A rectangular numeric table: an ordered sequence of observations, each a
/// fixed-length vector of f64 indexed by variable position.
///
/// At most one column may be designated the weight column; when none is set
/// every observation carries weight 1.
///
/// # Examples
/// ```
/// use mlogit::dataset::Dataset;
///
/// let mut ds = Dataset::new(vec!["x".into(), "y".into()]).unwrap();
/// ds.push_row(&[1.0, 0.0]).unwrap();
/// ds.push_row(&[2.0, 1.0]).unwrap();
/// assert_eq!(ds.n_obs(), 2);
/// assert_eq!(ds.var_index("y"), Some(1));
/// assert_eq!(ds.weight(0), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    names: Vec<String>,
    values: Vec<f64>,
    n_obs: usize,
    weight_var: Option<usize>,
}

impl Dataset {
    /// Create an empty dataset with the given variable names.
    /// Names must be unique and non-empty.
    pub fn new(names: Vec<String>) -> Result<Self, MlogitError> {
        if names.is_empty() {
            return Err(MlogitError::InvalidOperation(
                "a dataset needs at least one variable".into(),
            ));
        }
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(MlogitError::InvalidOperation(
                    "variable names cannot be empty".into(),
                ));
            }
            if names[..i].contains(name) {
                return Err(MlogitError::InvalidOperation(format!(
                    "duplicate variable name '{}'",
                    name
                )));
            }
        }
        Ok(Dataset {
            names,
            values: Vec::new(),
            n_obs: 0,
            weight_var: None,
        })
    }

    /// Create a dataset from row-major data.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, MlogitError> {
        let mut ds = Dataset::new(names)?;
        for row in rows {
            ds.push_row(row)?;
        }
        Ok(ds)
    }

    /// Append one observation. The row length must match the variable count.
    pub fn push_row(&mut self, row: &[f64]) -> Result<(), MlogitError> {
        if row.len() != self.names.len() {
            return Err(MlogitError::ShapeMismatch(format!(
                "row has {} values, expected {}",
                row.len(),
                self.names.len()
            )));
        }
        self.values.extend_from_slice(row);
        self.n_obs += 1;
        Ok(())
    }

    /// Read a dataset from delimited text with a header row of variable
    /// names. Every field is parsed as f64; fields that do not parse are
    /// stored as [SYSMIS].
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, MlogitError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let names: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut ds = Dataset::new(names)?;

        let mut row = Vec::with_capacity(ds.n_vars());
        for record in rdr.records() {
            let record = record?;
            row.clear();
            for field in record.iter() {
                row.push(field.trim().parse::<f64>().unwrap_or(SYSMIS));
            }
            ds.push_row(&row)?;
        }
        Ok(ds)
    }

    /// Read a dataset from a CSV file on disk.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, MlogitError> {
        let file = std::fs::File::open(path.as_ref())
            .map_err(|e| MlogitError::InvalidOperation(format!("cannot open file: {}", e)))?;
        Self::from_csv_reader(file)
    }

    /// Number of observations.
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Number of variables.
    pub fn n_vars(&self) -> usize {
        self.names.len()
    }

    /// Value of variable `var` in observation `obs`.
    #[inline]
    pub fn get(&self, obs: usize, var: usize) -> f64 {
        self.values[obs * self.names.len() + var]
    }

    /// Position of a variable by name.
    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Name of the variable at `var`.
    pub fn var_name(&self, var: usize) -> &str {
        &self.names[var]
    }

    /// Designate the weight column by name.
    pub fn set_weight_var(&mut self, name: &str) -> Result<(), MlogitError> {
        match self.var_index(name) {
            Some(idx) => {
                self.weight_var = Some(idx);
                Ok(())
            }
            None => Err(MlogitError::VariableNotFound(name.to_string())),
        }
    }

    /// Index of the weight column, if one is set.
    pub fn weight_var(&self) -> Option<usize> {
        self.weight_var
    }

    /// Weight of observation `obs`: the weight-column value, or 1.
    #[inline]
    pub fn weight(&self, obs: usize) -> f64 {
        match self.weight_var {
            Some(w) => self.get(obs, w),
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_creation() {
        let mut ds = Dataset::new(vec!["x".into(), "y".into()]).unwrap();
        ds.push_row(&[1.0, 2.0]).unwrap();
        ds.push_row(&[3.0, 4.0]).unwrap();
        assert_eq!(ds.n_obs(), 2);
        assert_eq!(ds.n_vars(), 2);
        assert_eq!(ds.get(1, 0), 3.0);
        assert_eq!(ds.var_name(1), "y");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        assert!(Dataset::new(vec!["x".into(), "x".into()]).is_err());
    }

    #[test]
    fn test_row_arity_checked() {
        let mut ds = Dataset::new(vec!["x".into(), "y".into()]).unwrap();
        assert!(ds.push_row(&[1.0]).is_err());
        assert!(ds.push_row(&[1.0, 2.0, 3.0]).is_err());
        assert_eq!(ds.n_obs(), 0);
    }

    #[test]
    fn test_weight_column() {
        let mut ds = Dataset::from_rows(
            vec!["x".into(), "w".into()],
            &[vec![1.0, 5.0], vec![2.0, 7.0]],
        )
        .unwrap();
        assert_eq!(ds.weight(0), 1.0);
        ds.set_weight_var("w").unwrap();
        assert_eq!(ds.weight(0), 5.0);
        assert_eq!(ds.weight(1), 7.0);
        assert!(ds.set_weight_var("nope").is_err());
    }

    #[test]
    fn test_csv_import_with_sysmis() {
        let text = "x,y,w\n1,0,10\n2,oops,20\n";
        let ds = Dataset::from_csv_reader(text.as_bytes()).unwrap();
        assert_eq!(ds.n_obs(), 2);
        assert_eq!(ds.n_vars(), 3);
        assert_eq!(ds.get(0, 2), 10.0);
        assert_eq!(ds.get(1, 1), SYSMIS);
    }

    #[test]
    fn test_sysmis_is_most_negative_finite() {
        assert_eq!(SYSMIS, f64::MIN);
        assert!(SYSMIS.is_finite());
    }
}
