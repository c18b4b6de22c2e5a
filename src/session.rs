use crate::dataset::Dataset;
use crate::error::MlogitError;
use crate::formula::Formula;
use crate::mlogit::{Mlogit, MlogitResult};
use crate::Parameterization;
use log::debug;
use std::collections::HashMap;

/// Free-form option bag. The estimator consumes only `params`
/// (`"centerpoint"`, the default, or `"dummy"`); other keys are stored and
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: HashMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The categorical encoding scheme selected by the `params` option.
    pub fn parameterization(&self) -> Parameterization {
        match self.get("params") {
            Some("dummy") => Parameterization::Dummy,
            Some("centerpoint") | None => Parameterization::CenterPoint,
            Some(other) => {
                debug!("unknown params value '{}', using centerpoint", other);
                Parameterization::CenterPoint
            }
        }
    }
}

/// An explicit session handle: the dataset registry plus the option bag.
/// Only the registry outlives a model fit; every estimation entry point
/// borrows the session immutably, so fits are re-entrant.
#[derive(Debug, Default)]
pub struct Session {
    datasets: HashMap<String, Dataset>,
    options: Options,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// Register a dataset under a name. Re-registering replaces it.
    pub fn add_dataset(&mut self, name: &str, data: Dataset) {
        self.datasets.insert(name.to_string(), data);
    }

    /// Look up a registered dataset.
    pub fn dataset(&self, name: &str) -> Result<&Dataset, MlogitError> {
        self.datasets
            .get(name)
            .ok_or_else(|| MlogitError::DatasetNotFound(name.to_string()))
    }

    /// Mutable lookup, e.g. to declare a weight variable after import.
    pub fn dataset_mut(&mut self, name: &str) -> Result<&mut Dataset, MlogitError> {
        self.datasets
            .get_mut(name)
            .ok_or_else(|| MlogitError::DatasetNotFound(name.to_string()))
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Parse and fit a model in one call:
    /// `session.logreg("cars origin = cylinders direct.weight")`.
    pub fn logreg(&self, text: &str) -> Result<MlogitResult, MlogitError> {
        let formula = Formula::parse(text)?;
        Mlogit::from_formula(&formula, self)
    }
}
