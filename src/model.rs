use crate::dataset::Dataset;
use crate::error::MlogitError;
use crate::formula::{EffectToken, Formula};
use log::warn;

/// How a main effect enters the design matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    /// Encoded as L-1 contrast columns over the variable's sorted levels.
    Categorical,
    /// Entered as its raw numeric value in a single column.
    Direct,
}

/// A registered main effect: a dataset variable plus its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainEffect {
    /// Variable position in the dataset.
    pub var: usize,
    pub kind: TermKind,
}

/// A resolved model: the dependent variable, the main effects in
/// declaration order, and interactions as ordered lists of indices into
/// `main_effects` (not into the dataset).
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub dv: usize,
    pub main_effects: Vec<MainEffect>,
    pub interactions: Vec<Vec<usize>>,
}

impl ModelSpec {
    /// New model with no effects (intercept-only).
    pub fn new(dv: usize) -> Self {
        ModelSpec {
            dv,
            main_effects: Vec::new(),
            interactions: Vec::new(),
        }
    }

    /// Register a main effect, returning its index. A variable already
    /// registered is a warning, not an error; the existing entry wins.
    pub fn add_main_effect(&mut self, var: usize, kind: TermKind) -> usize {
        if let Some(idx) = self.main_effect_of(var) {
            warn!("variable {} already registered as a main effect", var);
            return idx;
        }
        self.main_effects.push(MainEffect { var, kind });
        self.main_effects.len() - 1
    }

    /// Start a new interaction group with one term.
    pub fn new_interaction(&mut self, term: usize) {
        self.interactions.push(vec![term]);
    }

    /// Append a term to the most recent interaction group. Duplicate terms
    /// within one group are a warning, not an error.
    pub fn append_interaction(&mut self, term: usize) -> Result<(), MlogitError> {
        let group = self.interactions.last_mut().ok_or_else(|| {
            MlogitError::InvalidOperation("no interaction group to append to".into())
        })?;
        if group.contains(&term) {
            warn!("duplicate term in interaction group");
        }
        group.push(term);
        Ok(())
    }

    /// Index into `main_effects` of the effect on variable `var`, if any.
    pub fn main_effect_of(&self, var: usize) -> Option<usize> {
        self.main_effects.iter().position(|m| m.var == var)
    }

    /// Resolve a parsed formula against a dataset. Unknown variable names
    /// reject the model. Interaction components that were never declared as
    /// main effects are auto-registered as categorical, with a warning.
    pub fn from_formula(formula: &Formula, data: &Dataset) -> Result<Self, MlogitError> {
        let dv = Self::lookup(data, &formula.dependent)?;
        let mut model = ModelSpec::new(dv);

        for effect in &formula.effects {
            match effect {
                EffectToken::Main { name, direct } => {
                    let var = Self::lookup(data, name)?;
                    let kind = if *direct {
                        TermKind::Direct
                    } else {
                        TermKind::Categorical
                    };
                    model.add_main_effect(var, kind);
                }
                EffectToken::Interaction(parts) => {
                    for (i, name) in parts.iter().enumerate() {
                        let var = Self::lookup(data, name)?;
                        let term = match model.main_effect_of(var) {
                            Some(idx) => idx,
                            None => {
                                warn!(
                                    "interaction component '{}' is not a main effect; \
                                     registering it as categorical",
                                    name
                                );
                                model.add_main_effect(var, TermKind::Categorical)
                            }
                        };
                        if i == 0 {
                            model.new_interaction(term);
                        } else {
                            model.append_interaction(term)?;
                        }
                    }
                }
            }
        }
        Ok(model)
    }

    fn lookup(data: &Dataset, name: &str) -> Result<usize, MlogitError> {
        data.var_index(name).ok_or_else(|| {
            warn!("variable '{}' not found; model rejected", name);
            MlogitError::VariableNotFound(name.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;

    fn cars() -> Dataset {
        Dataset::new(vec![
            "origin".into(),
            "cylinders".into(),
            "year".into(),
            "weight".into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolution() {
        let f = Formula::parse("cars origin = cylinders direct.weight cylinders*year").unwrap();
        let m = ModelSpec::from_formula(&f, &cars()).unwrap();
        assert_eq!(m.dv, 0);
        assert_eq!(
            m.main_effects,
            vec![
                MainEffect { var: 1, kind: TermKind::Categorical },
                MainEffect { var: 3, kind: TermKind::Direct },
                // auto-registered by the interaction
                MainEffect { var: 2, kind: TermKind::Categorical },
            ]
        );
        assert_eq!(m.interactions, vec![vec![0, 2]]);
    }

    #[test]
    fn test_duplicate_main_effect_is_kept_once() {
        let f = Formula::parse("cars origin = cylinders cylinders").unwrap();
        let m = ModelSpec::from_formula(&f, &cars()).unwrap();
        assert_eq!(m.main_effects.len(), 1);
    }

    #[test]
    fn test_unknown_variable_rejects_model() {
        let f = Formula::parse("cars origin = horsepower").unwrap();
        assert!(matches!(
            ModelSpec::from_formula(&f, &cars()),
            Err(MlogitError::VariableNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_interaction_term_kept() {
        let f = Formula::parse("cars origin = cylinders cylinders*cylinders").unwrap();
        let m = ModelSpec::from_formula(&f, &cars()).unwrap();
        assert_eq!(m.interactions, vec![vec![0, 0]]);
    }
}
