use crate::error::MlogitError;

/// One effect on the right-hand side of a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectToken {
    /// A single variable: categorical by default, continuous when written
    /// with the `direct.` prefix.
    Main { name: String, direct: bool },
    /// An interaction written `a*b*c`; components name main effects.
    Interaction(Vec<String>),
}

/// A parsed model formula: `dataset dv = effect effect ...`
///
/// # Syntax
/// - bare name: categorical main effect
/// - `direct.name`: direct (continuous) main effect
/// - `a*b*c`: interaction of previously declared main effects
/// - no effects after `=`: intercept-only model
///
/// # Examples
/// ```
/// use mlogit::formula::{EffectToken, Formula};
///
/// let f = Formula::parse("cars origin = cylinders direct.weight cylinders*year").unwrap();
/// assert_eq!(f.dataset, "cars");
/// assert_eq!(f.dependent, "origin");
/// assert_eq!(f.effects.len(), 3);
/// assert_eq!(
///     f.effects[1],
///     EffectToken::Main { name: "weight".into(), direct: true }
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Formula {
    /// Name of the dataset the model is fit on.
    pub dataset: String,
    /// Name of the dependent variable.
    pub dependent: String,
    /// Effects in declaration order.
    pub effects: Vec<EffectToken>,
}

impl Formula {
    /// Parse a formula string.
    pub fn parse(text: &str) -> Result<Self, MlogitError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < 3 || tokens[2] != "=" {
            return Err(MlogitError::FormulaError(format!(
                "expected 'dataset depvar = effects...', got: '{}'",
                text.trim()
            )));
        }

        let dataset = tokens[0].to_string();
        let dependent = tokens[1].to_string();

        let mut effects = Vec::new();
        for tok in &tokens[3..] {
            if tok.contains('*') {
                let parts: Vec<String> = tok.split('*').map(str::to_string).collect();
                if parts.iter().any(String::is_empty) {
                    return Err(MlogitError::FormulaError(format!(
                        "malformed interaction term '{}'",
                        tok
                    )));
                }
                effects.push(EffectToken::Interaction(parts));
            } else if let Some(name) = tok.strip_prefix("direct.") {
                if name.is_empty() {
                    return Err(MlogitError::FormulaError(format!(
                        "malformed direct effect '{}'",
                        tok
                    )));
                }
                effects.push(EffectToken::Main {
                    name: name.to_string(),
                    direct: true,
                });
            } else {
                effects.push(EffectToken::Main {
                    name: tok.to_string(),
                    direct: false,
                });
            }
        }

        Ok(Formula {
            dataset,
            dependent,
            effects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_formula() {
        let f = Formula::parse("tab y = a b").unwrap();
        assert_eq!(f.dataset, "tab");
        assert_eq!(f.dependent, "y");
        assert_eq!(
            f.effects,
            vec![
                EffectToken::Main { name: "a".into(), direct: false },
                EffectToken::Main { name: "b".into(), direct: false },
            ]
        );
    }

    #[test]
    fn test_direct_effect() {
        let f = Formula::parse("tab y = direct.age").unwrap();
        assert_eq!(
            f.effects,
            vec![EffectToken::Main { name: "age".into(), direct: true }]
        );
    }

    #[test]
    fn test_interaction() {
        let f = Formula::parse("tab y = a b a*b*c").unwrap();
        assert_eq!(
            f.effects[2],
            EffectToken::Interaction(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_intercept_only() {
        let f = Formula::parse("tab y =").unwrap();
        assert!(f.effects.is_empty());
    }

    #[test]
    fn test_invalid_formulas() {
        assert!(Formula::parse("y a b").is_err());
        assert!(Formula::parse("tab y").is_err());
        assert!(Formula::parse("tab y = a**b").is_err());
        assert!(Formula::parse("tab y = direct.").is_err());
    }
}
