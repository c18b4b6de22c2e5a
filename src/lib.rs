//! Maximum likelihood estimation of multinomial (polytomous) logistic
//! regression models.
//!
//! A fit runs in three stages: the raw observations are collapsed into a
//! weighted crosstabulation ([freq]), the crosstab is segmented into
//! populations and encoded into a design matrix ([design]), and
//! Newton-Raphson iteration with the analytic gradient and Hessian drives
//! the estimates to convergence ([mlogit]).
//!
//! ```
//! use mlogit::{Dataset, Session};
//!
//! let mut ds = Dataset::new(vec!["x".into(), "y".into(), "w".into()]).unwrap();
//! ds.push_row(&[0.0, 0.0, 40.0]).unwrap();
//! ds.push_row(&[0.0, 1.0, 10.0]).unwrap();
//! ds.push_row(&[1.0, 0.0, 20.0]).unwrap();
//! ds.push_row(&[1.0, 1.0, 30.0]).unwrap();
//! ds.set_weight_var("w").unwrap();
//!
//! let mut session = Session::new();
//! session.add_dataset("tab", ds);
//! let result = session.logreg("tab y = x").unwrap();
//! assert!(result.converged);
//! println!("{}", result);
//! ```

pub mod dataset;
pub mod design;
pub mod error;
pub mod formula;
pub mod freq;
pub mod linalg;
pub mod mlogit;
pub mod model;
pub mod newton;
pub mod session;

pub use dataset::{Dataset, SYSMIS};
pub use design::Design;
pub use error::MlogitError;
pub use formula::{EffectToken, Formula};
pub use freq::{tabulate, Crosstab, CrosstabRow, FrequencyTable, Tabulation};
pub use mlogit::{FitTest, Mlogit, MlogitResult, EPSILON, MAX_ITER};
pub use model::{MainEffect, ModelSpec, TermKind};
pub use newton::{newton_step, NewtonStep};
pub use session::{Options, Session};

/// Full-rank encoding scheme for categorical main effects. Either way the
/// reference level is the largest sorted value of the variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameterization {
    /// Center-point coding: 1 at the matching level, -1 across the whole
    /// block at the reference level, 0 elsewhere. The default.
    CenterPoint,
    /// Dummy coding: 1 at the matching level, 0 elsewhere; the reference
    /// level is the all-zeros row.
    Dummy,
}
