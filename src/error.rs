use thiserror::Error;

/// Custom error types for the mlogit library.
#[derive(Error, Debug)]
pub enum MlogitError {
    /// Error thrown when input dimensions (shapes) do not match expectation.
    #[error("Dimension mismatch: {0}")]
    ShapeMismatch(String),

    /// The information matrix stopped being positive definite during
    /// Cholesky factorization. Surfaced by the driver as non-convergence.
    #[error("Information matrix is not positive definite")]
    NotPositiveDefinite,

    /// A zero diagonal was found while inverting the triangular factor.
    #[error("Singular triangular factor encountered during inversion")]
    SingularFactor,

    /// The triangular self-product was handed mismatched operands.
    #[error("Triangular product shape mismatch: {0}")]
    ProductShape(String),

    /// Error thrown when parsing a formula string.
    #[error("Formula parsing error: {0}")]
    FormulaError(String),

    /// Error thrown when a variable is not found in the data.
    #[error("Variable not found in data: {0}")]
    VariableNotFound(String),

    /// Error thrown when a dataset name is not registered in the session.
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// The dependent variable has fewer than two observed levels.
    #[error("Dependent variable '{0}' has fewer than two observed levels")]
    DegenerateResponse(String),

    /// Error thrown when an invalid operation is requested.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Wrapper for errors coming from the csv reader.
    #[error("CSV import error: {0}")]
    CsvError(#[from] csv::Error),
}

impl MlogitError {
    /// Numeric stage code reported for inversion failures: 11 for the
    /// Cholesky factorization, 12 for triangular back-substitution, 13 for
    /// the triangular self-product. Zero for every other error.
    pub fn stage_code(&self) -> u8 {
        match self {
            MlogitError::NotPositiveDefinite => 11,
            MlogitError::SingularFactor => 12,
            MlogitError::ProductShape(_) => 13,
            _ => 0,
        }
    }
}
