use thiserror::Error;

/// Errors raised while checking a problem instance, before any solve begins.
///
/// Each variant names the input field at fault so callers can report it back
/// verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} has length {found}, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{field} row {row} has {found} entries, expected {expected}")]
    RowLength {
        field: &'static str,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{field} contains a non-finite value at index {index}")]
    NonFinite { field: &'static str, index: usize },
    #[error("invalid bounds for variable {var}: lower {lower}, upper {upper:?}")]
    InvalidBounds {
        var: usize,
        lower: f64,
        upper: Option<f64>,
    },
    #[error("{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ProblemError {
    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            ProblemError::Empty { field }
            | ProblemError::LengthMismatch { field, .. }
            | ProblemError::RowLength { field, .. }
            | ProblemError::NonFinite { field, .. }
            | ProblemError::InvalidValue { field, .. } => field,
            ProblemError::InvalidBounds { .. } => "bounds",
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ProblemError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Check that every value in `values` is finite.
pub(crate) fn ensure_finite(field: &'static str, values: &[f64]) -> Result<(), ProblemError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ProblemError::NonFinite { field, index }),
        None => Ok(()),
    }
}

/// Check that `rows` is a dense matrix with `width` columns and finite entries.
pub(crate) fn ensure_matrix(
    field: &'static str,
    rows: &[Vec<f64>],
    width: usize,
) -> Result<(), ProblemError> {
    for (row, values) in rows.iter().enumerate() {
        if values.len() != width {
            return Err(ProblemError::RowLength {
                field,
                row,
                expected: width,
                found: values.len(),
            });
        }
        if let Some(col) = values.iter().position(|v| !v.is_finite()) {
            return Err(ProblemError::NonFinite {
                field,
                index: row * width + col,
            });
        }
    }
    Ok(())
}
