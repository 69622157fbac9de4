use ndarray::{Array1, Array2};

use crate::config::ClassifierFamily;
use crate::error::{ClassifierError, Result};

/// Contract shared by every binary classifier the evaluator can drive.
///
/// Labels follow the 0/1 convention, class 1 being a career of five years or
/// more. Implementations must be usable from a fresh instance: the evaluator
/// builds a new classifier for every fold through the factory.
pub trait Classifier: Send {
    /// Fit the model on `x` (rows are samples) and `y` (0/1 labels).
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<()>;

    /// Probability of class 1 for every row of `x`, in `[0, 1]`.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard 0/1 predictions, thresholding `predict_proba` at 0.5.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>> {
        Ok(self.predict_proba(x)?.mapv(|p| u8::from(p >= 0.5)))
    }

    /// Human readable name for logs and errors.
    fn name(&self) -> &str {
        "classifier"
    }

    /// Registered family, `None` for custom implementations.
    fn family(&self) -> Option<ClassifierFamily> {
        None
    }

    /// Feature width seen during `fit`, `None` before fitting.
    fn n_features(&self) -> Option<usize> {
        None
    }

    /// Serialize the fitted state.
    fn to_json(&self) -> Result<serde_json::Value> {
        Err(ClassifierError::UnsupportedPersistence(
            self.name().to_string(),
        ))
    }
}

/// Shared input checks for `fit`.
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<u8>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ClassifierError::ShapeMismatch {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ClassifierError::InvalidParameter(
            "cannot fit on an empty dataset".to_string(),
        ));
    }
    if let Some(bad) = y.iter().find(|&&label| label > 1) {
        return Err(ClassifierError::InvalidLabel(*bad as f64));
    }
    Ok(())
}

/// Shared input checks for `predict_proba`.
pub(crate) fn check_width(expected: Option<usize>, x: &Array2<f64>) -> Result<usize> {
    let expected = expected.ok_or(ClassifierError::NotFitted)?;
    if x.ncols() != expected {
        return Err(ClassifierError::ShapeMismatch {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(expected)
}
