//! Standardization used by the kernel models.
//!
//! The scaler is fitted on training rows only and then applied to every
//! matrix the model sees afterwards, so fold-test rows never leak into it.

use ndarray::{Array1, Array2, Axis};

/// Per-column mean/std standard scaler.
#[derive(Clone, Debug)]
pub struct Scaler {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl Scaler {
    /// Minimum stddev to avoid division by zero when transforming.
    const MIN_STD: f64 = 1e-6;

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.std
    }
}

/// Fit a `Scaler` on `x`, rows are samples and columns are features.
///
/// An empty matrix yields an identity scaler.
pub fn fit_scaler(x: &Array2<f64>) -> Scaler {
    let ncols = x.ncols();
    let mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(ncols));
    let std = if x.nrows() == 0 {
        Array1::ones(ncols)
    } else {
        x.std_axis(Axis(0), 0.0).mapv(|s| s.max(Scaler::MIN_STD))
    };
    Scaler { mean, std }
}

/// Fit a scaler and return it with the transformed matrix.
pub fn fit_transform(x: &Array2<f64>) -> (Scaler, Array2<f64>) {
    let scaler = fit_scaler(x);
    let scaled = scaler.transform(x);
    (scaler, scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_standardizes_columns() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let (scaler, scaled) = fit_transform(&x);

        assert!((scaler.mean[0] - 3.0).abs() < 1e-12);
        let col0 = scaled.column(0);
        assert!(col0.sum().abs() < 1e-12);
        assert!((col0.mapv(|v| v * v).mean().unwrap() - 1.0).abs() < 1e-12);

        // Constant column maps to zero instead of NaN.
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let train = array![[0.0], [2.0]];
        let scaler = fit_scaler(&train);
        let test = array![[4.0]];
        assert!((scaler.transform(&test)[[0, 0]] - 3.0).abs() < 1e-12);
    }
}
