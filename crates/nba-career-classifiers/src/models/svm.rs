use linfa::dataset::Pr;
use linfa::traits::Predict;
use linfa::Dataset;
use linfa_svm::{Svm, SvmParams};
use log::debug;
use ndarray::{Array1, Array2};

use crate::config::{
    ClassWeight, ClassifierFamily, Gamma, ModelConfig, ModelType, SvcParams, SvmKernel,
};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::{check_training_data, check_width, Classifier};
use crate::preprocessing::{fit_transform, Scaler};

/// Support vector classifier with Platt-scaled probabilities.
///
/// Features are standardized with statistics from the training rows before
/// reaching the solver.
pub struct SvcClassifier {
    model: Option<Svm<f64, Pr>>,
    scaler: Option<Scaler>,
    params: SvcParams,
}

impl SvcClassifier {
    const EPS: f64 = 1e-3;

    pub fn new(config: ModelConfig) -> Result<Self> {
        let params = match config.model_type {
            ModelType::Svc(p) => p,
            other => {
                return Err(ClassifierError::InvalidParameter(format!(
                    "expected svc parameters, got {}",
                    other.family()
                )))
            }
        };
        if params.c <= 0.0 {
            return Err(ClassifierError::InvalidParameter(format!(
                "C must be positive, got {}",
                params.c
            )));
        }
        Ok(Self {
            model: None,
            scaler: None,
            params,
        })
    }

    /// `(positive, negative)` penalties, scaled by the class weights.
    fn penalties(&self, y: &Array1<u8>) -> (f64, f64) {
        let c = self.params.c;
        match self.params.class_weight {
            ClassWeight::Uniform => (c, c),
            ClassWeight::Balanced => {
                let n = y.len() as f64;
                let positives = y.iter().filter(|&&l| l == 1).count().max(1) as f64;
                let negatives = (y.len() as f64 - positives).max(1.0);
                (c * n / (2.0 * positives), c * n / (2.0 * negatives))
            }
        }
    }

    /// Resolve gamma on the matrix the kernel will actually see.
    fn gamma(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols() as f64;
        match self.params.gamma {
            Gamma::Value(g) => g,
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                let n = x.len() as f64;
                let mean = x.sum() / n;
                let var = x.mapv(|v| (v - mean) * (v - mean)).sum() / n;
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }
}

impl Classifier for SvcClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<()> {
        check_training_data(x, y)?;
        let (scaler, x_scaled) = fit_transform(x);
        let (c_pos, c_neg) = self.penalties(y);

        let mut params: SvmParams<f64, Pr> =
            Svm::<f64, Pr>::params().eps(Self::EPS).pos_neg_weights(c_pos, c_neg);
        params = match self.params.kernel {
            SvmKernel::Linear => params.linear_kernel(),
            // linfa's gaussian kernel is exp(-|x - y|^2 / eps)
            SvmKernel::Rbf => params.gaussian_kernel(1.0 / self.gamma(&x_scaled)),
            SvmKernel::Poly => params.polynomial_kernel(0.0, self.params.degree as f64),
        };

        debug!(
            "Fitting SVC ({:?} kernel, C+ = {:.4}, C- = {:.4}) on {} rows",
            self.params.kernel,
            c_pos,
            c_neg,
            x.nrows()
        );
        let targets = y.mapv(|l| l == 1);
        let dataset = Dataset::new(x_scaled, targets);
        let model = <SvmParams<f64, Pr> as linfa::traits::Fit<_, _, _>>::fit(&params, &dataset)
            .map_err(|e| ClassifierError::Training(e.to_string()))?;

        self.model = Some(model);
        self.scaler = Some(scaler);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(self.n_features(), x)?;
        let (model, scaler) = match (&self.model, &self.scaler) {
            (Some(model), Some(scaler)) => (model, scaler),
            _ => return Err(ClassifierError::NotFitted),
        };
        let predictions = model.predict(scaler.transform(x));
        Ok(predictions
            .targets()
            .iter()
            .map(|&p| (*p as f64).clamp(0.0, 1.0))
            .collect())
    }

    fn name(&self) -> &str {
        "SVC"
    }

    fn family(&self) -> Option<ClassifierFamily> {
        Some(ClassifierFamily::Svc)
    }

    fn n_features(&self) -> Option<usize> {
        self.scaler.as_ref().map(|s| s.mean.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn data() -> (Array2<f64>, Array1<u8>) {
        let x = array![
            [0.1, 1.0],
            [0.4, -1.0],
            [0.6, 1.0],
            [0.9, -1.0],
            [1.2, 1.0],
            [1.5, -1.0],
            [1.8, 1.0],
            [2.1, -1.0],
            [2.4, 1.0],
            [2.7, -1.0],
        ];
        let y = array![1u8, 0, 1, 0, 1, 0, 1, 0, 1, 0];
        (x, y)
    }

    #[test]
    fn test_svc_probabilities_in_range() {
        let (x, y) = data();
        let config = ModelConfig::new(ModelType::Svc(SvcParams {
            kernel: SvmKernel::Linear,
            ..SvcParams::default()
        }));
        let mut classifier = SvcClassifier::new(config).unwrap();
        classifier.fit(&x, &y).unwrap();

        let proba = classifier.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), 10);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(classifier.n_features(), Some(2));
    }

    #[test]
    fn test_balanced_penalties() {
        let config = ModelConfig::new(ModelType::Svc(SvcParams {
            c: 2.0,
            class_weight: ClassWeight::Balanced,
            ..SvcParams::default()
        }));
        let classifier = SvcClassifier::new(config).unwrap();
        let y = array![1u8, 1, 1, 0];
        let (c_pos, c_neg) = classifier.penalties(&y);
        assert!((c_pos - 2.0 * 4.0 / 6.0).abs() < 1e-12);
        assert!((c_neg - 2.0 * 4.0 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_gamma_on_standardized_data() {
        let (x, _) = data();
        let classifier = SvcClassifier::new(ModelConfig::new(ModelType::Svc(SvcParams::default()))).unwrap();
        let (_, scaled) = fit_transform(&x);
        assert!((classifier.gamma(&scaled) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_svc_is_not_persisted() {
        let classifier = SvcClassifier::new(ModelConfig::new(ModelType::Svc(SvcParams::default()))).unwrap();
        assert!(matches!(
            classifier.to_json(),
            Err(ClassifierError::UnsupportedPersistence(_))
        ));
    }
}
