use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClassifierError, Result};
use crate::search::space::{ParamSet, ParamValue};

/// Classifier families with a declared hyperparameter search space.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierFamily {
    Svc,
    RandomForest,
    BalancedRandomForest,
    GradientBoosting,
}

impl ClassifierFamily {
    pub const ALL: [ClassifierFamily; 4] = [
        ClassifierFamily::Svc,
        ClassifierFamily::RandomForest,
        ClassifierFamily::BalancedRandomForest,
        ClassifierFamily::GradientBoosting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierFamily::Svc => "svc",
            ClassifierFamily::RandomForest => "random_forest",
            ClassifierFamily::BalancedRandomForest => "balanced_random_forest",
            ClassifierFamily::GradientBoosting => "gradient_boosting",
        }
    }
}

impl fmt::Display for ClassifierFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierFamily {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "svc" | "svm" => Ok(ClassifierFamily::Svc),
            "random_forest" | "rf" => Ok(ClassifierFamily::RandomForest),
            "balanced_random_forest" | "brf" => Ok(ClassifierFamily::BalancedRandomForest),
            "gradient_boosting" | "gbdt" | "xgboost" => Ok(ClassifierFamily::GradientBoosting),
            _ => Err(ClassifierError::UnsupportedFamily(s.to_string())),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SvmKernel {
    Linear,
    Rbf,
    Poly,
}

/// Kernel coefficient of the RBF kernel.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// `1 / (n_features * X.var())`
    Scale,
    /// `1 / n_features`
    Auto,
    Value(f64),
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    Uniform,
    /// Weights inversely proportional to class frequencies.
    Balanced,
}

/// Number of features considered at each tree split.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Sqrt => n.sqrt().floor() as usize,
            MaxFeatures::Log2 => n.log2().floor() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SvcParams {
    pub c: f64,
    pub kernel: SvmKernel,
    pub gamma: Gamma,
    pub class_weight: ClassWeight,
    pub degree: u32,
}

impl Default for SvcParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: SvmKernel::Rbf,
            gamma: Gamma::Scale,
            class_weight: ClassWeight::Uniform,
            degree: 3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: u32,
    pub learning_rate: f32,
    /// Fraction of rows sampled per boosting round.
    pub subsample: f64,
    /// Fraction of features sampled per tree.
    pub colsample_bytree: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            subsample: 1.0,
            colsample_bytree: 1.0,
        }
    }
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    Svc(SvcParams),
    RandomForest(ForestParams),
    BalancedRandomForest(ForestParams),
    GradientBoosting(BoostingParams),
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::RandomForest(ForestParams::default())
    }
}

impl ModelType {
    /// Default hyper-parameters of `family`.
    pub fn default_for(family: ClassifierFamily) -> Self {
        match family {
            ClassifierFamily::Svc => ModelType::Svc(SvcParams::default()),
            ClassifierFamily::RandomForest => ModelType::RandomForest(ForestParams::default()),
            ClassifierFamily::BalancedRandomForest => {
                ModelType::BalancedRandomForest(ForestParams::default())
            }
            ClassifierFamily::GradientBoosting => {
                ModelType::GradientBoosting(BoostingParams::default())
            }
        }
    }

    /// Build the model type of `family` from a sampled configuration.
    pub fn from_params(family: ClassifierFamily, params: &ParamSet) -> Result<Self> {
        Self::default_for(family).with_params(params)
    }

    pub fn family(&self) -> ClassifierFamily {
        match self {
            ModelType::Svc(_) => ClassifierFamily::Svc,
            ModelType::RandomForest(_) => ClassifierFamily::RandomForest,
            ModelType::BalancedRandomForest(_) => ClassifierFamily::BalancedRandomForest,
            ModelType::GradientBoosting(_) => ClassifierFamily::GradientBoosting,
        }
    }

    /// Copy of `self` with every entry of `params` applied.
    pub fn with_params(&self, params: &ParamSet) -> Result<Self> {
        let mut model_type = self.clone();
        for (name, value) in params {
            model_type.set_param(name, value)?;
        }
        Ok(model_type)
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let family = self.family();
        match self {
            ModelType::Svc(p) => match name {
                "C" => p.c = float_param(name, value)?,
                "kernel" => {
                    p.kernel = match str_param(name, value)? {
                        "linear" => SvmKernel::Linear,
                        "rbf" => SvmKernel::Rbf,
                        "poly" => SvmKernel::Poly,
                        other => return Err(invalid_choice(name, other, "linear, rbf, poly")),
                    }
                }
                "gamma" => {
                    p.gamma = match value {
                        ParamValue::Str(s) if s == "scale" => Gamma::Scale,
                        ParamValue::Str(s) if s == "auto" => Gamma::Auto,
                        _ => Gamma::Value(float_param(name, value)?),
                    }
                }
                "class_weight" => {
                    p.class_weight = match value {
                        ParamValue::None => ClassWeight::Uniform,
                        ParamValue::Str(s) if s == "balanced" => ClassWeight::Balanced,
                        other => {
                            return Err(invalid_choice(name, &other.to_string(), "balanced, None"))
                        }
                    }
                }
                "degree" => p.degree = usize_param(name, value)? as u32,
                _ => return Err(unknown_param(name, family)),
            },
            ModelType::RandomForest(p) | ModelType::BalancedRandomForest(p) => match name {
                "n_estimators" => p.n_estimators = usize_param(name, value)?,
                "max_depth" => {
                    p.max_depth = match value {
                        ParamValue::None => None,
                        _ => Some(usize_param(name, value)?),
                    }
                }
                "min_samples_split" => p.min_samples_split = usize_param(name, value)?,
                "min_samples_leaf" => p.min_samples_leaf = usize_param(name, value)?,
                "max_features" => {
                    p.max_features = match value {
                        ParamValue::None => MaxFeatures::All,
                        ParamValue::Str(s) if s == "sqrt" => MaxFeatures::Sqrt,
                        ParamValue::Str(s) if s == "log2" => MaxFeatures::Log2,
                        other => {
                            return Err(invalid_choice(name, &other.to_string(), "sqrt, log2, None"))
                        }
                    }
                }
                _ => return Err(unknown_param(name, family)),
            },
            ModelType::GradientBoosting(p) => match name {
                "n_estimators" => p.n_estimators = usize_param(name, value)?,
                "max_depth" => p.max_depth = usize_param(name, value)? as u32,
                "learning_rate" => p.learning_rate = float_param(name, value)? as f32,
                "subsample" => p.subsample = float_param(name, value)?,
                "colsample_bytree" => p.colsample_bytree = float_param(name, value)?,
                _ => return Err(unknown_param(name, family)),
            },
        }
        Ok(())
    }
}

fn float_param(name: &str, value: &ParamValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        ClassifierError::InvalidParameter(format!("{} expects a number, got {}", name, value))
    })
}

fn usize_param(name: &str, value: &ParamValue) -> Result<usize> {
    match value.as_i64() {
        Some(v) if v >= 0 => Ok(v as usize),
        _ => Err(ClassifierError::InvalidParameter(format!(
            "{} expects a non-negative integer, got {}",
            name, value
        ))),
    }
}

fn str_param<'a>(name: &str, value: &'a ParamValue) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        ClassifierError::InvalidParameter(format!("{} expects a string, got {}", name, value))
    })
}

fn invalid_choice(name: &str, value: &str, expected: &str) -> ClassifierError {
    ClassifierError::InvalidChoice {
        name: name.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn unknown_param(name: &str, family: ClassifierFamily) -> ClassifierError {
    ClassifierError::InvalidParameter(format!("'{}' is not a hyperparameter of {}", name, family))
}

impl FromStr for ModelType {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(ModelType::default_for(s.parse()?))
    }
}

/// Central configuration for models in the crate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Seed for the randomized parts of fitting (bootstrap, feature sampling).
    pub random_state: u64,

    #[serde(flatten)]
    pub model_type: ModelType,
}

impl ModelConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            random_state: 42,
            model_type,
        }
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn family(&self) -> ClassifierFamily {
        self.model_type.family()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(ModelType::default())
    }
}
