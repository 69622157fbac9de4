//! Hyperparameter values, domains and the per-family search spaces.

use std::collections::BTreeMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierFamily;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::Classifier;

/// A concrete hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    None,
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParamValue::None)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::None => write!(f, "None"),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// One hyperparameter configuration: parameter name to value.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Render a configuration as `{name: value, ...}`.
pub fn format_params(params: &ParamSet) -> String {
    let body = params
        .iter()
        .map(|(name, value)| format!("'{}': {}", name, value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

/// Sampling rule of a single hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamDomain {
    /// Uniform pick among the listed values.
    Categorical(Vec<ParamValue>),
    /// Integers `low, low + step, ..., <= high`.
    Int { low: i64, high: i64, step: i64 },
    /// Reals in `[low, high]`, uniform in log space when `log` is set.
    Float { low: f64, high: f64, log: bool },
}

impl ParamDomain {
    pub fn categorical<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        ParamDomain::Categorical(values.into_iter().map(Into::into).collect())
    }

    pub fn int(low: i64, high: i64) -> Self {
        ParamDomain::Int { low, high, step: 1 }
    }

    pub fn int_step(low: i64, high: i64, step: i64) -> Self {
        ParamDomain::Int { low, high, step }
    }

    pub fn uniform(low: f64, high: f64) -> Self {
        ParamDomain::Float {
            low,
            high,
            log: false,
        }
    }

    pub fn log_uniform(low: f64, high: f64) -> Self {
        ParamDomain::Float {
            low,
            high,
            log: true,
        }
    }

    /// Draw a value from the prior of this domain.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamValue {
        match self {
            ParamDomain::Categorical(values) => values
                .choose(rng)
                .cloned()
                .unwrap_or(ParamValue::None),
            ParamDomain::Int { low, high, step } => {
                let n_steps = (high - low) / step;
                let k = rng.gen_range(0..=n_steps);
                ParamValue::Int(low + k * step)
            }
            ParamDomain::Float { low, high, log } => {
                if low >= high {
                    return ParamValue::Float(*low);
                }
                let value = if *log {
                    rng.gen_range(low.ln()..high.ln()).exp()
                } else {
                    rng.gen_range(*low..*high)
                };
                ParamValue::Float(value.clamp(*low, *high))
            }
        }
    }

    /// Grid points of an `Int` domain.
    pub fn int_values(&self) -> Vec<i64> {
        match self {
            ParamDomain::Int { low, high, step } => {
                (0..=(high - low) / step).map(|k| low + k * step).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn contains(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (ParamDomain::Categorical(values), v) => values.contains(v),
            (ParamDomain::Int { low, high, step }, ParamValue::Int(v)) => {
                *v >= *low && *v <= *high && (v - low) % step == 0
            }
            (ParamDomain::Float { low, high, .. }, v) => v
                .as_f64()
                .map_or(false, |x| x >= *low && x <= *high),
            _ => false,
        }
    }
}

/// A parameter that only exists when another parameter has a given value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub param: String,
    pub equals: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub domain: ParamDomain,
    pub when: Option<Condition>,
}

impl ParamSpec {
    fn new(name: &str, domain: ParamDomain) -> Self {
        Self {
            name: name.to_string(),
            domain,
            when: None,
        }
    }

    fn when(mut self, param: &str, equals: ParamValue) -> Self {
        self.when = Some(Condition {
            param: param.to_string(),
            equals,
        });
        self
    }

    /// Whether this parameter applies given the values chosen so far.
    pub fn is_active(&self, chosen: &ParamSet) -> bool {
        match &self.when {
            None => true,
            Some(cond) => chosen.get(&cond.param) == Some(&cond.equals),
        }
    }
}

/// Declared search space of one classifier family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    family: ClassifierFamily,
    params: Vec<ParamSpec>,
}

impl SearchSpace {
    /// Search space declared for `family`.
    pub fn for_family(family: ClassifierFamily) -> Self {
        let params = match family {
            ClassifierFamily::Svc => vec![
                ParamSpec::new("C", ParamDomain::log_uniform(0.01, 100.0)),
                ParamSpec::new("kernel", ParamDomain::categorical(["rbf"])),
                ParamSpec::new(
                    "gamma",
                    ParamDomain::Categorical(vec![
                        "scale".into(),
                        "auto".into(),
                        ParamValue::Float(0.1),
                        ParamValue::Float(0.01),
                        ParamValue::Float(0.001),
                    ]),
                ),
                ParamSpec::new(
                    "class_weight",
                    ParamDomain::Categorical(vec!["balanced".into(), ParamValue::None]),
                ),
                ParamSpec::new("degree", ParamDomain::int(2, 5)).when("kernel", "poly".into()),
            ],
            ClassifierFamily::RandomForest | ClassifierFamily::BalancedRandomForest => vec![
                ParamSpec::new("n_estimators", ParamDomain::int_step(100, 1000, 100)),
                ParamSpec::new(
                    "max_depth",
                    ParamDomain::Categorical(vec![
                        ParamValue::Int(5),
                        ParamValue::Int(10),
                        ParamValue::Int(15),
                        ParamValue::None,
                    ]),
                ),
                ParamSpec::new("min_samples_split", ParamDomain::int(2, 20)),
                ParamSpec::new("min_samples_leaf", ParamDomain::int(1, 10)),
                ParamSpec::new(
                    "max_features",
                    ParamDomain::Categorical(vec!["sqrt".into(), "log2".into(), ParamValue::None]),
                ),
            ],
            ClassifierFamily::GradientBoosting => vec![
                ParamSpec::new("n_estimators", ParamDomain::int_step(100, 500, 100)),
                ParamSpec::new("max_depth", ParamDomain::int(3, 10)),
                ParamSpec::new("learning_rate", ParamDomain::log_uniform(0.001, 0.3)),
                ParamSpec::new("subsample", ParamDomain::uniform(0.5, 1.0)),
                ParamSpec::new("colsample_bytree", ParamDomain::uniform(0.5, 1.0)),
            ],
        };
        Self { family, params }
    }

    /// Search space of a classifier instance.
    ///
    /// Classifiers that do not belong to one of the registered families
    /// have no declared space and are rejected.
    pub fn for_classifier(classifier: &dyn Classifier) -> Result<Self> {
        classifier
            .family()
            .map(Self::for_family)
            .ok_or_else(|| ClassifierError::UnsupportedFamily(classifier.name().to_string()))
    }

    pub fn family(&self) -> ClassifierFamily {
        self.family
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Sample every active parameter from its prior.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamSet {
        let mut chosen = ParamSet::new();
        for spec in &self.params {
            if spec.is_active(&chosen) {
                chosen.insert(spec.name.clone(), spec.domain.sample(rng));
            }
        }
        chosen
    }

    /// Check that `params` holds exactly the active parameters, each inside its domain.
    pub fn validate(&self, params: &ParamSet) -> Result<()> {
        for name in params.keys() {
            if self.get(name).is_none() {
                return Err(ClassifierError::InvalidParameter(format!(
                    "'{}' is not a hyperparameter of {}",
                    name, self.family
                )));
            }
        }
        for spec in &self.params {
            match params.get(&spec.name) {
                Some(value) if spec.domain.contains(value) => {}
                Some(value) => {
                    return Err(ClassifierError::InvalidParameter(format!(
                        "{} = {} is outside its search space",
                        spec.name, value
                    )))
                }
                None if spec.is_active(params) => {
                    return Err(ClassifierError::InvalidParameter(format!(
                        "missing hyperparameter '{}'",
                        spec.name
                    )))
                }
                None => {}
            }
        }
        Ok(())
    }
}
