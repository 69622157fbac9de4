//! Saving and loading fitted classifiers as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierFamily;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::Classifier;
use crate::models::gbdt::GradientBoostingClassifier;
use crate::models::random_forest::RandomForestClassifier;

#[derive(Serialize, Deserialize)]
struct SavedModel {
    family: ClassifierFamily,
    feature_names: Vec<String>,
    model: serde_json::Value,
}

/// A classifier read back from disk, with the feature order it expects.
pub struct LoadedModel {
    pub family: ClassifierFamily,
    pub feature_names: Vec<String>,
    pub model: Box<dyn Classifier>,
}

/// Write a fitted `model` to `path`.
///
/// Fails with `UnsupportedPersistence` for classifiers that cannot serialize
/// their fitted state.
pub fn save_model<P: AsRef<Path>>(
    model: &dyn Classifier,
    feature_names: &[String],
    path: P,
) -> Result<()> {
    let family = model
        .family()
        .ok_or_else(|| ClassifierError::UnsupportedPersistence(model.name().to_string()))?;
    let saved = SavedModel {
        family,
        feature_names: feature_names.to_vec(),
        model: model.to_json()?,
    };
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer(writer, &saved)?;
    info!("Saved {} to {}", model.name(), path.as_ref().display());
    Ok(())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<LoadedModel> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let saved: SavedModel = serde_json::from_reader(reader)?;
    let model: Box<dyn Classifier> = match saved.family {
        ClassifierFamily::RandomForest | ClassifierFamily::BalancedRandomForest => Box::new(
            serde_json::from_value::<RandomForestClassifier>(saved.model)?,
        ),
        ClassifierFamily::GradientBoosting => Box::new(
            serde_json::from_value::<GradientBoostingClassifier>(saved.model)?,
        ),
        ClassifierFamily::Svc => {
            return Err(ClassifierError::UnsupportedPersistence(
                saved.family.to_string(),
            ))
        }
    };
    info!(
        "Loaded {} with {} features from {}",
        model.name(),
        saved.feature_names.len(),
        path.as_ref().display()
    );
    Ok(LoadedModel {
        family: saved.family,
        feature_names: saved.feature_names,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForestParams, ModelConfig, ModelType};
    use crate::models::factory::build_model;
    use ndarray::{array, Array2};

    #[test]
    fn test_forest_round_trip_predicts_the_same() {
        let x: Array2<f64> = array![[0.0, 1.0], [0.2, 0.8], [1.0, 0.0], [0.9, 0.1], [0.1, 0.9], [0.8, 0.3]];
        let y = array![0u8, 0, 1, 1, 0, 1];
        let mut model = build_model(ModelConfig::new(ModelType::RandomForest(ForestParams {
            n_estimators: 7,
            ..Default::default()
        })))
        .unwrap();
        model.fit(&x, &y).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        let names = vec!["a".to_string(), "b".to_string()];
        save_model(model.as_ref(), &names, &path).unwrap();

        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded.family, ClassifierFamily::RandomForest);
        assert_eq!(loaded.feature_names, names);
        assert_eq!(
            loaded.model.predict_proba(&x).unwrap(),
            model.predict_proba(&x).unwrap()
        );
    }

    #[test]
    fn test_unfitted_model_cannot_be_saved() {
        let model = build_model(ModelConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = save_model(model.as_ref(), &[], dir.path().join("m.json")).unwrap_err();
        assert!(matches!(err, ClassifierError::NotFitted));
    }
}
