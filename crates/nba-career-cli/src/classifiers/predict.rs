//! Single-player prediction from a saved model.
use std::path::Path;

use anyhow::{Context, Result};

use nba_career_classifiers::inference::{predict_with_probability, PlayerStats, Prediction};
use nba_career_classifiers::io::load_model;

/// Parse a comma separated feature list such as `80,30.2,15.3`.
pub fn parse_features(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid feature value '{}'", v.trim()))
        })
        .collect()
}

/// Read a `PlayerStats` JSON file into a feature vector.
pub fn load_player<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read player: {}", path.as_ref().display()))?;
    let stats: PlayerStats = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse player: {}", path.as_ref().display()))?;
    Ok(stats.to_features())
}

pub fn run<P: AsRef<Path>>(model_path: P, features: &[f64]) -> Result<Prediction> {
    let loaded = load_model(&model_path)
        .with_context(|| format!("Failed to load model: {}", model_path.as_ref().display()))?;
    if features.len() != loaded.feature_names.len() {
        anyhow::bail!(
            "Expected {} features ({}), got {}",
            loaded.feature_names.len(),
            loaded.feature_names.join(", "),
            features.len()
        );
    }
    Ok(predict_with_probability(loaded.model.as_ref(), features)?)
}
