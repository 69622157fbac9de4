//! Single-player prediction with a class-1 probability.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::{check_width, Classifier};

/// Rookie season statistics, keyed by the dataset column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(rename = "GP")]
    pub games_played: f64,
    #[serde(rename = "MIN")]
    pub minutes: f64,
    #[serde(rename = "PTS")]
    pub points: f64,
    #[serde(rename = "FGM")]
    pub field_goals_made: f64,
    #[serde(rename = "FGA")]
    pub field_goals_attempted: f64,
    #[serde(rename = "FG%")]
    pub field_goal_pct: f64,
    #[serde(rename = "3P Made")]
    pub three_made: f64,
    #[serde(rename = "3PA")]
    pub three_attempted: f64,
    #[serde(rename = "3P%")]
    pub three_pct: f64,
    #[serde(rename = "FTM")]
    pub free_throws_made: f64,
    #[serde(rename = "FTA")]
    pub free_throws_attempted: f64,
    #[serde(rename = "FT%")]
    pub free_throw_pct: f64,
    #[serde(rename = "OREB")]
    pub offensive_rebounds: f64,
    #[serde(rename = "DREB")]
    pub defensive_rebounds: f64,
    #[serde(rename = "REB")]
    pub rebounds: f64,
    #[serde(rename = "AST")]
    pub assists: f64,
    #[serde(rename = "STL")]
    pub steals: f64,
    #[serde(rename = "BLK")]
    pub blocks: f64,
    #[serde(rename = "TOV")]
    pub turnovers: f64,
}

impl PlayerStats {
    /// Feature vector in `data_handling::FEATURE_NAMES` order.
    pub fn to_features(&self) -> Vec<f64> {
        vec![
            self.games_played,
            self.minutes,
            self.points,
            self.field_goals_made,
            self.field_goals_attempted,
            self.field_goal_pct,
            self.three_made,
            self.three_attempted,
            self.three_pct,
            self.free_throws_made,
            self.free_throws_attempted,
            self.free_throw_pct,
            self.offensive_rebounds,
            self.defensive_rebounds,
            self.rebounds,
            self.assists,
            self.steals,
            self.blocks,
            self.turnovers,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CareerOutcome {
    /// Class 1.
    #[serde(rename = "Long Career (5+ years)")]
    LongCareer,
    #[serde(rename = "Short Career (<5 years)")]
    ShortCareer,
}

impl CareerOutcome {
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            CareerOutcome::LongCareer
        } else {
            CareerOutcome::ShortCareer
        }
    }
}

impl fmt::Display for CareerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CareerOutcome::LongCareer => write!(f, "Long Career (5+ years)"),
            CareerOutcome::ShortCareer => write!(f, "Short Career (<5 years)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: CareerOutcome,
    /// Probability of a long career.
    pub probability: f64,
}

impl Prediction {
    pub fn rounded_probability(&self) -> f64 {
        (self.probability * 10_000.0).round() / 10_000.0
    }
}

/// Predict the career class of one player from a fitted `model`.
///
/// `features` must have the width the model was fitted on, when the model
/// reports one.
pub fn predict_with_probability(model: &dyn Classifier, features: &[f64]) -> Result<Prediction> {
    let x = Array2::from_shape_vec((1, features.len()), features.to_vec()).map_err(|e| {
        ClassifierError::ShapeMismatch {
            expected: "a single feature row".to_string(),
            actual: e.to_string(),
        }
    })?;
    if model.n_features().is_some() {
        check_width(model.n_features(), &x)?;
    }
    let probability = model.predict_proba(&x)?[0].clamp(0.0, 1.0);
    let label = model.predict(&x)?[0];
    Ok(Prediction {
        label: CareerOutcome::from_label(label),
        probability,
    })
}
