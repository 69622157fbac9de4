//! Dataset type and CSV loading for the player statistics table.
//!
//! A `Dataset` pairs an `f64` feature matrix with 0/1 labels (1 meaning a
//! career of five years or more) and the feature column names. Rows are
//! never mutated after construction; fold subsets are copied out with
//! `select`.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info};
use ndarray::{Array1, Array2, Axis};

use crate::error::{ClassifierError, Result};

/// Per-game statistics in the order models are trained on.
pub const FEATURE_NAMES: [&str; 19] = [
    "GP", "MIN", "PTS", "FGM", "FGA", "FG%", "3P Made", "3PA", "3P%", "FTM", "FTA", "FT%",
    "OREB", "DREB", "REB", "AST", "STL", "BLK", "TOV",
];

pub const LABEL_COLUMN: &str = "TARGET_5Yrs";

/// Identifier column skipped when loading.
pub const NAME_COLUMN: &str = "Name";

#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<u8>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Array1<u8>, feature_names: Vec<String>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }
        if feature_names.len() != x.ncols() {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("{} feature names", x.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        if let Some(&bad) = y.iter().find(|&&l| l > 1) {
            return Err(ClassifierError::InvalidLabel(bad as f64));
        }
        Ok(Self {
            x,
            y,
            feature_names,
        })
    }

    /// Build from row vectors, naming features `f0, f1, ...`.
    pub fn from_rows(rows: &[Vec<f64>], labels: &[u8]) -> Result<Self> {
        let n_features = rows.first().map_or(0, |r| r.len());
        if let Some(row) = rows.iter().find(|r| r.len() != n_features) {
            return Err(ClassifierError::ShapeMismatch {
                expected: format!("{} features", n_features),
                actual: format!("{} features", row.len()),
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let x = Array2::from_shape_vec((rows.len(), n_features), flat)
            .map_err(|e| ClassifierError::InvalidParameter(e.to_string()))?;
        let names = (0..n_features).map(|i| format!("f{}", i)).collect();
        Self::new(x, Array1::from_vec(labels.to_vec()), names)
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Copy of the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
        }
    }

    /// `[class 0 count, class 1 count]`
    pub fn class_counts(&self) -> [usize; 2] {
        let positives = self.y.iter().filter(|&&l| l == 1).count();
        [self.y.len() - positives, positives]
    }

    pub fn log_input_data_summary(&self) {
        let [short, long] = self.class_counts();
        info!("----- Input Data Summary -----");
        info!(
            "{} players: {} long careers (5+ years), {} short careers",
            self.n_samples(),
            long,
            short
        );
        info!("{} features: {}", self.n_features(), self.feature_names.join(", "));
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Load a dataset from a CSV file with a header row.
pub fn read_dataset_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let file = File::open(path.as_ref())?;
    debug!("Reading dataset from {}", path.as_ref().display());
    read_dataset(file)
}

/// Load a dataset from CSV text.
///
/// Every column other than `Name` and `TARGET_5Yrs` is a feature, kept in
/// header order. Empty or `NaN` cells are replaced by the mean of the
/// present values of their column.
pub fn read_dataset<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let label_idx = headers
        .iter()
        .position(|h| h.trim() == LABEL_COLUMN)
        .ok_or_else(|| {
            ClassifierError::InvalidParameter(format!("missing label column '{}'", LABEL_COLUMN))
        })?;
    let feature_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != label_idx && h.trim() != NAME_COLUMN)
        .map(|(i, h)| (i, h.trim().to_string()))
        .collect();
    if feature_cols.is_empty() {
        return Err(ClassifierError::InvalidParameter(
            "no feature columns found".to_string(),
        ));
    }

    let mut cells: Vec<Option<f64>> = Vec::new();
    let mut labels: Vec<u8> = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let raw_label = record.get(label_idx).unwrap_or("");
        let label = parse_cell(raw_label).ok_or_else(|| {
            ClassifierError::InvalidParameter(format!(
                "row {}: unreadable label '{}'",
                line + 1,
                raw_label
            ))
        })?;
        if label != 0.0 && label != 1.0 {
            return Err(ClassifierError::InvalidLabel(label));
        }
        labels.push(label as u8);
        cells.extend(
            feature_cols
                .iter()
                .map(|(i, _)| record.get(*i).and_then(parse_cell)),
        );
    }

    let n_features = feature_cols.len();
    let n_rows = labels.len();
    let mut x = Array2::<f64>::zeros((n_rows, n_features));
    let mut imputed = 0usize;
    for col in 0..n_features {
        let present: Vec<f64> = (0..n_rows)
            .filter_map(|row| cells[row * n_features + col])
            .collect();
        let mean = if present.is_empty() {
            0.0
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        };
        for row in 0..n_rows {
            x[[row, col]] = cells[row * n_features + col].unwrap_or_else(|| {
                imputed += 1;
                mean
            });
        }
    }
    if imputed > 0 {
        info!("Imputed {} missing feature values with column means", imputed);
    }

    let names = feature_cols.into_iter().map(|(_, name)| name).collect();
    Dataset::new(x, Array1::from_vec(labels), names)
}
