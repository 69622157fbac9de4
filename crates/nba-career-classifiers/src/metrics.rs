//! Binary confusion matrix, precision/recall/F1 and the pooled classification report.
//!
//! Scores follow the usual two-class definitions with a fixed positive
//! label. A zero denominator yields 0.0 and a warning instead of an error,
//! so a degenerate fold never aborts an evaluation.

use std::fmt;
use std::ops::AddAssign;

use log::warn;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// 2x2 confusion matrix with class 1 as the positive class.
///
/// Laid out as `[[tn, fp], [fn, tp]]`: rows are true labels, columns are
/// predicted labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Self {
        Self::from_pairs(y_true.iter().copied().zip(y_pred.iter().copied()))
    }

    pub fn from_arrays(y_true: &Array1<u8>, y_pred: &Array1<u8>) -> Self {
        Self::from_pairs(y_true.iter().copied().zip(y_pred.iter().copied()))
    }

    fn from_pairs<I: Iterator<Item = (u8, u8)>>(pairs: I) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (t, p) in pairs {
            match (t, p) {
                (0, 0) => cm.true_negative += 1,
                (0, _) => cm.false_positive += 1,
                (_, 0) => cm.false_negative += 1,
                _ => cm.true_positive += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn as_array(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }

    /// `(tp, fp, fn)` seen from `pos_label`.
    fn counts(&self, pos_label: u8) -> (usize, usize, usize) {
        if pos_label == 1 {
            (self.true_positive, self.false_positive, self.false_negative)
        } else {
            (self.true_negative, self.false_negative, self.false_positive)
        }
    }

    /// Number of true samples of `label`.
    pub fn support(&self, label: u8) -> usize {
        let (tp, _, fn_) = self.counts(label);
        tp + fn_
    }

    pub fn precision(&self, pos_label: u8) -> f64 {
        let (tp, fp, _) = self.counts(pos_label);
        safe_ratio(tp, tp + fp, "precision", pos_label)
    }

    pub fn recall(&self, pos_label: u8) -> f64 {
        let (tp, _, fn_) = self.counts(pos_label);
        safe_ratio(tp, tp + fn_, "recall", pos_label)
    }

    pub fn f1(&self, pos_label: u8) -> f64 {
        let (tp, fp, fn_) = self.counts(pos_label);
        safe_ratio(2 * tp, 2 * tp + fp + fn_, "f1-score", pos_label)
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_negative + self.true_positive) as f64 / total as f64
    }

    pub fn class_metrics(&self, pos_label: u8) -> ClassMetrics {
        ClassMetrics {
            precision: self.precision(pos_label),
            recall: self.recall(pos_label),
            f1: self.f1(pos_label),
        }
    }
}

impl AddAssign for ConfusionMatrix {
    fn add_assign(&mut self, other: Self) {
        self.true_negative += other.true_negative;
        self.false_positive += other.false_positive;
        self.false_negative += other.false_negative;
        self.true_positive += other.true_positive;
    }
}

fn safe_ratio(numerator: usize, denominator: usize, metric: &str, pos_label: u8) -> f64 {
    if denominator == 0 {
        warn!(
            "{} is ill-defined for label {} (zero denominator), setting it to 0.0",
            metric, pos_label
        );
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Precision, recall and F1 for one positive label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl AddAssign for ClassMetrics {
    fn add_assign(&mut self, other: Self) {
        self.precision += other.precision;
        self.recall += other.recall;
        self.f1 += other.f1;
    }
}

impl ClassMetrics {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            precision: self.precision * factor,
            recall: self.recall * factor,
            f1: self.f1 * factor,
        }
    }
}

/// Scores of a single outer fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub fold: usize,
    pub confusion: ConfusionMatrix,
    pub class_0: ClassMetrics,
    pub class_1: ClassMetrics,
}

impl FoldMetrics {
    pub fn new(fold: usize, confusion: ConfusionMatrix) -> Self {
        Self {
            fold,
            class_0: confusion.class_metrics(0),
            class_1: confusion.class_metrics(1),
            confusion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class scores plus accuracy, macro and weighted averages, computed
/// once over a set of predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ReportRow>,
    pub accuracy: f64,
    pub macro_avg: ReportRow,
    pub weighted_avg: ReportRow,
}

impl ClassificationReport {
    /// Report over the labels present in `y_true` or `y_pred`.
    pub fn new(y_true: &[u8], y_pred: &[u8]) -> Self {
        let cm = ConfusionMatrix::from_labels(y_true, y_pred);
        let total = cm.total();

        let classes: Vec<ReportRow> = [0u8, 1u8]
            .into_iter()
            .filter(|&label| y_true.contains(&label) || y_pred.contains(&label))
            .map(|label| {
                let m = cm.class_metrics(label);
                ReportRow {
                    label: label.to_string(),
                    precision: m.precision,
                    recall: m.recall,
                    f1: m.f1,
                    support: cm.support(label),
                }
            })
            .collect();

        let n_classes = classes.len().max(1) as f64;
        let mean = |f: fn(&ReportRow) -> f64| classes.iter().map(f).sum::<f64>() / n_classes;
        let weighted = |f: fn(&ReportRow) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|row| f(row) * row.support as f64)
                    .sum::<f64>()
                    / total as f64
            }
        };

        let macro_avg = ReportRow {
            label: "macro avg".to_string(),
            precision: mean(|r| r.precision),
            recall: mean(|r| r.recall),
            f1: mean(|r| r.f1),
            support: total,
        };
        let weighted_avg = ReportRow {
            label: "weighted avg".to_string(),
            precision: weighted(|r| r.precision),
            recall: weighted(|r| r.recall),
            f1: weighted(|r| r.f1),
            support: total,
        };

        Self {
            accuracy: cm.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
        }
    }

    pub fn support(&self) -> usize {
        self.macro_avg.support
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for row in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                row.label, row.precision, row.recall, row.f1, row.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support()
        )?;
        for row in [&self.macro_avg, &self.weighted_avg] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                row.label, row.precision, row.recall, row.f1, row.support
            )?;
        }
        Ok(())
    }
}
