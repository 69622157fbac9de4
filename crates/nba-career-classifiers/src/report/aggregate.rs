use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cross_validation::FoldPolicy;
use crate::metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix, FoldMetrics};

/// Structured result of one cross-validated evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub fold_policy: FoldPolicy,
    pub num_folds: usize,
    /// Confusion matrices of every fold, summed.
    pub confusion_sum: ConfusionMatrix,
    /// `confusion_sum / num_folds`, laid out `[[tn, fp], [fn, tp]]`.
    pub confusion_mean: [[f64; 2]; 2],
    /// Fold-averaged scores with class 0 as the positive label.
    pub class_0: ClassMetrics,
    /// Fold-averaged scores with class 1 as the positive label.
    pub class_1: ClassMetrics,
    pub folds: Vec<FoldMetrics>,
    /// Computed once over every out-of-fold prediction.
    pub pooled: ClassificationReport,
}

impl AggregateReport {
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [[tn, fp], [fn_, tp]] = self.confusion_mean;
        writeln!(
            f,
            "Average Confusion Matrix ({} folds, {}):",
            self.num_folds, self.fold_policy
        )?;
        writeln!(f, "[[{:>8.1} {:>8.1}]", tn, fp)?;
        writeln!(f, " [{:>8.1} {:>8.1}]]", fn_, tp)?;
        writeln!(f)?;
        writeln!(f, "Performance Metrics:")?;
        writeln!(
            f,
            "  Precision (Class 1 - Long Career Players): {:.4}",
            self.class_1.precision
        )?;
        writeln!(
            f,
            "  Recall (Class 1 - Long Career Players): {:.4}",
            self.class_1.recall
        )?;
        writeln!(
            f,
            "  F1-score (Class 1 - Long Career Players): {:.4}",
            self.class_1.f1
        )?;
        writeln!(
            f,
            "  Precision (Class 0 - Short Career Players): {:.4}",
            self.class_0.precision
        )?;
        writeln!(
            f,
            "  Recall (Class 0 - Short Career Players): {:.4}",
            self.class_0.recall
        )?;
        writeln!(
            f,
            "  F1-score (Class 0 - Short Career Players): {:.4}",
            self.class_0.f1
        )?;
        writeln!(f)?;
        writeln!(f, "Full Classification Report:")?;
        write!(f, "{}", self.pooled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_every_metric() {
        let cm = ConfusionMatrix {
            true_negative: 3,
            false_positive: 1,
            false_negative: 2,
            true_positive: 4,
        };
        let report = AggregateReport {
            fold_policy: FoldPolicy::KFold,
            num_folds: 2,
            confusion_sum: cm,
            confusion_mean: [[1.5, 0.5], [1.0, 2.0]],
            class_0: cm.class_metrics(0),
            class_1: cm.class_metrics(1),
            folds: vec![FoldMetrics::new(0, cm)],
            pooled: ClassificationReport::new(&[0, 0, 1, 1], &[0, 1, 1, 1]),
        };
        let summary = report.summary();
        assert!(summary.contains("2 folds, kfold"));
        assert!(summary.contains("F1-score (Class 1 - Long Career Players): 0.7273"));
        assert!(summary.contains("Recall (Class 0 - Short Career Players): 0.7500"));
        assert!(summary.contains("macro avg"));
    }
}
