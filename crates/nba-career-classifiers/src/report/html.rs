//! Self-contained HTML rendering of an evaluation outcome.

use std::fs;
use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::error::Result;
use crate::evaluator::EvaluationOutcome;
use crate::metrics::ClassMetrics;
use crate::search::space::format_params;

const STYLE: &str = "
body { font-family: sans-serif; margin: 2em; color: #222; }
h1 { border-bottom: 2px solid #1d428a; }
h2 { color: #1d428a; }
table { border-collapse: collapse; margin-bottom: 1em; }
th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
th { background-color: #eef; }
.code-container {
    background-color: #f5f5f5;
    padding: 10px;
    border-radius: 5px;
    overflow-x: auto;
    font-family: monospace;
    white-space: pre-wrap;
}";

/// A titled block of report content.
struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    fn add_content(&mut self, markup: Markup) {
        self.content.push(markup);
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    (block)
                }
            }
        }
    }
}

fn metrics_row(label: &str, m: &ClassMetrics) -> Markup {
    html! {
        tr {
            th { (label) }
            td { (format!("{:.4}", m.precision)) }
            td { (format!("{:.4}", m.recall)) }
            td { (format!("{:.4}", m.f1)) }
        }
    }
}

fn json_block<T: serde::Serialize>(value: &T) -> Result<Markup> {
    Ok(html! {
        div class="code-container" {
            pre { code { (serde_json::to_string_pretty(value)?) } }
        }
    })
}

/// Render `outcome` as a standalone HTML page.
pub fn render_html(outcome: &EvaluationOutcome) -> Result<String> {
    let report = &outcome.report;
    let mut sections = Vec::new();

    let mut overview = ReportSection::new("Cross-Validation");
    let [[tn, fp], [fn_, tp]] = report.confusion_mean;
    overview.add_content(html! {
        p {
            (report.num_folds) " folds, " (report.fold_policy) " partitioning, "
            (report.pooled.support()) " out-of-fold predictions."
        }
        h3 { "Average Confusion Matrix" }
        table {
            tr { th {} th { "Predicted 0" } th { "Predicted 1" } }
            tr { th { "Actual 0" } td { (format!("{:.1}", tn)) } td { (format!("{:.1}", fp)) } }
            tr { th { "Actual 1" } td { (format!("{:.1}", fn_)) } td { (format!("{:.1}", tp)) } }
        }
        h3 { "Fold-Averaged Metrics" }
        table {
            tr { th {} th { "Precision" } th { "Recall" } th { "F1" } }
            (metrics_row("Class 1 - Long Career Players", &report.class_1))
            (metrics_row("Class 0 - Short Career Players", &report.class_0))
        }
        h3 { "Per-Fold Metrics" }
        table {
            tr { th { "Fold" } th { "TN" } th { "FP" } th { "FN" } th { "TP" } th { "F1 (class 1)" } th { "F1 (class 0)" } }
            @for fold in &report.folds {
                tr {
                    td { (fold.fold + 1) }
                    td { (fold.confusion.true_negative) }
                    td { (fold.confusion.false_positive) }
                    td { (fold.confusion.false_negative) }
                    td { (fold.confusion.true_positive) }
                    td { (format!("{:.4}", fold.class_1.f1)) }
                    td { (format!("{:.4}", fold.class_0.f1)) }
                }
            }
        }
        h3 { "Full Classification Report" }
        div class="code-container" { pre { (report.pooled.to_string()) } }
    });
    sections.push(overview);

    if let Some(config) = &outcome.best_config {
        let mut section = ReportSection::new("Best Configuration");
        section.add_content(json_block(config)?);
        sections.push(section);
    }

    if !outcome.trials.is_empty() {
        let mut section = ReportSection::new("Search History");
        section.add_content(html! {
            table {
                tr { th { "Trial" } th { "Mean F1" } th { "Parameters" } }
                @for trial in &outcome.trials {
                    tr {
                        td { (trial.number) }
                        td {
                            @match trial.value {
                                Some(v) => (format!("{:.4}", v)),
                                None => "-",
                            }
                        }
                        td style="text-align: left" { (format_params(&trial.params)) }
                    }
                }
            }
        });
        sections.push(section);
    }

    if outcome.fold_configs.len() > 1 && outcome.fold_configs.windows(2).any(|w| w[0] != w[1]) {
        let mut section = ReportSection::new("Per-Fold Configurations");
        section.add_content(json_block(&outcome.fold_configs)?);
        sections.push(section);
    }

    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let page = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "NBA Career Classifier Report" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "NBA Career Classifier Report" }
                p { "Generated " (generated) }
                @for section in &sections {
                    (section.render())
                }
            }
        }
    };
    Ok(page.into_string())
}

/// Render `outcome` and write it to `path`.
pub fn save_html<P: AsRef<Path>>(outcome: &EvaluationOutcome, path: P) -> Result<()> {
    fs::write(path.as_ref(), render_html(outcome)?)?;
    log::info!("Report written to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::cross_validation::FoldPolicy;
    use crate::metrics::{ClassificationReport, ConfusionMatrix, FoldMetrics};
    use crate::report::AggregateReport;

    #[test]
    fn test_json_block_escapes_markup() {
        let block = json_block(&"<script>a & b</script>").unwrap().into_string();
        assert!(block.contains("&lt;script&gt;a &amp; b&lt;/script&gt;"));
        assert!(!block.contains("<script>"));
    }

    #[test]
    fn test_render_contains_sections() {
        let cm = ConfusionMatrix {
            true_negative: 2,
            false_positive: 1,
            false_negative: 1,
            true_positive: 4,
        };
        let outcome = EvaluationOutcome {
            report: AggregateReport {
                fold_policy: FoldPolicy::Stratified,
                num_folds: 2,
                confusion_sum: cm,
                confusion_mean: [[1.0, 0.5], [0.5, 2.0]],
                class_0: cm.class_metrics(0),
                class_1: cm.class_metrics(1),
                folds: vec![FoldMetrics::new(0, cm), FoldMetrics::new(1, cm)],
                pooled: ClassificationReport::new(&[0, 0, 1, 1], &[0, 1, 1, 1]),
            },
            best_config: Some(ModelConfig::default()),
            fold_configs: vec![ModelConfig::default(); 2],
            trials: Vec::new(),
            model: None,
        };
        let page = render_html(&outcome).unwrap();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Average Confusion Matrix"));
        assert!(page.contains("Best Configuration"));
        assert!(page.contains("RandomForest"));
        assert!(!page.contains("Search History"));
        assert!(!page.contains("Per-Fold Configurations"));
    }
}
