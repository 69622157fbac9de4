use std::io::Write;

use nba_career_classifiers::config::{ClassifierFamily, ModelConfig, ModelType};
use nba_career_classifiers::data_handling::{read_dataset_csv, FEATURE_NAMES, LABEL_COLUMN};
use nba_career_classifiers::error::ClassifierError;
use nba_career_classifiers::inference::{predict_with_probability, CareerOutcome, PlayerStats};
use nba_career_classifiers::io::{load_model, save_model};
use nba_career_classifiers::models::factory::build_model;

const PLAYER: [f64; 19] = [
    80.0, 30.2, 15.3, 5.8, 12.7, 45.8, 1.2, 3.6, 33.3, 3.2, 4.0, 80.2, 1.1, 4.5, 5.6, 4.3, 1.2,
    0.5, 2.1,
];

/// Writes a small career CSV with a `Name` column and one missing 3P% cell.
fn write_career_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("nba_logreg.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Name,{},{}", FEATURE_NAMES.join(","), LABEL_COLUMN).unwrap();
    for i in 0..40 {
        let long = i % 2 == 0;
        let base = if long { 60.0 } else { 25.0 };
        let mut cells: Vec<String> = (0..19)
            .map(|c| format!("{:.1}", base / (c + 1) as f64 + (i % 7) as f64 * 0.3))
            .collect();
        if i == 3 {
            cells[8] = String::new();
        }
        let label = if long { "1.0" } else { "0.0" };
        writeln!(file, "Player {},{},{}", i, cells.join(","), label).unwrap();
    }
    path
}

#[test]
fn test_csv_train_save_load_predict() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = read_dataset_csv(write_career_csv(dir.path())).unwrap();
    assert_eq!(dataset.n_samples(), 40);
    assert_eq!(dataset.n_features(), 19);
    assert_eq!(dataset.class_counts(), [20, 20]);
    assert!(dataset.x.iter().all(|v| v.is_finite()));

    let mut model = build_model(ModelConfig::default()).unwrap();
    model.fit(&dataset.x, &dataset.y).unwrap();

    let prediction = predict_with_probability(model.as_ref(), &PLAYER).unwrap();
    assert!((0.0..=1.0).contains(&prediction.probability));
    assert_eq!(
        prediction.label == CareerOutcome::LongCareer,
        model.predict(&ndarray::Array2::from_shape_vec((1, 19), PLAYER.to_vec()).unwrap())
            .unwrap()[0]
            == 1
    );

    let path = dir.path().join("model.json");
    save_model(model.as_ref(), &dataset.feature_names, &path).unwrap();
    let loaded = load_model(&path).unwrap();
    assert_eq!(loaded.family, ClassifierFamily::RandomForest);
    assert_eq!(loaded.feature_names, dataset.feature_names);
    let reloaded = predict_with_probability(loaded.model.as_ref(), &PLAYER).unwrap();
    assert_eq!(reloaded, prediction);
}

#[test]
fn test_wrong_feature_width_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = read_dataset_csv(write_career_csv(dir.path())).unwrap();
    let mut model = build_model(ModelConfig::new(ModelType::default_for(
        ClassifierFamily::GradientBoosting,
    )))
    .unwrap();
    model.fit(&dataset.x, &dataset.y).unwrap();

    let err = predict_with_probability(model.as_ref(), &PLAYER[..18]).unwrap_err();
    assert!(matches!(err, ClassifierError::ShapeMismatch { .. }));
}

#[test]
fn test_svc_models_are_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = read_dataset_csv(write_career_csv(dir.path())).unwrap();
    let mut model = build_model(ModelConfig::new(ModelType::default_for(ClassifierFamily::Svc))).unwrap();
    model.fit(&dataset.x, &dataset.y).unwrap();

    let prediction = predict_with_probability(model.as_ref(), &PLAYER).unwrap();
    assert!((0.0..=1.0).contains(&prediction.probability));

    let err = save_model(model.as_ref(), &dataset.feature_names, dir.path().join("svc.json"))
        .unwrap_err();
    assert!(matches!(err, ClassifierError::UnsupportedPersistence(_)));
}

#[test]
fn test_player_stats_json() {
    let json = r#"{
        "GP": 80, "MIN": 30.2, "PTS": 15.3, "FGM": 5.8, "FGA": 12.7, "FG%": 45.8,
        "3P Made": 1.2, "3PA": 3.6, "3P%": 33.3, "FTM": 3.2, "FTA": 4.0, "FT%": 80.2,
        "OREB": 1.1, "DREB": 4.5, "REB": 5.6, "AST": 4.3, "STL": 1.2, "BLK": 0.5, "TOV": 2.1
    }"#;
    let stats: PlayerStats = serde_json::from_str(json).unwrap();
    assert_eq!(stats.to_features(), PLAYER.to_vec());
}
