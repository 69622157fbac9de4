use ndarray::{Array1, Array2};
use nba_career_classifiers::config::{BoostingParams, ClassifierFamily, ModelConfig, ModelType};
use nba_career_classifiers::models::factory;

fn toy_data() -> (Array2<f64>, Array1<u8>) {
    let x = Array2::from_shape_vec(
        (6, 2),
        vec![
            1.0, 0.0, // class 1
            0.0, 1.0, // class 0
            1.0, 0.1, // class 1
            0.0, 0.9, // class 0
            1.1, 0.0, // class 1
            0.0, 1.2, // class 0
        ],
    )
    .expect("failed to create feature matrix");
    let y = Array1::from_vec(vec![1u8, 0, 1, 0, 1, 0]);
    (x, y)
}

#[test]
fn test_factory_builds_and_predicts() {
    let (x, y) = toy_data();

    let config = ModelConfig::new(ModelType::GradientBoosting(BoostingParams {
        n_estimators: 3,
        max_depth: 3,
        learning_rate: 0.1,
        ..Default::default()
    }));

    let mut model = factory::build_model(config).unwrap();
    model.fit(&x, &y).unwrap();
    let probs = model.predict_proba(&x).unwrap();
    assert_eq!(probs.len(), x.nrows());
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_every_family_fits_and_reports_its_family() {
    let (x, y) = toy_data();
    for family in ClassifierFamily::ALL {
        let mut model = factory::build_model(ModelConfig::new(ModelType::default_for(family)))
            .expect("default config is valid");
        model.fit(&x, &y).unwrap();
        assert_eq!(model.family(), Some(family));
        assert_eq!(model.n_features(), Some(2));
        let predicted = model.predict(&x).unwrap();
        assert_eq!(predicted.len(), 6);
    }
}

#[test]
fn test_predict_before_fit_fails() {
    let (x, _) = toy_data();
    let model = factory::build_model(ModelConfig::default()).unwrap();
    assert!(model.predict_proba(&x).is_err());
}
