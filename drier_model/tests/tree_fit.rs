use drier_model::{ModelError, ModelPaths, Sample, TrainedModels, TreeParams, persist};
use drier_traits::{Features, MoistureRegressor, StatusClassifier};
use rstest::rstest;
use tempfile::tempdir;

/// Synthetic drying curve: moisture falls with heat and elapsed time.
fn drying_samples() -> Vec<Sample> {
    let mut out = Vec::new();
    for step in 0..40 {
        let remaining = 240.0 - (step as f64) * 6.0;
        let humidity = 80.0 - (step as f64);
        let temperature = 35.0 + (step as f64) * 0.4;
        let moisture = if step < 20 { 40.0 } else { 12.0 };
        let status = if step < 20 { "Basah" } else { "Kering" };
        out.push(Sample {
            features: Features::new(humidity, temperature, remaining),
            status: status.to_string(),
            moisture,
        });
    }
    out
}

#[rstest]
fn separates_wet_and_dry_phases() {
    let models = TrainedModels::train(&drying_samples(), &TreeParams::default()).unwrap();
    let wet = Features::new(78.0, 36.0, 230.0);
    let dry = Features::new(45.0, 49.0, 20.0);

    assert_eq!(models.status.classify(&wet).unwrap(), "Basah");
    assert_eq!(models.status.classify(&dry).unwrap(), "Kering");
    assert!((models.moisture.estimate(&wet).unwrap() - 40.0).abs() < 1e-9);
    assert!((models.moisture.estimate(&dry).unwrap() - 12.0).abs() < 1e-9);
    // Two constant phases need exactly one split.
    assert_eq!(models.moisture.root().leaves(), 2);
    assert_eq!(models.status.classes(), ["Basah".to_string(), "Kering".to_string()]);
}

#[rstest]
fn saved_models_predict_like_before_saving() {
    let dir = tempdir().unwrap();
    let paths = ModelPaths {
        status: dir.path().join("models/status_model.json"),
        moisture: dir.path().join("models/moisture_model.json"),
    };
    let models = TrainedModels::train(&drying_samples(), &TreeParams::default()).unwrap();
    models.save(&paths).unwrap();

    let loaded = TrainedModels::load(&paths).unwrap();
    assert_eq!(loaded.status, models.status);
    assert_eq!(loaded.moisture, models.moisture);
}

#[rstest]
fn loading_the_wrong_kind_is_rejected() {
    let dir = tempdir().unwrap();
    let models = TrainedModels::train(&drying_samples(), &TreeParams::default()).unwrap();
    let path = dir.path().join("moisture_model.json");
    persist::save(&models.moisture, models.samples, &path).unwrap();

    let err = persist::load::<drier_model::TreeClassifier>(&path).expect_err("kind mismatch");
    assert!(matches!(err, ModelError::WrongKind { .. }), "{err}");
}

#[rstest]
#[case("not json at all")]
#[case(r#"{"kind":"moisture_regressor","format":1,"model":{"root":{"node":"split","feature":7,"threshold":1.0,"left":{"node":"leaf","value":1.0},"right":{"node":"leaf","value":2.0}}}}"#)]
#[case(r#"{"kind":"moisture_regressor","format":99,"model":{"root":{"node":"leaf","value":1.0}}}"#)]
fn corrupt_files_are_errors_not_panics(#[case] body: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("moisture_model.json");
    std::fs::write(&path, body).unwrap();
    assert!(persist::load::<drier_model::TreeRegressor>(&path).is_err());
}

#[rstest]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let paths = ModelPaths {
        status: dir.path().join("absent_status.json"),
        moisture: dir.path().join("absent_moisture.json"),
    };
    assert!(matches!(
        TrainedModels::load(&paths),
        Err(ModelError::Io { .. })
    ));
}

#[rstest]
fn unknown_format_is_reported_before_the_model_is_parsed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("status_model.json");
    std::fs::write(
        &path,
        r#"{"kind":"status_classifier","format":2,"model":{"layout":"something newer"}}"#,
    )
    .unwrap();
    let err = persist::load::<drier_model::TreeClassifier>(&path).expect_err("format mismatch");
    assert!(
        matches!(err, ModelError::WrongFormat { found: 2, .. }),
        "{err}"
    );
}

#[rstest]
fn failed_pair_save_replaces_neither_file() {
    let dir = tempdir().unwrap();
    let old = TrainedModels::train(&drying_samples()[..30], &TreeParams::default()).unwrap();
    let paths = ModelPaths {
        status: dir.path().join("status_model.json"),
        moisture: dir.path().join("blocked/moisture_model.json"),
    };
    persist::save(&old.status, old.samples, &paths.status).unwrap();
    let before = std::fs::read(&paths.status).unwrap();
    // The moisture file's parent is a regular file, so staging it fails.
    std::fs::write(dir.path().join("blocked"), b"").unwrap();

    let fresh = TrainedModels::train(&drying_samples(), &TreeParams::default()).unwrap();
    assert!(matches!(fresh.save(&paths), Err(ModelError::Io { .. })));

    assert_eq!(std::fs::read(&paths.status).unwrap(), before);
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".new"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
