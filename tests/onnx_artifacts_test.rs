//! Runs against a real exported artifact set. Point `MENU_PROFIT_ARTIFACTS`
//! at a directory with preprocessor.onnx, xgb_model.onnx and
//! label_encoder.json, then run `cargo test -- --ignored`.

use std::env;

use menu_profit::{ArtifactPaths, ArtifactStore, MenuRecord, ProfitabilityLabel};

fn store() -> ArtifactStore {
    let dir = env::var("MENU_PROFIT_ARTIFACTS").expect("MENU_PROFIT_ARTIFACTS must point at an artifact directory");
    ArtifactStore::new(ArtifactPaths::in_dir(dir))
}

#[test]
#[ignore]
fn test_real_artifacts_predict_known_label() -> Result<(), Box<dyn std::error::Error>> {
    let store = store();
    let context = store.context()?;
    let record = MenuRecord::new("R1", "Appetizer", "Spring Roll", "cabbage, flour, oil", 5.50);

    let first = context.pipeline.predict_traced(&record)?;
    let second = context.pipeline.predict_traced(&record)?;

    assert!(ProfitabilityLabel::ALL.contains(&first.label));
    assert_eq!(first, second);
    assert!(first.feature_width > 0);
    Ok(())
}

#[test]
#[ignore]
fn test_real_artifacts_loaded_once() -> Result<(), Box<dyn std::error::Error>> {
    let store = store();
    let first = store.context()?;
    let second = store.context()?;
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(first.fingerprints.len() >= 3);
    Ok(())
}
