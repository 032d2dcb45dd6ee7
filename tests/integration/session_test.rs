//! Tests for the interactive matching session

use crate::utils::{fixture_data, quiet_config};
use popmatch::{MatcherConfig, MatchingError, MatchingSession, POSTMATCH_SUFFIX};

const COLORS: [&str; 3] = ["red", "blue", "green"];
use tempfile::tempdir;

#[test]
fn test_session_keeps_original_untouched() {
    let mut session = MatchingSession::with_toy_dataset(90, 30, 21).unwrap();
    let before = session.original().copy().unwrap();

    let comparison = session.run_match(&quiet_config(3)).unwrap();

    assert_eq!(session.original(), &before);
    assert_eq!(comparison.features.len(), before.schema().len());
    assert_eq!(
        session.dataset().num_rows(),
        before.num_rows() + 2 * 30
    );
    let postmatch = format!("target{POSTMATCH_SUFFIX}");
    assert_eq!(session.dataset().counts()[&postmatch], 30);
}

#[test]
fn test_failed_run_leaves_session_unchanged() {
    let mut session = MatchingSession::with_toy_dataset(40, 10, 2).unwrap();
    let config = MatcherConfig::builder()
        .objective("base")
        .show_progress(false)
        .build();

    let result = session.run_match(&config);
    assert!(matches!(result, Err(MatchingError::UnknownObjective(_))));
    assert!(session.last_result().is_none());
    assert_eq!(session.dataset(), session.original());
}

#[test]
fn test_config_file_drives_session() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"objective": "ks", "method": "optimal", "max_iter": 2, "show_progress": false}"#,
    )
    .unwrap();
    let config = MatcherConfig::from_json_file(&path).unwrap();

    let mut session = MatchingSession::with_toy_dataset(50, 10, 8).unwrap();
    let comparison = session.run_match(&config).unwrap();
    assert_eq!(comparison.objective.key(), "ks");
    assert_eq!(session.last_result().map(|r| r.iterations), Some(2));
}

#[test]
fn test_custom_population_labels_in_reports() {
    let mut x = Vec::new();
    let mut color = Vec::new();
    let mut population = Vec::new();
    for i in 0..30 {
        x.push(i as f64 * 0.5);
        color.push(COLORS[i % 3]);
        population.push("control");
    }
    for i in 0..10 {
        x.push(5.0 + i as f64 * 0.4);
        color.push(COLORS[(i + 1) % 3]);
        population.push("case");
    }
    let data = fixture_data(&x, &color, &population);

    let mut session = MatchingSession::new(data).unwrap();
    let config = MatcherConfig::builder()
        .max_iter(2)
        .populations("control", "case")
        .show_progress(false)
        .build();
    session.run_match(&config).unwrap();
    assert_eq!(session.dataset().counts()["case (postmatch)"], 10);
    assert_eq!(session.dataset().counts()["control (postmatch)"], 10);

    let (before, after) = session.balance_reports().unwrap();
    let after = after.unwrap();
    assert_eq!(before.feature_losses.len(), 2);
    assert_eq!(after.objective, "smd");
    assert!(after.summary.loss.is_finite());
}
