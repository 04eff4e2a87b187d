//! Configuration loading tests

use std::collections::HashMap;
use std::time::Duration;

use workflow_trials::config::{TrackingConfig, ENV_ACCOUNT_ID, ENV_REGION};
use workflow_trials::{Error, TrackingContext};

#[test]
fn test_from_file_partial() {
    let path = std::env::temp_dir().join("workflow_trials_config_partial.json");
    std::fs::write(
        &path,
        r#"{"registry": {"region": "eu-west-1"}, "cleanup": {"delete_delay_ms": 0}}"#,
    )
    .unwrap();

    let config = TrackingConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.registry.region, "eu-west-1");
    assert_eq!(config.registry.partition, "aws");
    assert_eq!(config.cleanup.delete_delay(), Duration::ZERO);
    assert_eq!(config.listing.page_size, 100);
}

#[test]
fn test_from_file_invalid() {
    let path = std::env::temp_dir().join("workflow_trials_config_invalid.json");
    std::fs::write(&path, r#"{"listing": {"page_size": 1000}}"#).unwrap();

    let err = TrackingConfig::from_file(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("page_size")));
}

#[test]
fn test_from_file_missing() {
    let err = TrackingConfig::from_file("/nonexistent/workflow_trials.json").unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn test_overrides_feed_resource_arns() {
    let env: HashMap<&str, &str> = [(ENV_REGION, "ap-south-1"), (ENV_ACCOUNT_ID, "123456789012")]
        .into_iter()
        .collect();
    let config =
        TrackingConfig::default().with_overrides(|key| env.get(key).map(ToString::to_string));
    config.validate().unwrap();

    assert_eq!(
        config.resource_arn("training-job", "train-1"),
        "arn:aws:sagemaker:ap-south-1:123456789012:training-job/train-1"
    );
}

#[test]
fn test_context_rejects_invalid_config() {
    let mut config = TrackingConfig::default();
    config.registry.account_id = "abc".into();

    let err = TrackingContext::in_memory().with_config(config).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("account_id")));
}
