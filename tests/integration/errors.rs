use predicates::prelude::*;

use crate::{AppFixture, stackref};

#[test]
fn test_cross_environment_reference_fails() {
    let manifest = r#"
[[stacks]]
id = "Producer"
account = "111111111111"
region = "us-east-1"

[[stacks.resources]]
id = "Bucket"
type = "AWS::S3::Bucket"

[[stacks]]
id = "Consumer"
account = "222222222222"
region = "us-east-1"

[[stacks.resources]]
id = "Queue"
type = "AWS::SQS::Queue"
properties = { Name = { Ref = "Producer/Bucket" } }
"#;
    let fixture = AppFixture::new().unwrap().with_manifest("app.toml", manifest).unwrap();

    stackref(&fixture)
        .args(["synth", "app.toml", "-o", "out"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cross stack references are only supported"))
        .stderr(predicate::str::contains("suggestion"));

    assert!(!fixture.path("out").exists());
}

#[test]
fn test_unknown_reference_target_fails() {
    let manifest = r#"
[[stacks]]
id = "Solo"

[[stacks.resources]]
id = "Queue"
type = "AWS::SQS::Queue"
properties = { Name = { Ref = "Solo/Missing" } }
"#;
    let fixture = AppFixture::new().unwrap().with_manifest("app.toml", manifest).unwrap();

    stackref(&fixture)
        .args(["refs", "app.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Solo/Missing"));
}

#[test]
fn test_missing_manifest_fails() {
    let fixture = AppFixture::new().unwrap();

    stackref(&fixture)
        .args(["synth", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn test_invalid_manifest_syntax_fails() {
    let fixture = AppFixture::new().unwrap().with_manifest("app.toml", "[[stacks]\nid = ").unwrap();

    stackref(&fixture)
        .args(["order", "app.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("app.toml"));
}

#[test]
fn test_invalid_global_config_fails() {
    let fixture = crate::shop_fixture().with_config("default_format = \"xml\"\n").unwrap();

    stackref(&fixture)
        .args(["refs", "app.toml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("--config"));
}
