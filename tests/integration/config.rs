use predicates::prelude::*;

use crate::{AppFixture, stackref};

#[test]
fn test_config_path_honors_env() {
    let fixture = AppFixture::new().unwrap();

    stackref(&fixture)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(fixture.config_path().display().to_string()));
}

#[test]
fn test_config_show_defaults() {
    let fixture = AppFixture::new().unwrap();

    stackref(&fixture)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stack_relative_exports = true"))
        .stdout(predicate::str::contains("default_output_dir = \"stack.out\""));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let fixture = AppFixture::new().unwrap().with_config("default_format = \"text\"\n").unwrap();

    stackref(&fixture).args(["config", "init"]).assert().success().stdout(predicate::str::contains("already exists"));
    assert!(std::fs::read_to_string(fixture.config_path()).unwrap().contains("text"));

    stackref(&fixture).args(["config", "init", "--force"]).assert().success();
    assert!(std::fs::read_to_string(fixture.config_path()).unwrap().contains("json"));
}

#[test]
fn test_legacy_export_names_from_config() {
    let manifest = r#"
[[stacks]]
id = "Producer"
scope = "Stage"

[[stacks.resources]]
id = "Bucket"
type = "AWS::S3::Bucket"

[[stacks]]
id = "Consumer"
scope = "Stage"

[[stacks.resources]]
id = "Queue"
type = "AWS::SQS::Queue"
properties = { Name = { Ref = "Stage/Producer/Bucket" } }
"#;
    let relative = AppFixture::new().unwrap().with_manifest("app.toml", manifest).unwrap();
    stackref(&relative)
        .args(["refs", "app.toml", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stage-Producer:ExportsOutputRefBucket"));

    let legacy = AppFixture::new()
        .unwrap()
        .with_manifest("app.toml", manifest)
        .unwrap()
        .with_config("stack_relative_exports = false\n")
        .unwrap();
    stackref(&legacy)
        .args(["refs", "app.toml", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stage-Producer:ProducerExportsOutputRefBucket"));
}
