use predicates::prelude::*;
use serde_json::Value;

use crate::{shop_fixture, stackref};

#[test]
fn test_refs_json_report() {
    let fixture = shop_fixture();

    let output = stackref(&fixture).args(["refs", "app.toml"]).output().unwrap();
    assert!(output.status.success());

    let rows: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 2);

    let export = rows.iter().find(|r| r["topology"] == "export-import").unwrap();
    assert_eq!(export["source"], "Web/Queue");
    assert_eq!(export["consumer"], "Web");
    assert_eq!(export["target"], "Storage/Bucket");
    assert_eq!(export["attribute"], "Arn");
    assert!(export["value"]["Fn::ImportValue"].is_string());

    let nested = rows.iter().find(|r| r["topology"] == "parent-to-nested").unwrap();
    assert_eq!(nested["source"], "Web/Workers/Function");
    assert!(nested["value"]["Ref"].as_str().unwrap().starts_with("referenceto"));
}

#[test]
fn test_refs_text_report() {
    let fixture = shop_fixture();

    stackref(&fixture)
        .args(["refs", "app.toml", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Web/Queue -> Storage/Bucket.Arn"))
        .stdout(predicate::str::contains("export-import"));
}

#[test]
fn test_refs_yaml_from_config_default() {
    let fixture = shop_fixture().with_config("default_format = \"yaml\"\n").unwrap();

    stackref(&fixture)
        .args(["refs", "app.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("topology: export-import"));
}

#[test]
fn test_refs_all_includes_same_stack() {
    let fixture = crate::AppFixture::new()
        .unwrap()
        .with_manifest(
            "app.json",
            r#"{"stacks": [{"id": "Solo", "resources": [
                {"id": "Bucket", "type": "AWS::S3::Bucket"},
                {"id": "Queue", "type": "AWS::SQS::Queue", "properties": {"Name": {"Ref": "Solo/Bucket"}}}
            ]}]}"#,
        )
        .unwrap();

    stackref(&fixture)
        .args(["refs", "app.json", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cross-stack references"));

    stackref(&fixture)
        .args(["refs", "app.json", "--format", "text", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("same-stack"));
}
