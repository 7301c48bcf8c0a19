use predicates::prelude::*;
use serde_json::Value;
use std::fs;

use crate::{shop_fixture, stackref};

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_synth_writes_templates_and_manifest() {
    let fixture = shop_fixture();

    stackref(&fixture)
        .args(["synth", "app.toml", "-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Synthesized 3 stacks"));

    let out = fixture.path("out");
    assert!(out.join("Storage.template.json").exists());
    assert!(out.join("Web.template.json").exists());

    let manifest = read_json(&out.join("manifest.json"));
    assert_eq!(manifest["deploy_order"], serde_json::json!(["Storage", "Web"]));
    let artifacts = manifest["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 3);
    let web = artifacts.iter().find(|a| a["path"] == "Web").unwrap();
    assert_eq!(web["dependencies"], serde_json::json!(["Storage"]));
}

#[test]
fn test_synth_wires_export_and_import() {
    let fixture = shop_fixture();
    stackref(&fixture).args(["synth", "app.toml", "-o", "out"]).assert().success();

    let storage = read_json(&fixture.path("out/Storage.template.json"));
    let web = read_json(&fixture.path("out/Web.template.json"));

    let import = web["Resources"]["Queue"]["Properties"]["QueueName"]["Fn::ImportValue"].as_str().unwrap();
    assert!(import.starts_with("Storage:ExportsOutputFnGetAttBucketArn"));

    let outputs = storage["Outputs"].as_object().unwrap();
    assert_eq!(outputs.len(), 1);
    let output = outputs.values().next().unwrap();
    assert_eq!(output["Export"]["Name"], import);
    assert_eq!(output["Value"], serde_json::json!({"Fn::GetAtt": ["Bucket", "Arn"]}));
}

#[test]
fn test_synth_passes_parent_values_into_nested_stack() {
    let fixture = shop_fixture();
    stackref(&fixture).args(["synth", "app.toml", "-o", "out"]).assert().success();

    let web = read_json(&fixture.path("out/Web.template.json"));
    let nested = &web["Resources"]["WorkersNestedStackResource"];
    assert_eq!(nested["Type"], "AWS::CloudFormation::Stack");

    let template_url = nested["Properties"]["TemplateURL"].as_str().unwrap();
    let parameters = nested["Properties"]["Parameters"].as_object().unwrap();
    let (parameter, value) = parameters.iter().next().unwrap();
    assert_eq!(value, &serde_json::json!({"Ref": "Queue"}));

    let workers = read_json(&fixture.path("out").join(template_url));
    assert!(workers["Parameters"].get(parameter).is_some());
    assert_eq!(
        workers["Resources"]["Function"]["Properties"]["Queue"],
        serde_json::json!({"Ref": parameter})
    );
}

#[test]
fn test_synth_uses_configured_output_dir() {
    let fixture = shop_fixture().with_config("default_output_dir = \"assembly\"\n").unwrap();

    stackref(&fixture).args(["synth", "app.toml"]).assert().success();

    assert!(fixture.path("assembly/manifest.json").exists());
}
