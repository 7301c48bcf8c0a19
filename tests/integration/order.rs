use predicates::prelude::*;

use crate::{shop_fixture, stackref};

#[test]
fn test_order_lists_producers_first() {
    let fixture = shop_fixture();

    let output = stackref(&fixture).args(["order", "app.toml"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let storage = stdout.find("1. Storage").unwrap();
    let web = stdout.find("2. Web").unwrap();
    assert!(storage < web);
    assert!(stdout.contains("Web -> Storage/Bucket.Arn"));
}

#[test]
fn test_order_of_unrelated_stacks() {
    let fixture = crate::AppFixture::new()
        .unwrap()
        .with_manifest(
            "app.yaml",
            "stacks:\n  - id: Alpha\n  - id: Beta\n",
        )
        .unwrap();

    stackref(&fixture)
        .args(["order", "app.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alpha"))
        .stdout(predicate::str::contains("Beta"))
        .stdout(predicate::str::contains("after").not());
}
