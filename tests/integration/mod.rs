//! Integration test suite for stackref
//!
//! End-to-end tests that run the `stackref` binary over app manifests written
//! to temporary directories. Every test points `STACKREF_CONFIG` at its own
//! fixture so the user's global configuration never leaks in.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **synth**: assembly output, nested stacks, exports
//! - **refs**: reference reports in every format
//! - **order**: deploy order and dependency reasons
//! - **config**: global configuration commands and effects
//! - **errors**: failure exit codes and messages

use assert_cmd::Command;
use stackref_cli::test_utils::AppFixture;

mod config;
mod errors;
mod order;
mod refs;
mod synth;

/// Producer exports a bucket consumed by an independent stack; a nested stack
/// of the consumer reads a value from its parent.
pub const SHOP_APP: &str = r#"
name = "Shop"

[[stacks]]
id = "Storage"
account = "111111111111"
region = "eu-west-1"

[[stacks.resources]]
id = "Bucket"
type = "AWS::S3::Bucket"

[[stacks]]
id = "Web"
account = "111111111111"
region = "eu-west-1"

[[stacks.resources]]
id = "Queue"
type = "AWS::SQS::Queue"
properties = { QueueName = { "Fn::GetAtt" = ["Storage/Bucket", "Arn"] } }

[[stacks.nested]]
id = "Workers"

[[stacks.nested.resources]]
id = "Function"
type = "AWS::Lambda::Function"
properties = { Queue = { Ref = "Web/Queue" } }
"#;

/// A `stackref` command isolated to the fixture's config and directory.
pub fn stackref(fixture: &AppFixture) -> Command {
    let mut cmd = Command::cargo_bin("stackref").unwrap();
    cmd.current_dir(fixture.root()).env("STACKREF_CONFIG", fixture.config_path()).env_remove("RUST_LOG").env("CLICOLOR", "0");
    cmd
}

/// A fixture holding [`SHOP_APP`] as `app.toml`.
pub fn shop_fixture() -> AppFixture {
    AppFixture::new().unwrap().with_manifest("app.toml", SHOP_APP).unwrap()
}
