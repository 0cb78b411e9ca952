//! Shared test utilities for stagehand-bundler tests.

#![allow(dead_code)]

use std::path::Path;

use stagehand_bundler::{BuildOutcome, BuildRequest, Environment, Pipeline};
use tempfile::TempDir;

/// Create an application root with the given file tree.
pub fn app(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    for (rel, contents) in files {
        write_file(tmp.path(), rel, contents);
    }
    tmp
}

pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("mkdir {rel}: {e}"));
    }
    std::fs::write(&path, contents).unwrap_or_else(|e| panic!("write {rel}: {e}"));
}

/// Build `path` against `root` in the test environment.
pub async fn build(root: &Path, path: &str) -> BuildOutcome {
    build_request(BuildRequest::new(path, root)).await
}

pub async fn build_request(request: BuildRequest) -> BuildOutcome {
    let pipeline = Pipeline::new(Environment::Test);
    pipeline
        .build(request)
        .await
        .unwrap_or_else(|e| panic!("build failed with a hard error: {e}"))
}

/// The concatenated UTF-8 contents of every produced file.
pub fn all_output(outcome: &BuildOutcome) -> String {
    outcome
        .outputs
        .iter()
        .map(|file| String::from_utf8_lossy(&file.contents).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn assert_output_contains(outcome: &BuildOutcome, needle: &str) {
    let combined = all_output(outcome);
    assert!(
        combined.contains(needle),
        "expected output to contain '{needle}'.\nOutput preview (first 800 chars): {}",
        &combined[..combined.len().min(800)]
    );
}

pub fn assert_output_not_contains(outcome: &BuildOutcome, needle: &str) {
    let combined = all_output(outcome);
    assert!(
        !combined.contains(needle),
        "expected output NOT to contain '{needle}', but it did"
    );
}
