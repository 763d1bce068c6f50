//! File-level tests for the annotation formats.
//!
//! These tests write real files under the system temp directory and read
//! them back through the `LabelFormat` trait.


use std::path::PathBuf;

/// Fresh directory under the system temp dir, unique per test.
pub(super) fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "labelcanvas_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
