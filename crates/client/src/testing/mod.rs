//! Testing utilities for TM1 client tests.
//!
//! Fixture loading plus `proptest` strategies for versions, cellsets and
//! load tables. Available when running tests or when the `test-utils`
//! feature is enabled.
//!
//! # Example
//! ```ignore
//! use tm1_client::testing::{load_fixture, generators::cellset_json};
//!
//! let login = load_fixture("cellsets/axes_2x2.json");
//! ```

pub mod generators;

use std::path::Path;

/// Load a JSON fixture file from the fixtures directory.
///
/// # Arguments
/// * `fixture_path` - Relative path within the fixtures directory (e.g., "cubes/cube.json")
///
/// # Panics
/// - If the fixture file cannot be read
/// - If the file content is not valid JSON
pub fn load_fixture(fixture_path: &str) -> serde_json::Value {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let full_path = manifest_dir.join("fixtures").join(fixture_path);
    let content = std::fs::read_to_string(&full_path)
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", full_path.display()));
    serde_json::from_str(&content).expect("Invalid JSON in fixture")
}
