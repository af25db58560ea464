#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use pim_hierarchy::Cell;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

pub fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Rows of text cells; empty strings become [`Cell::Null`].
pub fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Cell>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|value| {
                    if value.is_empty() {
                        Cell::Null
                    } else {
                        Cell::from(*value)
                    }
                })
                .collect()
        })
        .collect()
}

/// `[Category, SKU, Name, Color]` over 100 rows with five categories.
pub fn two_level_catalogue() -> (Vec<String>, Vec<Vec<Cell>>) {
    let categories = ["Shoes", "Bags", "Hats", "Belts", "Socks"];
    let colors = ["red", "blue", "green", "black"];
    let rows = (0..100)
        .map(|i| {
            vec![
                Cell::from(categories[i % categories.len()]),
                Cell::from(format!("SKU-{i:04}")),
                Cell::from(format!("Product {i}")),
                Cell::from(colors[i % colors.len()]),
            ]
        })
        .collect();
    (headers(&["Category", "SKU", "Name", "Color"]), rows)
}

/// A wide catalogue: eight family-caliber columns, one model-caliber
/// column and item-level fields.
pub fn wide_catalogue(rows: usize) -> (Vec<String>, Vec<Vec<Cell>>) {
    let names = [
        "Division",
        "Brand",
        "Season",
        "Gender",
        "Collection",
        "Line",
        "Style",
        "Model",
        "SKU",
        "Name",
        "EAN",
        "Color",
        "Size",
        "Price",
        "Weight",
    ];
    let data = (0..rows)
        .map(|i| {
            vec![
                Cell::from(["North", "South"][i % 2]),
                Cell::from(["Acme", "Zenith", "Orbit"][i % 3]),
                Cell::from(["SS24", "FW24"][(i / 7) % 2]),
                Cell::from(["Women", "Men", "Kids"][i % 3]),
                Cell::from(format!("Collection {}", i % 4)),
                Cell::from(format!("Line {}", i % 40)),
                Cell::from(format!("Style {}", i % 45)),
                Cell::from(format!("Model {}", i % (rows * 2 / 5).max(1))),
                Cell::from(format!("SKU-{i:05}")),
                Cell::from(format!("Product {i}")),
                Cell::from(format!("400638{i:07}")),
                Cell::from(["red", "blue", "black"][i % 3]),
                Cell::from(["S", "M", "L", "XL"][i % 4]),
                Cell::from(19.99 + (i % 10) as f64),
                Cell::from(format!("{}kg", 1 + i % 5)),
            ]
        })
        .collect();
    (headers(&names), data)
}
