//! Common test fixtures for heatmap tests.
//!
//! [`ResourceFixture`] lays out a temporary resources directory the same way
//! the service expects it on disk:
//!
//! ```text
//! <root>/maps/<name>.png
//! <root>/heatmaps/
//! <root>/precisemaps/
//! ```

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Light and dark tiles of the generated background maps.
pub const MAP_LIGHT: [u8; 4] = [200, 200, 200, 255];
pub const MAP_DARK: [u8; 4] = [60, 60, 60, 255];

/// Temporary resources directory, removed on drop.
pub struct ResourceFixture {
    dir: TempDir,
}

impl ResourceFixture {
    /// Create the directory layout with no maps.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for sub in ["maps", "heatmaps", "precisemaps"] {
            std::fs::create_dir_all(dir.path().join(sub)).expect("Failed to create resource dir");
        }
        Self { dir }
    }

    /// Add a checkerboard background map named `name`.
    pub fn with_map(self, name: &str, width: u32, height: u32) -> Self {
        write_checkerboard(&self.map_path(name), width, height);
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn map_path(&self, name: &str) -> PathBuf {
        self.dir.path().join("maps").join(format!("{}.png", name))
    }

    /// Path of a rendered output, e.g. `output_path("heatmaps", "dust2-kill-heatmap.png")`.
    pub fn output_path(&self, dir: &str, filename: &str) -> PathBuf {
        self.dir.path().join(dir).join(filename)
    }

    /// Files currently present in an output directory, sorted.
    pub fn list_outputs(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path().join(dir))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for ResourceFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a 32px checkerboard PNG.
pub fn write_checkerboard(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        if ((x / 32) + (y / 32)) % 2 == 0 {
            Rgba(MAP_LIGHT)
        } else {
            Rgba(MAP_DARK)
        }
    });
    img.save(path).expect("Failed to write background map");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = ResourceFixture::new().with_map("dust2", 64, 48);
        assert!(fixture.map_path("dust2").exists());
        assert!(fixture.root().join("heatmaps").is_dir());
        assert!(fixture.root().join("precisemaps").is_dir());
        assert!(fixture.list_outputs("heatmaps").is_empty());

        let img = image::open(fixture.map_path("dust2")).unwrap();
        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 48);
    }
}
