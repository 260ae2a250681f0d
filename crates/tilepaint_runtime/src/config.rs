//! TOML configuration
//!
//! ```toml
//! [grid]
//! rows = 64
//! columns = 64
//! chunk_width = 30
//! chunk_height = 30
//! facing = "upwards"
//!
//! [reducer]
//! keep_separate_tags = false
//! ```
//!
//! Every field is optional and falls back to its default.

use crate::collision::ReducerOptions;
use crate::error::PaintError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tilepaint_core::{GridError, TileFacing, TileGrid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub rows: u32,
    pub columns: u32,
    pub chunk_width: u32,
    pub chunk_height: u32,
    pub cell_size: [f32; 3],
    pub facing: TileFacing,
    /// Destroy chunks once they become empty
    pub erase_empty_chunks: bool,
    pub snap_threshold: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            rows: 64,
            columns: 64,
            chunk_width: 30,
            chunk_height: 30,
            cell_size: [1.0; 3],
            facing: TileFacing::Sideways,
            erase_empty_chunks: true,
            snap_threshold: 0.001,
        }
    }
}

impl GridSettings {
    /// Create an empty grid with these settings
    pub fn build(&self) -> Result<TileGrid, GridError> {
        let mut grid = TileGrid::new(self.rows, self.columns, self.chunk_width, self.chunk_height)?;
        grid.cell_size = self.cell_size;
        grid.facing = self.facing;
        grid.hint_erase_empty_chunks = self.erase_empty_chunks;
        grid.snap_threshold = self.snap_threshold;
        Ok(grid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PainterSettings {
    /// Refresh keeps a tile's variation while its neighbourhood is unchanged
    pub preserve_variations_on_refresh: bool,
    /// Painting or erasing a tile refreshes its 8 neighbours
    pub refresh_surrounding: bool,
}

impl Default for PainterSettings {
    fn default() -> Self {
        Self {
            preserve_variations_on_refresh: true,
            refresh_surrounding: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilepaintConfig {
    pub grid: GridSettings,
    pub painter: PainterSettings,
    pub reducer: ReducerOptions,
}

impl TilepaintConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, PaintError> {
        let config: TilepaintConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PaintError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), PaintError> {
        let grid = &self.grid;
        if grid.rows == 0 || grid.columns == 0 || grid.chunk_width == 0 || grid.chunk_height == 0 {
            return Err(PaintError::Config(
                "grid dimensions and chunk size must be non-zero".to_string(),
            ));
        }
        if !(grid.snap_threshold >= 0.0) {
            return Err(PaintError::Config(format!(
                "snap_threshold must be non-negative, got {}",
                grid.snap_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TilepaintConfig::from_toml_str("").unwrap();
        assert_eq!(config, TilepaintConfig::default());
        assert!(config.reducer.solid_flag_generates_colliders);
        assert!(config.painter.refresh_surrounding);
    }

    #[test]
    fn test_partial_config() {
        let config = TilepaintConfig::from_toml_str(
            r#"
[grid]
rows = 10
columns = 12
facing = "upwards"
cell_size = [2.0, 2.0, 1.0]

[reducer]
keep_separate_tags = false
"#,
        )
        .unwrap();

        assert_eq!(config.grid.rows, 10);
        assert_eq!(config.grid.chunk_width, 30);
        assert_eq!(config.grid.facing, TileFacing::Upwards);
        assert!(!config.reducer.keep_separate_tags);
        assert!(config.reducer.keep_separate_layers);

        let grid = config.grid.build().unwrap();
        assert_eq!(grid.row_count(), 10);
        assert_eq!(grid.column_count(), 12);
        assert_eq!(grid.cell_size, [2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_invalid_config() {
        let err = TilepaintConfig::from_toml_str("[grid]\nrows = 0\n").unwrap_err();
        assert!(matches!(err, PaintError::Config(_)));

        let err = TilepaintConfig::from_toml_str("[grid]\nrows = \"many\"\n").unwrap_err();
        assert!(matches!(err, PaintError::Config(_)));

        let err = TilepaintConfig::from_toml_str("[grid]\nsnap_threshold = -1.0\n").unwrap_err();
        assert!(matches!(err, PaintError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tilepaint.toml");
        std::fs::write(&path, "[painter]\nrefresh_surrounding = false\n").unwrap();

        let config = TilepaintConfig::load(&path).unwrap();
        assert!(!config.painter.refresh_surrounding);
        assert!(config.painter.preserve_variations_on_refresh);

        let missing = TilepaintConfig::load(tmp.path().join("missing.toml"));
        assert!(matches!(missing, Err(PaintError::Io(_))));
    }
}
