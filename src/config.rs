use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::canvas::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::components::colors::DEFAULT_PALETTE;
use crate::components::tools::DEFAULT_BRUSH_SIZES;
use crate::error::{PaintError, PaintResult};

/// Everything a [`crate::session::PaintSession`] is built from. Supplied once.
///
/// Stored as TOML; every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Canvas size when no template is configured.
    pub width: u32,
    pub height: u32,
    /// Coloring-page template; its dimensions override `width`/`height`.
    pub template: Option<PathBuf>,
    /// Area lock on/off. Unset means "on when a template is present".
    pub use_lock_area: Option<bool>,
    pub palette: Vec<[u8; 4]>,
    pub brush_sizes: Vec<u32>,
    /// Sticker images, in palette order.
    pub stickers: Vec<PathBuf>,
    /// Key the canvas is saved under.
    pub save_key: String,
    /// Directory for saved canvases. Unset uses the platform data directory.
    pub store_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            template: None,
            use_lock_area: None,
            palette: DEFAULT_PALETTE.to_vec(),
            brush_sizes: DEFAULT_BRUSH_SIZES.to_vec(),
            stickers: Vec::new(),
            save_key: "0".to_string(),
            store_dir: None,
        }
    }
}

impl SessionConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> PaintResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        config.validate()?;
        // Relative asset paths are resolved against the config file's directory.
        let base = path.parent().unwrap_or(Path::new("."));
        Ok(config.resolve_paths(base))
    }

    pub fn validate(&self) -> PaintResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PaintError::Dimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.brush_sizes.iter().all(|&s| s == 0) {
            return Err(PaintError::InvalidConfig(
                "brush_sizes must contain a non-zero size".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether area locking applies, given whether a template was loaded.
    pub fn lock_area_enabled(&self, has_template: bool) -> bool {
        self.use_lock_area.unwrap_or(has_template)
    }

    fn resolve_paths(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.template = self.template.map(join);
        self.stickers = self.stickers.into_iter().map(join).collect();
        self.store_dir = self.store_dir.map(join);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!((config.width, config.height), (576, 1024));
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config: SessionConfig = toml::from_str(
            r#"
            width = 100
            height = 50
            use_lock_area = true
            palette = [[1, 2, 3, 255]]
            save_key = "page-7"
            "#,
        )
        .unwrap();
        assert_eq!((config.width, config.height), (100, 50));
        assert_eq!(config.palette, vec![[1, 2, 3, 255]]);
        assert_eq!(config.brush_sizes, vec![8, 16, 24]);
        assert!(config.lock_area_enabled(false));
        assert_eq!(config.save_key, "page-7");
    }

    #[test]
    fn lock_defaults_to_template_presence() {
        let config = SessionConfig::default();
        assert!(config.lock_area_enabled(true));
        assert!(!config.lock_area_enabled(false));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = SessionConfig {
            width: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            brush_sizes: vec![0],
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.toml");
        fs::write(&path, "template = \"pages/cat.png\"\nstickers = [\"star.png\"]\n").unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.template, Some(dir.path().join("pages/cat.png")));
        assert_eq!(config.stickers, vec![dir.path().join("star.png")]);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, SessionConfig::default());
    }
}
