use std::path::Path;

use serde::{Deserialize, Serialize};
use svbrdf_core::constants::{ANISOTROPY, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, MAX_LIGHTS};
use svbrdf_core::{RenderModes, SvbrdfError};

use crate::args::Args;

/// Optional viewer settings read from a RON file. Missing fields keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub vsync: bool,
    /// Warn when a preset brings more lights than this.
    pub max_lights_hint: u32,
    /// Preset file in the data directory applied at startup.
    pub initial_preset: Option<String>,
    /// Modes to start in instead of the preset defaults. Invalid
    /// combinations are corrected on the first frame.
    pub initial_modes: Option<RenderModes>,
    pub anisotropy: u16,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_title: "SVBRDF".to_string(),
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            vsync: true,
            max_lights_hint: 64,
            initial_preset: None,
            initial_modes: None,
            anisotropy: ANISOTROPY,
        }
    }
}

impl ViewerConfig {
    pub fn from_ron(text: &str) -> Result<Self, SvbrdfError> {
        let options = ron::Options::default();
        let mut config: Self = options
            .from_str(text)
            .map_err(|e| SvbrdfError::Config(e.to_string()))?;
        config.sanitize();
        Ok(config)
    }

    /// Read `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, SvbrdfError> {
        if !path.exists() {
            log::warn!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| SvbrdfError::io(path, e))?;
        let config = Self::from_ron(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Command-line flags win over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if args.explicit_size || args.config.is_none() {
            self.window_width = args.width;
            self.window_height = args.height;
        }
    }

    fn sanitize(&mut self) {
        self.anisotropy = self.anisotropy.clamp(1, 16);
        self.max_lights_hint = self.max_lights_hint.clamp(1, MAX_LIGHTS);
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
    }
}
