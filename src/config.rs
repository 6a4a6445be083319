//! Viewer configuration, optionally loaded from a JSON file next to the
//! working directory. Every field has a default matching the stock viewer,
//! so an absent file means a fully usable setup.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub model_path: Option<PathBuf>,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    /// Linear RGB clear color.
    pub background: [f32; 3],
    pub camera_position: [f32; 3],
    /// Camera translation per frame per held movement key.
    pub move_speed: f32,
    /// Radians of look rotation per pixel of mouse drag.
    pub rotate_sensitivity: f32,
    /// Camera translation per wheel notch.
    pub dolly_step: f32,
    /// Uniform scale applied to the model when the load resolves.
    pub model_scale: f32,
    pub model_offset: [f32; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            window_title: "Fanviz".to_string(),
            window_width: 1280,
            window_height: 720,
            fov_y_deg: 60.0,
            near_clip: 0.1,
            far_clip: 1000.0,
            background: [0.133, 0.133, 0.133],
            camera_position: [0.0, 3.0, 15.0],
            move_speed: 0.1,
            rotate_sensitivity: 0.005,
            dolly_step: 0.5,
            model_scale: 3.0,
            model_offset: [0.0, 0.0, 0.0],
        }
    }
}

impl ViewerConfig {
    /// Defaults when the file does not exist; an unreadable or malformed
    /// file is an error rather than a silent fallback.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
