//! Render and application settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which passes and overlays are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Lit filled triangles
    pub fill: bool,
    /// Unique edges as lines
    pub wireframe: bool,
    /// Round point per vertex
    pub vertices: bool,
    /// Normal segment per vertex
    pub normals: bool,
    /// Box around the selected mesh
    pub local_bbox: bool,
    /// Box around the whole scene
    pub global_bbox: bool,
    /// One normal per face instead of averaged vertex normals
    pub flat_shading: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            fill: true,
            wireframe: false,
            vertices: false,
            normals: false,
            local_bbox: true,
            global_bbox: false,
            flat_shading: false,
        }
    }
}

/// Colors and sizes of the overlay passes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub wireframe_color: [f32; 4],
    pub point_color: [f32; 4],
    /// Point sprite diameter in pixels
    pub point_size: f32,
    pub normal_color: [f32; 4],
    /// Normal length as a fraction of the mesh's bounding box diagonal
    pub normal_percent: f32,
    pub local_bbox_color: [f32; 4],
    pub global_bbox_color: [f32; 4],
    /// Clip-space depth pulled toward the camera when wireframe is drawn over fill
    pub wireframe_depth_bias: f32,
    pub line_width: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            wireframe_color: [0.05, 0.05, 0.05, 1.0],
            point_color: [1.0, 0.25, 0.2, 1.0],
            point_size: 6.0,
            normal_color: [0.2, 0.5, 1.0, 1.0],
            normal_percent: 0.05,
            local_bbox_color: [1.0, 0.85, 0.0, 1.0],
            global_bbox_color: [0.0, 0.85, 1.0, 1.0],
            wireframe_depth_bias: 0.0005,
            line_width: 1.0,
        }
    }
}

/// Single directional light plus ambient term
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    /// Direction toward the light, world space
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub ambient: [f32; 3],
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            direction: [0.0, 0.0, 1.0],
            color: [0.8, 0.8, 0.8],
            ambient: [0.25, 0.25, 0.25],
        }
    }
}

/// Everything the viewer remembers between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Background color RGBA
    pub background: [f32; 4],
    pub features: FeatureFlags,
    pub style: OverlayStyle,
    pub light: LightSettings,
    pub depth_test: bool,
    pub culling: bool,
    pub antialiasing: bool,
    /// Global rotation speed, degrees per 100 px of drag
    pub rotation_sensitivity: f32,
    /// Mouse-look speed, degrees per pixel
    pub look_sensitivity: f32,
    /// Camera speed, world units per second
    pub move_speed: f32,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            background: [0.12, 0.12, 0.14, 1.0],
            features: FeatureFlags::default(),
            style: OverlayStyle::default(),
            light: LightSettings::default(),
            depth_test: true,
            culling: false,
            antialiasing: false,
            rotation_sensitivity: 90.0,
            look_sensitivity: 0.2,
            move_speed: 2.0,
        }
    }
}

impl ViewerSettings {
    /// `settings.json` in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "meshview", "meshview")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return default if not found
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring malformed settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save settings to file
    pub fn save(&self) {
        if let Some(path) = Self::default_path() {
            if let Err(e) = self.save_to(&path) {
                tracing::warn!("failed to save settings to {}: {e}", path.display());
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ViewerSettings::default();
        assert_eq!(s.style.normal_percent, 0.05);
        assert_eq!(s.light.direction, [0.0, 0.0, 1.0]);
        assert!(s.features.fill);
        assert!(!s.antialiasing);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: ViewerSettings = serde_json::from_str(r#"{"antialiasing":true,"features":{"wireframe":true}}"#).unwrap();
        assert!(s.antialiasing);
        assert!(s.features.wireframe);
        assert!(s.features.fill);
        assert_eq!(s.style, OverlayStyle::default());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("meshview-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        let mut s = ViewerSettings::default();
        s.culling = true;
        s.background = [1.0, 0.0, 0.0, 1.0];
        s.save_to(&path).unwrap();
        assert_eq!(ViewerSettings::load_from(&path), s);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = std::env::temp_dir().join(format!("meshview-bad-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(ViewerSettings::load_from(&path), ViewerSettings::default());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
