use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tunables for a bridge session. Every field has a default; hosts only
/// override what they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Glyph size before density scaling.
    pub base_font_px: f32,
    /// Candidates looked up through the host's asset bundle, in order.
    pub asset_fonts: Vec<String>,
    /// Candidates read from the device file system, in order.
    pub system_fonts: Vec<PathBuf>,
    pub panel_title: String,
    /// Size applied the first time the panel appears, in physical pixels.
    pub panel_default_size: (f32, f32),
    pub default_opacity: f32,
    pub min_opacity: f32,
    pub max_opacity: f32,
    pub resize_log_interval_ms: u64,
    /// Frame delta used when the measured one is not positive.
    pub fallback_frame_dt: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_font_px: 20.0,
            asset_fonts: vec![
                "fonts/cjk.ttf".into(),
                "fonts/chinese.ttf".into(),
                "fonts/NotoSansSC-Regular.ttf".into(),
                "fonts/NotoSansCJK-Regular.ttc".into(),
            ],
            system_fonts: vec![
                PathBuf::from("/system/fonts/DroidSansFallback.ttf"),
                PathBuf::from("/system/fonts/NotoSansCJK-Regular.ttc"),
                PathBuf::from("/system/fonts/NotoSansCJK.ttc"),
            ],
            panel_title: "Jungle Helper".into(),
            panel_default_size: (575.0, 450.0),
            default_opacity: 0.95,
            min_opacity: 0.3,
            max_opacity: 1.0,
            resize_log_interval_ms: 1000,
            fallback_frame_dt: 1.0 / 60.0,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid bridge config")
    }

    pub fn clamp_opacity(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_opacity;
        }
        value.clamp(self.min_opacity, self.max_opacity)
    }
}
