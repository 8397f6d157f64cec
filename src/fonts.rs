//! Font selection for the overlay.
//!
//! Sources are tried in a fixed order (embedded blob, asset bundle, system
//! font files, egui's built-in font) and the first one that loads and parses
//! wins. A missing, empty or corrupt source is logged and skipped, never fatal.

use crate::config::BridgeConfig;
use anyhow::{anyhow, bail, Context, Result};
use eframe::egui;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PRIMARY_FONT: &str = "overlay-primary";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedFont {
    pub name: &'static str,
    pub bytes: &'static [u8],
}

#[cfg(feature = "embedded-font")]
pub const EMBEDDED_FONT: Option<EmbeddedFont> = Some(EmbeddedFont {
    name: "embedded",
    bytes: include_bytes!(env!("OVERLAY_EMBEDDED_FONT")),
});

#[cfg(not(feature = "embedded-font"))]
pub const EMBEDDED_FONT: Option<EmbeddedFont> = None;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontOrigin {
    Embedded(EmbeddedFont),
    Asset(String),
    System(PathBuf),
    Builtin,
}

impl fmt::Display for FontOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontOrigin::Embedded(font) => write!(f, "embedded:{}", font.name),
            FontOrigin::Asset(path) => write!(f, "asset:{path}"),
            FontOrigin::System(path) => write!(f, "system:{}", path.display()),
            FontOrigin::Builtin => write!(f, "builtin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontCandidate {
    pub origin: FontOrigin,
    pub size_px: f32,
}

/// Read access to the host application's bundled assets.
pub trait AssetSource: Send + Sync {
    fn read(&self, path: &str) -> Result<Vec<u8>>;
}

/// Read access to font files installed on the device.
pub trait SystemFonts: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsSystemFonts;

impl SystemFonts for FsSystemFonts {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

#[derive(Clone)]
pub struct FontSources {
    pub assets: Option<Arc<dyn AssetSource>>,
    pub system: Arc<dyn SystemFonts>,
}

impl Default for FontSources {
    fn default() -> Self {
        Self {
            assets: None,
            system: Arc::new(FsSystemFonts),
        }
    }
}

/// Ordered font candidates for one session. Iterating is lazy, so nothing
/// past the first successful source is ever touched.
#[derive(Debug, Clone)]
pub struct FontChain {
    size_px: f32,
    origins: Vec<FontOrigin>,
}

impl FontChain {
    pub fn new(size_px: f32, origins: Vec<FontOrigin>) -> Self {
        Self { size_px, origins }
    }

    /// The standard chain. Asset candidates are only listed when an asset
    /// source is attached.
    pub fn standard(
        config: &BridgeConfig,
        density: f32,
        embedded: Option<EmbeddedFont>,
        has_assets: bool,
    ) -> Self {
        let mut origins = Vec::new();
        if let Some(font) = embedded {
            origins.push(FontOrigin::Embedded(font));
        }
        if has_assets {
            origins.extend(config.asset_fonts.iter().cloned().map(FontOrigin::Asset));
        }
        origins.extend(config.system_fonts.iter().cloned().map(FontOrigin::System));
        Self::new(config.base_font_px * density, origins)
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    /// Candidates in priority order, always ending with the built-in font.
    pub fn iter(&self) -> impl Iterator<Item = FontCandidate> + '_ {
        self.origins
            .iter()
            .filter(|origin| !matches!(origin, FontOrigin::Builtin))
            .cloned()
            .chain(std::iter::once(FontOrigin::Builtin))
            .map(move |origin| FontCandidate {
                origin,
                size_px: self.size_px,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontBytes {
    /// Compiled into the binary; never freed.
    Static(&'static [u8]),
    /// Copied out of an asset or file; owned by the font atlas once installed.
    Owned(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFont {
    pub origin: FontOrigin,
    pub size_px: f32,
    data: Option<FontBytes>,
}

impl ResolvedFont {
    pub fn builtin(size_px: f32) -> Self {
        Self {
            origin: FontOrigin::Builtin,
            size_px,
            data: None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.data.is_none()
    }

    pub fn data(&self) -> Option<&FontBytes> {
        self.data.as_ref()
    }

    /// Hands the font to egui ahead of the built-in families, which stay
    /// behind it for any glyphs it lacks.
    pub fn install(self, ctx: &egui::Context) {
        let mut definitions = egui::FontDefinitions::default();
        if let Some(data) = self.data {
            let font = match data {
                FontBytes::Static(bytes) => egui::FontData::from_static(bytes),
                FontBytes::Owned(bytes) => egui::FontData::from_owned(bytes),
            };
            definitions
                .font_data
                .insert(PRIMARY_FONT.to_owned(), font);
            for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                definitions
                    .families
                    .entry(family)
                    .or_default()
                    .insert(0, PRIMARY_FONT.to_owned());
            }
        }
        ctx.set_fonts(definitions);
    }
}

/// Walks the chain and returns the first font that loads. Always succeeds.
pub fn resolve(chain: &FontChain, sources: &FontSources) -> ResolvedFont {
    for candidate in chain.iter() {
        if candidate.origin == FontOrigin::Builtin {
            break;
        }
        match load_candidate(&candidate, sources) {
            Ok(data) => {
                tracing::info!(
                    source = %candidate.origin,
                    size_px = candidate.size_px,
                    "font source selected"
                );
                return ResolvedFont {
                    origin: candidate.origin,
                    size_px: candidate.size_px,
                    data: Some(data),
                };
            }
            Err(err) => {
                tracing::debug!(source = %candidate.origin, error = %format!("{err:#}"), "font source unavailable");
            }
        }
    }
    tracing::info!(
        size_px = chain.size_px(),
        "falling back to built-in font, extended glyphs may not render"
    );
    ResolvedFont::builtin(chain.size_px())
}

fn load_candidate(candidate: &FontCandidate, sources: &FontSources) -> Result<FontBytes> {
    let data = match &candidate.origin {
        FontOrigin::Embedded(font) => FontBytes::Static(font.bytes),
        FontOrigin::Asset(path) => {
            let assets = sources
                .assets
                .as_ref()
                .ok_or_else(|| anyhow!("no asset source attached"))?;
            FontBytes::Owned(assets.read(path)?)
        }
        FontOrigin::System(path) => FontBytes::Owned(sources.system.read(path)?),
        FontOrigin::Builtin => bail!("built-in font has no data"),
    };
    let bytes = match &data {
        FontBytes::Static(bytes) => *bytes,
        FontBytes::Owned(bytes) => bytes.as_slice(),
    };
    validate_font(bytes)?;
    Ok(data)
}

fn validate_font(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        bail!("font data is empty");
    }
    ab_glyph::FontRef::try_from_slice_and_index(bytes, 0)
        .map_err(|err| anyhow!("font data is unreadable: {err}"))?;
    Ok(())
}

/// Copies a borrowed buffer (for example a mapped asset) into owned memory,
/// reporting allocation failure instead of aborting.
pub fn copy_font_buffer(src: &[u8]) -> Result<Vec<u8>> {
    if src.is_empty() {
        bail!("font buffer is empty");
    }
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(src.len())
        .context("out of memory copying font buffer")?;
    owned.extend_from_slice(src);
    Ok(owned)
}
