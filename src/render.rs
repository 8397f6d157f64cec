use eframe::egui;
use std::sync::{Arc, Mutex};

/// Graphics backend that turns egui output into pixels on the host surface.
///
/// The host owns the graphics context and keeps it current on the render
/// thread; implementations only issue draw calls against it.
pub trait FrameRenderer: Send {
    fn clear(&mut self, size_px: [u32; 2], color: [f32; 4]);
    fn paint(
        &mut self,
        size_px: [u32; 2],
        pixels_per_point: f32,
        primitives: &[egui::ClippedPrimitive],
        textures: &egui::TexturesDelta,
    );
    fn destroy(&mut self);
}

pub type RendererFactory =
    Box<dyn FnMut() -> anyhow::Result<Box<dyn FrameRenderer>> + Send>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderLog {
    pub frames: usize,
    pub clears: Vec<[f32; 4]>,
    pub last_size_px: Option<[u32; 2]>,
    pub last_pixels_per_point: Option<f32>,
    pub primitives: usize,
    pub textures_uploaded: usize,
    pub destroyed: bool,
}

/// Keeps a tally of what would have been drawn. Used off-device and in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Arc<Mutex<RenderLog>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Arc<Mutex<RenderLog>> {
        Arc::clone(&self.log)
    }

    /// A factory handing out renderers that all write to `log`.
    pub fn factory(log: Arc<Mutex<RenderLog>>) -> RendererFactory {
        Box::new(move || {
            Ok(Box::new(RecordingRenderer {
                log: Arc::clone(&log),
            }) as Box<dyn FrameRenderer>)
        })
    }

    fn with_log(&self, f: impl FnOnce(&mut RenderLog)) {
        if let Ok(mut log) = self.log.lock() {
            f(&mut log);
        }
    }
}

impl FrameRenderer for RecordingRenderer {
    fn clear(&mut self, _size_px: [u32; 2], color: [f32; 4]) {
        self.with_log(|log| log.clears.push(color));
    }

    fn paint(
        &mut self,
        size_px: [u32; 2],
        pixels_per_point: f32,
        primitives: &[egui::ClippedPrimitive],
        textures: &egui::TexturesDelta,
    ) {
        self.with_log(|log| {
            log.frames += 1;
            log.last_size_px = Some(size_px);
            log.last_pixels_per_point = Some(pixels_per_point);
            log.primitives += primitives.len();
            log.textures_uploaded += textures.set.len();
        });
    }

    fn destroy(&mut self) {
        self.with_log(|log| log.destroyed = true);
    }
}

#[cfg(feature = "android")]
pub use self::glow_renderer::GlowRenderer;

#[cfg(feature = "android")]
mod glow_renderer {
    use super::FrameRenderer;
    use anyhow::{anyhow, Result};
    use eframe::{egui, egui_glow, glow};
    use std::sync::Arc;

    /// OpenGL ES 3 backend drawing into the host's current context.
    pub struct GlowRenderer {
        painter: egui_glow::Painter,
    }

    impl GlowRenderer {
        pub fn new(gl: Arc<glow::Context>) -> Result<Self> {
            let painter = egui_glow::Painter::new(
                gl,
                "",
                Some(egui_glow::ShaderVersion::Es300),
                false,
            )
            .map_err(|err| anyhow!("failed to create GL painter: {err:?}"))?;
            Ok(Self { painter })
        }
    }

    impl FrameRenderer for GlowRenderer {
        fn clear(&mut self, size_px: [u32; 2], color: [f32; 4]) {
            egui_glow::painter::clear(self.painter.gl(), size_px, color);
        }

        fn paint(
            &mut self,
            size_px: [u32; 2],
            pixels_per_point: f32,
            primitives: &[egui::ClippedPrimitive],
            textures: &egui::TexturesDelta,
        ) {
            self.painter
                .paint_and_update_textures(size_px, pixels_per_point, primitives, textures);
        }

        fn destroy(&mut self) {
            self.painter.destroy();
        }
    }
}
