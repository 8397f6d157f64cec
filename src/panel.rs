use crate::config::BridgeConfig;
use crate::signals::{PanelSize, SignalStore};
use eframe::egui;
use std::sync::Arc;

/// Shown frames allowed for the window to settle on its default size.
const SIZING_FRAMES: u8 = 4;

fn to_footprint(px: egui::Vec2) -> PanelSize {
    PanelSize::new((px.x + 0.5) as i32, (px.y + 0.5) as i32)
}

/// What the panel needs to know about the frame being built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub delta_time: f32,
    pub pixels_per_point: f32,
    pub display_px: (i32, i32),
}

/// Outcome of one panel frame, reported back to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanelFrame {
    pub size: PanelSize,
    pub background_alpha: f32,
    pub permission_clicked: bool,
    pub ocr_clicked: bool,
    pub closed: bool,
}

/// The single overlay window: opacity control, size readouts and the two
/// request buttons.
pub struct PanelController {
    signals: Arc<SignalStore>,
    title: String,
    default_size_px: egui::Vec2,
    opacity: f32,
    min_opacity: f32,
    max_opacity: f32,
    applied_alpha: Option<f32>,
    /// Window frame and title bar size, measured once the window is shown.
    decoration_pt: Option<egui::Vec2>,
    sizing_frames_left: u8,
    #[cfg(test)]
    button_rects: Option<(egui::Rect, egui::Rect)>,
}

impl PanelController {
    /// Shows the panel and forgets any previously recorded footprint.
    pub fn new(config: &BridgeConfig, signals: Arc<SignalStore>) -> Self {
        signals.set_visible(true);
        signals.store_panel_size(PanelSize::default());
        Self {
            signals,
            title: config.panel_title.clone(),
            default_size_px: egui::vec2(config.panel_default_size.0, config.panel_default_size.1),
            opacity: config.clamp_opacity(config.default_opacity),
            min_opacity: config.min_opacity,
            max_opacity: config.max_opacity,
            applied_alpha: None,
            decoration_pt: None,
            sizing_frames_left: SIZING_FRAMES,
            #[cfg(test)]
            button_rects: None,
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Takes effect on the next rendered frame.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            self.max_opacity
        } else {
            opacity.clamp(self.min_opacity, self.max_opacity)
        };
    }

    /// Background alpha used by the most recent rendered frame.
    pub fn applied_alpha(&self) -> Option<f32> {
        self.applied_alpha
    }

    pub fn is_visible(&self) -> bool {
        self.signals.is_visible()
    }

    pub fn set_visible(&self, visible: bool) {
        self.signals.set_visible(visible);
    }

    /// Draws the panel if it is visible. Must be called between the start and
    /// end of an egui frame.
    ///
    /// On first appearance the window is pinned until its outer rect matches
    /// the configured default size in pixels; until then that default is what
    /// gets recorded as the footprint.
    pub fn render(&mut self, ctx: &egui::Context, frame: &FrameInfo) -> Option<PanelFrame> {
        if !self.signals.is_visible() {
            return None;
        }

        let ppp = frame.pixels_per_point.max(f32::EPSILON);
        let style = ctx.style();
        let alpha = self.opacity;
        let fill = style.visuals.window_fill;
        let fill = egui::Color32::from_rgba_unmultiplied(
            fill.r(),
            fill.g(),
            fill.b(),
            (alpha * 255.0).round() as u8,
        );
        let window_frame = egui::Frame::window(&style).fill(fill);

        let target_pt = self.default_size_px / ppp;
        let decoration = self.decoration_pt.unwrap_or_else(|| {
            style.spacing.window_margin.sum()
                + egui::vec2(0.0, style.spacing.interact_size.y + style.spacing.item_spacing.y)
        });
        let content_pt = (target_pt - decoration).max(egui::Vec2::splat(1.0));
        let sizing = self.sizing_frames_left > 0;

        let mut open = true;
        let mut permission_clicked = false;
        let mut ocr_clicked = false;
        let mut button_rects = None;
        let (min_opacity, max_opacity) = (self.min_opacity, self.max_opacity);
        let opacity = &mut self.opacity;
        let last_size = self.signals.panel_size();
        let window_text = format!("Window: {} x {} px", last_size.width, last_size.height);
        let surface_text = format!(
            "Surface: {} x {} px",
            frame.display_px.0, frame.display_px.1
        );

        let window = egui::Window::new(self.title.as_str())
            .id(egui::Id::new("overlay_panel"))
            .open(&mut open)
            .movable(false)
            .collapsible(true)
            .default_pos(egui::Pos2::ZERO)
            .default_size(content_pt)
            .frame(window_frame);
        let window = if sizing {
            window.fixed_size(content_pt)
        } else {
            window.resizable(true)
        };

        // The scroll area fills the content rect, so egui never shrinks the
        // window down to the widgets.
        let shown = window.show(ctx, |ui| {
            egui::ScrollArea::both()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.add(egui::Slider::new(opacity, min_opacity..=max_opacity).text("Opacity"));
                    ui.separator();
                    ui.label(window_text);
                    ui.label(surface_text);
                    ui.separator();
                    ui.horizontal(|ui| {
                        let permission = ui.button("Request permission");
                        let ocr = ui.button("OCR select");
                        permission_clicked = permission.clicked();
                        ocr_clicked = ocr.clicked();
                        button_rects = Some((permission.rect, ocr.rect));
                    });
                });
        });

        if permission_clicked {
            self.signals.request_permission();
        }
        if ocr_clicked {
            self.signals.request_ocr();
        }

        // egui lays a new window out invisibly first, so its rect can be empty.
        let measured = shown.as_ref().and_then(|inner| {
            let rect = inner.response.rect;
            (rect.width() >= 1.0 && rect.height() >= 1.0)
                .then_some((rect.size(), inner.inner.is_none()))
        });
        let default_footprint = to_footprint(self.default_size_px);
        // Recorded whether expanded or collapsed.
        let size = match measured {
            Some((outer, false)) if sizing => {
                self.sizing_frames_left -= 1;
                let error_px = (outer - target_pt) * ppp;
                if error_px.x.abs() <= 0.5 && error_px.y.abs() <= 0.5 {
                    self.sizing_frames_left = 0;
                } else {
                    self.decoration_pt = Some(outer - content_pt);
                }
                if self.sizing_frames_left == 0 {
                    to_footprint(outer * ppp)
                } else {
                    default_footprint
                }
            }
            Some((outer, _)) => to_footprint(outer * ppp),
            None if sizing => default_footprint,
            None => PanelSize::default(),
        };
        self.signals.store_panel_size(size);

        if !open {
            self.signals.notify_closed();
        }

        self.applied_alpha = Some(alpha);
        #[cfg(test)]
        {
            self.button_rects = button_rects;
        }
        #[cfg(not(test))]
        let _ = button_rects;

        Some(PanelFrame {
            size,
            background_alpha: alpha,
            permission_clicked,
            ocr_clicked,
            closed: !open,
        })
    }

    /// Forgets what a layout-only frame recorded, so nothing is observable
    /// until the host renders.
    pub fn discard_frame(&mut self) {
        self.applied_alpha = None;
        self.signals.store_panel_size(PanelSize::default());
    }

    pub fn shutdown(&mut self) {
        self.applied_alpha = None;
        self.signals.set_wants_capture(false);
    }
}
