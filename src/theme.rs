use eframe::egui;

pub const WINDOW_ROUNDING: f32 = 8.0;
pub const FRAME_ROUNDING: f32 = 4.0;
pub const WINDOW_PADDING: f32 = 12.0;

/// The overlay's fixed light style.
///
/// Sizes are in points; egui multiplies them by the display density, so the
/// style scales with the screen without touching every metric here.
pub fn overlay_style(base_font_px: f32) -> egui::Style {
    let mut style = egui::Style {
        visuals: egui::Visuals::light(),
        ..Default::default()
    };

    style.visuals.window_rounding = egui::Rounding::same(WINDOW_ROUNDING);
    let widgets = &mut style.visuals.widgets;
    for state in [
        &mut widgets.noninteractive,
        &mut widgets.inactive,
        &mut widgets.hovered,
        &mut widgets.active,
        &mut widgets.open,
    ] {
        state.rounding = egui::Rounding::same(FRAME_ROUNDING);
    }
    style.spacing.window_margin = egui::Margin::same(WINDOW_PADDING);

    use egui::{FontFamily, FontId, TextStyle};
    style.text_styles = [
        (TextStyle::Heading, FontId::new(base_font_px * 1.2, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(base_font_px, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(base_font_px, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(base_font_px, FontFamily::Monospace)),
        (TextStyle::Small, FontId::new(base_font_px * 0.75, FontFamily::Proportional)),
    ]
    .into();

    style
}

pub fn apply(ctx: &egui::Context, base_font_px: f32) {
    ctx.set_style(overlay_style(base_font_px));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_is_light_with_rounded_window() {
        let style = overlay_style(20.0);
        assert!(!style.visuals.dark_mode);
        assert_eq!(style.visuals.window_rounding, egui::Rounding::same(8.0));
        assert_eq!(
            style.visuals.widgets.inactive.rounding,
            egui::Rounding::same(4.0)
        );
        assert_eq!(style.spacing.window_margin, egui::Margin::same(12.0));
    }

    #[test]
    fn body_text_uses_base_font_size() {
        let style = overlay_style(20.0);
        assert_eq!(style.text_styles[&egui::TextStyle::Body].size, 20.0);
        assert_eq!(style.text_styles[&egui::TextStyle::Button].size, 20.0);
    }

    #[test]
    fn apply_updates_context_style() {
        let ctx = egui::Context::default();
        apply(&ctx, 18.0);
        assert!(!ctx.style().visuals.dark_mode);
        assert_eq!(ctx.style().text_styles[&egui::TextStyle::Body].size, 18.0);
    }
}
