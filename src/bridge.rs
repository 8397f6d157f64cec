use crate::config::BridgeConfig;
use crate::fonts::{self, AssetSource, FontChain, FontSources, EMBEDDED_FONT};
use crate::input::TouchEvent;
use crate::panel::{FrameInfo, PanelController, PanelFrame};
use crate::render::{FrameRenderer, RecordingRenderer, RendererFactory};
use crate::signals::{PanelSize, SignalStore};
use crate::theme;
use anyhow::{Context, Result};
use eframe::egui;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    Initialized,
    ShuttingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    AlreadyInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    pub width_px: i32,
    pub height_px: i32,
    pub density: f32,
}

impl DisplayMetrics {
    /// Density used as egui's pixels-per-point; never zero or negative.
    pub fn pixels_per_point(&self) -> f32 {
        if self.density.is_finite() && self.density > 0.0 {
            self.density
        } else {
            1.0
        }
    }

    pub fn size_px(&self) -> [u32; 2] {
        [self.width_px.max(0) as u32, self.height_px.max(0) as u32]
    }

    fn screen_rect(&self) -> egui::Rect {
        let ppp = self.pixels_per_point();
        egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(self.width_px.max(0) as f32 / ppp, self.height_px.max(0) as f32 / ppp),
        )
    }
}

/// Produces per-frame deltas from a monotonic clock.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    fallback_dt: f32,
}

impl FrameClock {
    pub fn new(now: Instant, fallback_dt: f32) -> Self {
        Self {
            last: now,
            fallback_dt,
        }
    }

    /// Seconds since the previous tick, or the fallback when that is not positive.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        if dt > 0.0 {
            dt
        } else {
            self.fallback_dt
        }
    }
}

/// Lets a log line through at most once per interval.
#[derive(Debug, Clone)]
pub struct LogThrottle {
    interval: Duration,
    last: Instant,
}

impl LogThrottle {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Everything acquired by `init` and released by `shutdown`.
struct Session {
    ctx: egui::Context,
    metrics: DisplayMetrics,
    clock: FrameClock,
    started: Instant,
    resize_log: LogThrottle,
    renderer: Box<dyn FrameRenderer>,
    panel: PanelController,
    pending_events: Vec<egui::Event>,
    /// Texture uploads from frames that were laid out but never painted.
    pending_textures: egui::TexturesDelta,
}

impl Session {
    fn run_frame(
        &mut self,
        now: Instant,
        delta_time: f32,
        events: Vec<egui::Event>,
    ) -> (egui::FullOutput, Option<PanelFrame>) {
        let ppp = self.metrics.pixels_per_point();
        let mut raw_input = egui::RawInput {
            screen_rect: Some(self.metrics.screen_rect()),
            time: Some(now.saturating_duration_since(self.started).as_secs_f64()),
            predicted_dt: delta_time,
            events,
            ..Default::default()
        };
        raw_input
            .viewports
            .entry(egui::ViewportId::ROOT)
            .or_default()
            .native_pixels_per_point = Some(ppp);

        let frame = FrameInfo {
            delta_time,
            pixels_per_point: ppp,
            display_px: (self.metrics.width_px, self.metrics.height_px),
        };
        let panel = &mut self.panel;
        let mut panel_frame = None;
        let output = self.ctx.run(raw_input, |ctx| {
            panel_frame = panel.render(ctx, &frame);
        });
        (output, panel_frame)
    }
}

/// Owns the egui context and drives it from the host's render thread.
///
/// `init`, `resize`, `render`, `dispatch_touch` and `shutdown` must be called
/// from one thread in sequence. Anything the host's control thread needs is
/// reached through [`Bridge::signals`] instead.
pub struct Bridge {
    state: BridgeState,
    config: BridgeConfig,
    signals: Arc<SignalStore>,
    fonts: FontSources,
    renderer_factory: RendererFactory,
    session: Option<Session>,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default(), Arc::new(SignalStore::new()))
    }
}

impl Bridge {
    /// A bridge that renders into a [`RecordingRenderer`] until a real
    /// factory is supplied.
    pub fn new(config: BridgeConfig, signals: Arc<SignalStore>) -> Self {
        Self {
            state: BridgeState::Uninitialized,
            config,
            signals,
            fonts: FontSources::default(),
            renderer_factory: RecordingRenderer::factory(Default::default()),
            session: None,
        }
    }

    pub fn with_renderer_factory(mut self, factory: RendererFactory) -> Self {
        self.renderer_factory = factory;
        self
    }

    pub fn with_font_sources(mut self, fonts: FontSources) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn set_renderer_factory(&mut self, factory: RendererFactory) {
        self.renderer_factory = factory;
    }

    /// Attaches or clears the host's asset bundle used for font lookup.
    pub fn set_asset_source(&mut self, assets: Option<Arc<dyn AssetSource>>) {
        self.fonts.assets = assets;
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == BridgeState::Initialized
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handle for the host's control thread.
    pub fn signals(&self) -> Arc<SignalStore> {
        Arc::clone(&self.signals)
    }

    pub fn display_metrics(&self) -> Option<DisplayMetrics> {
        self.session.as_ref().map(|session| session.metrics)
    }

    pub fn panel(&self) -> Option<&PanelController> {
        self.session.as_ref().map(|session| &session.panel)
    }

    pub fn panel_mut(&mut self) -> Option<&mut PanelController> {
        self.session.as_mut().map(|session| &mut session.panel)
    }

    pub fn egui_context(&self) -> Option<&egui::Context> {
        self.session.as_ref().map(|session| &session.ctx)
    }

    pub fn init(&mut self, width: i32, height: i32, density: f32) -> Result<InitOutcome> {
        self.init_at(width, height, density, Instant::now())
    }

    pub(crate) fn init_at(
        &mut self,
        width: i32,
        height: i32,
        density: f32,
        now: Instant,
    ) -> Result<InitOutcome> {
        if self.state == BridgeState::Initialized {
            tracing::info!("bridge already initialized, skipping");
            return Ok(InitOutcome::AlreadyInitialized);
        }
        tracing::info!(width, height, density, "initializing bridge");

        let metrics = DisplayMetrics {
            width_px: width,
            height_px: height,
            density,
        };

        // egui keeps no on-disk state unless its persistence feature is on.
        let ctx = egui::Context::default();

        let chain = FontChain::standard(
            &self.config,
            metrics.pixels_per_point(),
            EMBEDDED_FONT,
            self.fonts.assets.is_some(),
        );
        fonts::resolve(&chain, &self.fonts).install(&ctx);
        theme::apply(&ctx, self.config.base_font_px);

        let renderer = (self.renderer_factory)().context("failed to create renderer")?;
        let panel = PanelController::new(&self.config, Arc::clone(&self.signals));

        let mut session = Session {
            ctx,
            metrics,
            clock: FrameClock::new(now, self.config.fallback_frame_dt),
            started: now,
            resize_log: LogThrottle::new(
                Duration::from_millis(self.config.resize_log_interval_ms),
                now,
            ),
            renderer,
            panel,
            pending_events: Vec::new(),
            pending_textures: egui::TexturesDelta::default(),
        };
        // egui keeps a new window invisible for its first frame, so lay the
        // panel out once here and let the host's first render draw it.
        let (output, _) = session.run_frame(now, self.config.fallback_frame_dt, Vec::new());
        session.pending_textures = output.textures_delta;
        session.panel.discard_frame();

        self.session = Some(session);
        self.state = BridgeState::Initialized;
        self.signals.set_live(true);
        tracing::info!("bridge initialized");
        Ok(InitOutcome::Initialized)
    }

    /// Tears down the panel, then the renderer, then the egui context.
    pub fn shutdown(&mut self) {
        if self.state != BridgeState::Initialized {
            return;
        }
        tracing::info!("shutting down bridge");
        self.state = BridgeState::ShuttingDown;
        self.signals.set_live(false);

        if let Some(mut session) = self.session.take() {
            session.panel.shutdown();
            session.renderer.destroy();
            drop(session);
        }
        self.state = BridgeState::Uninitialized;
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.resize_at(width, height, Instant::now());
    }

    pub(crate) fn resize_at(&mut self, width: i32, height: i32, now: Instant) {
        let Some(session) = self.active_session() else {
            return;
        };
        session.metrics.width_px = width;
        session.metrics.height_px = height;
        if session.resize_log.ready(now) {
            tracing::info!(width, height, "display resized");
        }
    }

    pub fn render(&mut self) {
        self.render_at(Instant::now());
    }

    pub(crate) fn render_at(&mut self, now: Instant) {
        let signals = Arc::clone(&self.signals);
        let Some(session) = self.active_session() else {
            return;
        };

        let delta_time = session.clock.tick(now);
        let events = std::mem::take(&mut session.pending_events);
        let (full_output, panel_frame) = session.run_frame(now, delta_time, events);

        if let Some(panel_frame) = panel_frame {
            if panel_frame.permission_clicked {
                tracing::info!("permission requested from panel");
            }
            if panel_frame.ocr_clicked {
                tracing::info!("ocr selection requested from panel");
            }
            if panel_frame.closed {
                tracing::info!("panel closed by user");
            }
        }
        signals.set_wants_capture(
            session.ctx.wants_pointer_input() || session.ctx.is_pointer_over_area(),
        );

        let primitives = session
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let mut textures = std::mem::take(&mut session.pending_textures);
        textures.append(full_output.textures_delta);
        let size_px = session.metrics.size_px();
        session.renderer.clear(size_px, CLEAR_COLOR);
        session.renderer.paint(
            size_px,
            full_output.pixels_per_point,
            &primitives,
            &textures,
        );
    }

    /// Queues a host touch for the next frame. Unknown action codes are dropped.
    pub fn dispatch_touch(&mut self, action: i32, x: f32, y: f32, pointer_id: i32) {
        let Some(session) = self.active_session() else {
            return;
        };
        let Some(event) = TouchEvent::from_raw(action, x, y, pointer_id) else {
            return;
        };
        event.push_events(session.metrics.pixels_per_point(), &mut session.pending_events);
    }

    pub fn query_wants_capture(&self) -> bool {
        self.is_initialized() && self.signals.wants_capture()
    }

    /// Width in the high word, height in the low word; 0 when not initialized.
    pub fn query_panel_size(&self) -> u64 {
        if !self.is_initialized() {
            return 0;
        }
        self.signals.packed_panel_size()
    }

    pub fn panel_size(&self) -> PanelSize {
        PanelSize::unpack(self.query_panel_size())
    }

    pub fn consume_ocr_request(&self) -> bool {
        self.signals.consume_ocr_request()
    }

    pub fn consume_permission_request(&self) -> bool {
        self.signals.consume_permission_request()
    }

    pub fn set_visible(&self, visible: bool) {
        self.signals.set_visible(visible);
    }

    pub fn is_visible(&self) -> bool {
        self.signals.is_visible()
    }

    fn active_session(&mut self) -> Option<&mut Session> {
        if self.state != BridgeState::Initialized {
            return None;
        }
        self.session.as_mut()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderLog;
    use std::sync::Mutex;

    fn recording_bridge() -> (Bridge, Arc<Mutex<RenderLog>>) {
        let log = Arc::new(Mutex::new(RenderLog::default()));
        let bridge = Bridge::default().with_renderer_factory(RecordingRenderer::factory(log.clone()));
        (bridge, log)
    }

    #[test]
    fn state_follows_init_and_shutdown_with_duplicates_collapsed() {
        let (mut bridge, _log) = recording_bridge();
        let ops = ["init", "init", "shutdown", "shutdown", "init", "shutdown", "init"];
        for op in ops {
            match op {
                "init" => {
                    bridge.init(800, 600, 1.0).unwrap();
                    assert_eq!(bridge.state(), BridgeState::Initialized);
                }
                _ => {
                    bridge.shutdown();
                    assert_eq!(bridge.state(), BridgeState::Uninitialized);
                }
            }
        }
        assert!(bridge.is_initialized());
    }

    #[test]
    fn second_init_is_reported_and_keeps_the_first_metrics() {
        let (mut bridge, _log) = recording_bridge();
        assert_eq!(bridge.init(800, 600, 2.0).unwrap(), InitOutcome::Initialized);
        assert_eq!(
            bridge.init(100, 100, 1.0).unwrap(),
            InitOutcome::AlreadyInitialized
        );
        let metrics = bridge.display_metrics().unwrap();
        assert_eq!((metrics.width_px, metrics.height_px), (800, 600));
        assert_eq!(metrics.density, 2.0);
    }

    #[test]
    fn operations_are_neutral_before_init() {
        let (mut bridge, log) = recording_bridge();
        bridge.resize(10, 10);
        bridge.render();
        bridge.dispatch_touch(0, 1.0, 1.0, 0);
        bridge.shutdown();

        assert_eq!(bridge.state(), BridgeState::Uninitialized);
        assert!(!bridge.query_wants_capture());
        assert_eq!(bridge.query_panel_size(), 0);
        assert_eq!(bridge.display_metrics(), None);
        assert_eq!(log.lock().unwrap().frames, 0);
    }

    #[test]
    fn panel_size_is_zero_until_first_render() {
        let (mut bridge, _log) = recording_bridge();
        bridge.init(1080, 1920, 1.0).unwrap();
        assert_eq!(bridge.query_panel_size(), 0);

        bridge.render();
        assert_eq!(bridge.panel_size(), PanelSize::new(575, 450));
        assert_eq!(bridge.query_panel_size(), (575u64 << 32) | 450);
    }

    #[test]
    fn panel_footprint_is_the_default_size_in_pixels_at_any_density() {
        for density in [1.0, 2.0] {
            let (mut bridge, _log) = recording_bridge();
            bridge.init(1080, 2340, density).unwrap();
            for _ in 0..6 {
                bridge.render();
                assert_eq!(
                    bridge.panel_size(),
                    PanelSize::new(575, 450),
                    "density {density}"
                );
            }
        }
    }

    #[test]
    fn render_clears_to_transparent_and_paints_once() {
        let (mut bridge, log) = recording_bridge();
        bridge.init(1080, 1920, 2.0).unwrap();
        bridge.render();

        let log = log.lock().unwrap();
        assert_eq!(log.frames, 1);
        assert_eq!(log.clears, vec![[0.0, 0.0, 0.0, 0.0]]);
        assert_eq!(log.last_size_px, Some([1080, 1920]));
        assert_eq!(log.last_pixels_per_point, Some(2.0));
        assert!(log.primitives > 0);
        assert!(log.textures_uploaded > 0);
    }

    #[test]
    fn shutdown_destroys_renderer_and_clears_liveness() {
        let (mut bridge, log) = recording_bridge();
        bridge.init(800, 600, 1.0).unwrap();
        bridge.render();
        let signals = bridge.signals();
        assert!(signals.is_live());

        bridge.shutdown();

        assert!(log.lock().unwrap().destroyed);
        assert!(!signals.is_live());
        assert_eq!(signals.packed_panel_size(), 0);
        assert!(bridge.panel().is_none());
    }

    #[test]
    fn renderer_failure_leaves_bridge_uninitialized() {
        let mut bridge = Bridge::default()
            .with_renderer_factory(Box::new(|| -> Result<Box<dyn FrameRenderer>> {
                Err(anyhow::anyhow!("no GL context"))
            }));

        assert!(bridge.init(800, 600, 1.0).is_err());
        assert_eq!(bridge.state(), BridgeState::Uninitialized);
        assert!(!bridge.signals().is_live());

        bridge.set_renderer_factory(RecordingRenderer::factory(Default::default()));
        assert_eq!(bridge.init(800, 600, 1.0).unwrap(), InitOutcome::Initialized);
    }

    #[test]
    fn every_resize_updates_metrics_immediately() {
        let (mut bridge, _log) = recording_bridge();
        let start = Instant::now();
        bridge.init_at(800, 600, 1.0, start).unwrap();

        for step in 0..20u64 {
            let now = start + Duration::from_millis(step * 50);
            bridge.resize_at(800 + step as i32, 600, now);
            let metrics = bridge.display_metrics().unwrap();
            assert_eq!(metrics.width_px, 800 + step as i32);
        }
    }

    #[test]
    fn log_throttle_allows_one_line_per_interval() {
        let start = Instant::now();
        let mut throttle = LogThrottle::new(Duration::from_secs(1), start);
        let emitted = (1..=30u64)
            .map(|step| start + Duration::from_millis(step * 100))
            .filter(|now| throttle.ready(*now))
            .count();
        // 3 seconds of events at 10 Hz.
        assert_eq!(emitted, 3);
    }

    #[test]
    fn frame_clock_substitutes_fallback_for_non_positive_delta() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start, 1.0 / 60.0);
        assert_eq!(clock.tick(start), 1.0 / 60.0);
        let dt = clock.tick(start + Duration::from_millis(40));
        assert!((dt - 0.04).abs() < 1e-6);
        // Going backwards saturates to zero.
        assert_eq!(clock.tick(start), 1.0 / 60.0);
    }

    #[test]
    fn move_before_down_only_queues_a_position_update() {
        let (mut bridge, _log) = recording_bridge();
        bridge.init(800, 600, 2.0).unwrap();

        bridge.dispatch_touch(2, 100.0, 50.0, 0);
        bridge.dispatch_touch(9, 100.0, 50.0, 0);

        let pending = &bridge.session.as_ref().unwrap().pending_events;
        assert_eq!(pending, &vec![egui::Event::PointerMoved(egui::pos2(50.0, 25.0))]);
    }

    #[test]
    fn queued_touches_are_consumed_by_the_next_frame() {
        let (mut bridge, _log) = recording_bridge();
        bridge.init(800, 600, 1.0).unwrap();
        bridge.dispatch_touch(0, 20.0, 20.0, 0);
        bridge.dispatch_touch(1, 20.0, 20.0, 0);
        bridge.render();
        assert!(bridge.session.as_ref().unwrap().pending_events.is_empty());
    }

    #[test]
    fn pointer_over_panel_is_captured() {
        let (mut bridge, _log) = recording_bridge();
        bridge.init(1080, 1920, 1.0).unwrap();
        bridge.render();
        bridge.render();

        bridge.dispatch_touch(2, 40.0, 40.0, 0);
        bridge.render();
        assert!(bridge.query_wants_capture());

        bridge.dispatch_touch(2, 1000.0, 1800.0, 0);
        bridge.render();
        assert!(!bridge.query_wants_capture());
    }

    #[test]
    fn opacity_set_before_render_is_applied_exactly() {
        let (mut bridge, _log) = recording_bridge();
        bridge.init(1080, 1920, 1.0).unwrap();
        bridge.panel_mut().unwrap().set_opacity(0.3);
        bridge.render();
        assert_eq!(bridge.panel().unwrap().applied_alpha(), Some(0.3));
    }

    #[test]
    fn hidden_panel_keeps_rendering_the_surface() {
        let (mut bridge, log) = recording_bridge();
        bridge.init(1080, 1920, 1.0).unwrap();
        bridge.set_visible(false);
        bridge.render();

        assert!(!bridge.is_visible());
        assert_eq!(bridge.query_panel_size(), 0);
        assert_eq!(log.lock().unwrap().frames, 1);
    }
}
