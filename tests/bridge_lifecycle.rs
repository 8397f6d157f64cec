use overlay_bridge::{BridgeState, InitOutcome, PanelSize};

use harness::Harness;

#[test]
fn init_render_shutdown_round_trip() {
    let mut h = Harness::new();
    assert_eq!(h.bridge.init(1080, 2340, 2.75).unwrap(), InitOutcome::Initialized);
    assert_eq!(h.bridge.query_panel_size(), 0);

    h.bridge.render();
    assert_eq!(
        PanelSize::unpack(h.bridge.query_panel_size()),
        PanelSize::new(575, 450)
    );
    h.bridge.render();
    assert_eq!(h.frames(), 2);
    assert!(h.log.lock().unwrap().primitives > 0);

    h.bridge.shutdown();
    assert_eq!(h.bridge.state(), BridgeState::Uninitialized);
    assert_eq!(h.bridge.query_panel_size(), 0);
    assert!(h.log.lock().unwrap().destroyed);
}

#[test]
fn double_shutdown_and_double_init_are_no_ops() {
    let mut h = Harness::new();
    h.bridge.shutdown();
    h.bridge.shutdown();
    assert_eq!(h.bridge.state(), BridgeState::Uninitialized);

    h.bridge.init(640, 480, 1.0).unwrap();
    assert_eq!(
        h.bridge.init(640, 480, 1.0).unwrap(),
        InitOutcome::AlreadyInitialized
    );
    h.bridge.render();
    assert_eq!(h.frames(), 1);
}

#[test]
fn reinit_after_shutdown_starts_a_fresh_session() {
    let mut h = Harness::new();
    h.bridge.init(1080, 1920, 1.0).unwrap();
    h.bridge.render();
    assert_ne!(h.bridge.query_panel_size(), 0);
    h.bridge.shutdown();

    h.bridge.init(720, 1280, 1.0).unwrap();
    assert_eq!(h.bridge.query_panel_size(), 0);
    let metrics = h.bridge.display_metrics().unwrap();
    assert_eq!((metrics.width_px, metrics.height_px), (720, 1280));
}

#[test]
fn resize_is_reflected_in_the_next_frame() {
    let mut h = Harness::new();
    h.bridge.init(1080, 1920, 1.0).unwrap();
    for width in [900, 901, 902, 903] {
        h.bridge.resize(width, 1600);
    }
    assert_eq!(h.bridge.display_metrics().unwrap().width_px, 903);

    h.bridge.render();
    assert_eq!(h.log.lock().unwrap().last_size_px, Some([903, 1600]));
}

#[test]
fn unknown_touch_codes_do_not_disturb_rendering() {
    let mut h = Harness::new();
    h.bridge.init(1080, 1920, 1.0).unwrap();
    for code in [3, 4, 7, 42] {
        h.bridge.dispatch_touch(code, 10.0, 10.0, 0);
    }
    h.bridge.render();
    assert_eq!(h.frames(), 1);
}

#[test]
fn first_frame_footprint_matches_default_size_at_high_density() {
    let mut h = Harness::new();
    h.bridge.init(1440, 3120, 2.0).unwrap();
    h.bridge.render();
    assert_eq!(h.bridge.panel_size(), PanelSize::new(575, 450));
}

#[test]
fn close_button_hides_panel_until_host_reopens_it() {
    let mut h = Harness::new();
    h.bridge.init(1080, 1920, 1.0).unwrap();
    for _ in 0..5 {
        h.bridge.render();
    }
    let size = h.bridge.panel_size();
    assert_eq!(size, PanelSize::new(575, 450));

    // The close button sits at the right end of the title bar.
    let (x, y) = (size.width as f32 - 29.0, 20.0);
    h.bridge.dispatch_touch(0, x, y, 0);
    h.bridge.dispatch_touch(1, x, y, 0);
    h.bridge.render();

    assert!(!h.bridge.is_visible());
    assert!(h.signals.take_close_notice());
    assert!(!h.signals.take_close_notice());

    h.bridge.render();
    h.bridge.render();
    assert!(!h.bridge.is_visible());
    assert!(!h.signals.take_close_notice());

    h.bridge.set_visible(true);
    h.bridge.render();
    assert!(h.bridge.is_visible());
    assert!(!h.signals.take_close_notice());
    assert_ne!(h.bridge.query_panel_size(), 0);
}

#[test]
fn host_hiding_the_panel_raises_no_close_notice() {
    let mut h = Harness::new();
    h.bridge.init(1080, 1920, 1.0).unwrap();
    h.bridge.render();

    h.bridge.set_visible(false);
    h.bridge.render();
    assert!(!h.bridge.is_visible());
    assert!(!h.signals.take_close_notice());
}
