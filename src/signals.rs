use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Pixel footprint of the overlay panel as last recorded by the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelSize {
    pub width: i32,
    pub height: i32,
}

impl PanelSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Width in the high 32 bits, height in the low 32 bits.
    pub fn pack(self) -> u64 {
        ((self.width as u32 as u64) << 32) | self.height as u32 as u64
    }

    pub fn unpack(packed: u64) -> Self {
        Self {
            width: (packed >> 32) as u32 as i32,
            height: (packed & 0xFFFF_FFFF) as u32 as i32,
        }
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// State shared between the render thread and the host's control thread.
///
/// Everything here is a single atomic so the control side never takes a lock.
/// Request flags are raised with `Release` and consumed with an `AcqRel`
/// swap: a consumer that sees `true` also sees what the panel wrote before
/// raising it, and each raise is delivered to exactly one consumer.
/// Geometry is `Relaxed`; being a frame behind is fine for the host's sizing loop.
#[derive(Debug)]
pub struct SignalStore {
    ocr_requested: AtomicBool,
    permission_requested: AtomicBool,
    panel_width: AtomicI32,
    panel_height: AtomicI32,
    visible: AtomicBool,
    close_notice: AtomicBool,
    wants_capture: AtomicBool,
    live: AtomicBool,
}

impl Default for SignalStore {
    fn default() -> Self {
        Self {
            ocr_requested: AtomicBool::new(false),
            permission_requested: AtomicBool::new(false),
            panel_width: AtomicI32::new(0),
            panel_height: AtomicI32::new(0),
            visible: AtomicBool::new(true),
            close_notice: AtomicBool::new(false),
            wants_capture: AtomicBool::new(false),
            live: AtomicBool::new(false),
        }
    }
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_ocr(&self) {
        self.ocr_requested.store(true, Ordering::Release);
    }

    pub fn consume_ocr_request(&self) -> bool {
        self.ocr_requested.swap(false, Ordering::AcqRel)
    }

    pub fn request_permission(&self) {
        self.permission_requested.store(true, Ordering::Release);
    }

    pub fn consume_permission_request(&self) -> bool {
        self.permission_requested.swap(false, Ordering::AcqRel)
    }

    pub fn store_panel_size(&self, size: PanelSize) {
        self.panel_width.store(size.width, Ordering::Relaxed);
        self.panel_height.store(size.height, Ordering::Relaxed);
    }

    pub fn panel_size(&self) -> PanelSize {
        PanelSize {
            width: self.panel_width.load(Ordering::Relaxed),
            height: self.panel_height.load(Ordering::Relaxed),
        }
    }

    /// Packed panel size, or 0 while no bridge session is live.
    pub fn packed_panel_size(&self) -> u64 {
        if !self.is_live() {
            return 0;
        }
        self.panel_size().pack()
    }

    /// Showing the panel again discards a close notice the host never picked up.
    pub fn set_visible(&self, visible: bool) {
        if visible {
            self.close_notice.store(false, Ordering::Release);
        }
        self.visible.store(visible, Ordering::Release);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Called by the panel when its own close button hides it.
    pub(crate) fn notify_closed(&self) {
        self.visible.store(false, Ordering::Release);
        self.close_notice.store(true, Ordering::Release);
    }

    /// True once per close-button press.
    pub fn take_close_notice(&self) -> bool {
        self.close_notice.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn set_wants_capture(&self, wants: bool) {
        self.wants_capture.store(wants, Ordering::Release);
    }

    pub fn wants_capture(&self) -> bool {
        self.is_live() && self.wants_capture.load(Ordering::Acquire)
    }

    pub(crate) fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}
