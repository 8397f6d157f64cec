//! Host-side helpers for sizing the floating overlay window around the panel.

use crate::signals::PanelSize;
use std::time::Duration;

/// Bounds applied when wrapping the host window around the rendered panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPolicy {
    /// Minimum window size in density-independent units.
    pub min_dp: (f32, f32),
    pub padding_dp: f32,
    /// Largest share of the display the window may take in each dimension.
    pub max_fraction: f32,
}

impl Default for FitPolicy {
    fn default() -> Self {
        Self {
            min_dp: (200.0, 160.0),
            padding_dp: 16.0,
            max_fraction: 0.9,
        }
    }
}

impl FitPolicy {
    /// Window size for a panel footprint, or `None` before the panel has a size.
    pub fn target_size(
        &self,
        panel: PanelSize,
        display_px: (i32, i32),
        density: f32,
    ) -> Option<(i32, i32)> {
        if panel.is_empty() {
            return None;
        }
        let padding = (self.padding_dp * density) as i32;
        let min = (
            (self.min_dp.0 * density) as i32,
            (self.min_dp.1 * density) as i32,
        );
        let max = (
            (display_px.0 as f32 * self.max_fraction) as i32,
            (display_px.1 as f32 * self.max_fraction) as i32,
        );
        let width = (panel.width + padding).max(min.0).min(max.0);
        let height = (panel.height + padding).max(min.1).min(max.1);
        Some((width, height))
    }
}

const SLOW_POLL: Duration = Duration::from_millis(200);
const STABLE_WINDOW_MS: u64 = 500;
const MIN_STABLE_POLLS: u32 = 30;

/// Polling interval for the host's resize loop: fast while the panel is
/// changing size, slow once it has settled.
#[derive(Debug, Clone)]
pub struct PollCadence {
    fast: Duration,
    stable_threshold: u32,
    stable_polls: u32,
}

impl PollCadence {
    pub fn new(refresh_hz: f32) -> Self {
        let hz = if refresh_hz.is_finite() && refresh_hz >= 30.0 {
            refresh_hz
        } else {
            60.0
        };
        let fast_ms = ((1000.0 / hz) + 0.5) as u64;
        let fast_ms = fast_ms.clamp(7, 16);
        let stable_threshold = (STABLE_WINDOW_MS.div_ceil(fast_ms) as u32).max(MIN_STABLE_POLLS);
        Self {
            fast: Duration::from_millis(fast_ms),
            stable_threshold,
            stable_polls: 0,
        }
    }

    pub fn fast_interval(&self) -> Duration {
        self.fast
    }

    /// Records one poll and returns the delay before the next one. `boosted`
    /// forces the fast interval, e.g. while the user is dragging.
    pub fn next_delay(&mut self, changed: bool, boosted: bool) -> Duration {
        if changed {
            self.stable_polls = 0;
        } else {
            self.stable_polls = self.stable_polls.saturating_add(1);
        }
        if boosted || changed || self.stable_polls < self.stable_threshold {
            self.fast
        } else {
            SLOW_POLL
        }
    }

    /// Restarts the stability count, e.g. when the panel has no size yet.
    pub fn reset(&mut self) {
        self.stable_polls = 0;
    }
}
