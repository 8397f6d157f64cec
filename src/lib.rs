pub mod bridge;
pub mod config;
pub mod fonts;
pub mod input;
pub mod logging;
pub mod panel;
pub mod render;
pub mod signals;
pub mod theme;
pub mod window_fit;

#[cfg(all(target_os = "android", feature = "android"))]
mod android;

pub use bridge::{Bridge, BridgeState, DisplayMetrics, InitOutcome};
pub use config::BridgeConfig;
pub use signals::{PanelSize, SignalStore};
