//! JNI entry points for the Android host.
//!
//! Render-thread calls go through the process-wide [`Bridge`]; control-thread
//! calls touch only the shared [`SignalStore`] and never take the bridge lock.

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::fonts::{copy_font_buffer, AssetSource};
use crate::render::{FrameRenderer, GlowRenderer};
use crate::signals::SignalStore;
use anyhow::{anyhow, bail, Result};
use eframe::glow;
use once_cell::sync::Lazy;
use std::ffi::{c_char, c_int, c_void, CString};
use std::io::Write;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};

type JniEnv = *mut c_void;
type JObject = *mut c_void;
type JBoolean = u8;

const JNI_TRUE: JBoolean = 1;
const JNI_FALSE: JBoolean = 0;
const AASSET_MODE_BUFFER: c_int = 3;
const ANDROID_LOG_INFO: c_int = 4;
const LOG_TAG: &[u8] = b"OverlayBridge\0";

#[link(name = "android")]
extern "C" {
    fn AAssetManager_fromJava(env: JniEnv, asset_manager: JObject) -> *mut c_void;
    fn AAssetManager_open(mgr: *mut c_void, filename: *const c_char, mode: c_int) -> *mut c_void;
    fn AAsset_getBuffer(asset: *mut c_void) -> *const c_void;
    fn AAsset_getLength64(asset: *mut c_void) -> i64;
    fn AAsset_close(asset: *mut c_void);
}

#[link(name = "log")]
extern "C" {
    fn __android_log_write(prio: c_int, tag: *const c_char, text: *const c_char) -> c_int;
}

#[link(name = "EGL")]
extern "C" {
    fn eglGetProcAddress(procname: *const c_char) -> *const c_void;
}

static SIGNALS: Lazy<Arc<SignalStore>> = Lazy::new(|| Arc::new(SignalStore::new()));

static BRIDGE: Lazy<Mutex<Bridge>> = Lazy::new(|| {
    crate::logging::init_with_writer(false, LogcatWriter::default);
    let bridge = Bridge::new(BridgeConfig::default(), Arc::clone(&SIGNALS))
        .with_renderer_factory(Box::new(|| {
            let gl = unsafe {
                glow::Context::from_loader_function(|name| {
                    CString::new(name)
                        .map(|name| eglGetProcAddress(name.as_ptr()))
                        .unwrap_or(std::ptr::null())
                })
            };
            Ok(Box::new(GlowRenderer::new(Arc::new(gl))?) as Box<dyn FrameRenderer>)
        }));
    Mutex::new(bridge)
});

fn bridge() -> MutexGuard<'static, Bridge> {
    BRIDGE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn jbool(value: bool) -> JBoolean {
    if value {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

/// The host's `AAssetManager`. The NDK documents it as safe to use from any
/// thread while the owning Java object is alive.
struct AndroidAssets {
    manager: NonNull<c_void>,
}

unsafe impl Send for AndroidAssets {}
unsafe impl Sync for AndroidAssets {}

impl AssetSource for AndroidAssets {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let c_path = CString::new(path)?;
        let asset =
            unsafe { AAssetManager_open(self.manager.as_ptr(), c_path.as_ptr(), AASSET_MODE_BUFFER) };
        if asset.is_null() {
            bail!("asset {path} not found");
        }
        let result = unsafe {
            let len = AAsset_getLength64(asset);
            let buffer = AAsset_getBuffer(asset);
            if buffer.is_null() || len <= 0 {
                Err(anyhow!("asset {path} is empty or unreadable"))
            } else {
                copy_font_buffer(std::slice::from_raw_parts(buffer as *const u8, len as usize))
            }
        };
        unsafe { AAsset_close(asset) };
        result
    }
}

/// Buffers one formatted event and hands it to logcat on drop.
#[derive(Default)]
struct LogcatWriter {
    buffer: Vec<u8>,
}

impl Write for LogcatWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for LogcatWriter {
    fn drop(&mut self) {
        let text: Vec<u8> = self
            .buffer
            .iter()
            .copied()
            .filter(|byte| *byte != 0)
            .collect();
        if let Ok(text) = CString::new(text) {
            unsafe {
                __android_log_write(ANDROID_LOG_INFO, LOG_TAG.as_ptr() as *const c_char, text.as_ptr());
            }
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeSetAssetManager(
    env: JniEnv,
    _this: JObject,
    asset_manager: JObject,
) {
    let assets = if asset_manager.is_null() {
        None
    } else {
        NonNull::new(unsafe { AAssetManager_fromJava(env, asset_manager) })
            .map(|manager| Arc::new(AndroidAssets { manager }) as Arc<dyn AssetSource>)
    };
    bridge().set_asset_source(assets);
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeInit(
    _env: JniEnv,
    _this: JObject,
    width: i32,
    height: i32,
    density: f32,
) {
    if let Err(err) = bridge().init(width, height, density) {
        tracing::error!(error = %format!("{err:#}"), "bridge init failed");
    }
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeShutdown(
    _env: JniEnv,
    _this: JObject,
) {
    bridge().shutdown();
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeResize(
    _env: JniEnv,
    _this: JObject,
    width: i32,
    height: i32,
) {
    bridge().resize(width, height);
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeRender(
    _env: JniEnv,
    _this: JObject,
) {
    bridge().render();
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeOnTouch(
    _env: JniEnv,
    _this: JObject,
    action: i32,
    x: f32,
    y: f32,
    pointer_id: i32,
) {
    bridge().dispatch_touch(action, x, y, pointer_id);
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeWantCaptureMouse(
    _env: JniEnv,
    _this: JObject,
) -> JBoolean {
    jbool(SIGNALS.wants_capture())
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeConsumeOcrRequest(
    _env: JniEnv,
    _this: JObject,
) -> JBoolean {
    jbool(SIGNALS.consume_ocr_request())
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeConsumePermissionRequest(
    _env: JniEnv,
    _this: JObject,
) -> JBoolean {
    jbool(SIGNALS.consume_permission_request())
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeTakeCloseNotice(
    _env: JniEnv,
    _this: JObject,
) -> JBoolean {
    jbool(SIGNALS.take_close_notice())
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeSetVisible(
    _env: JniEnv,
    _this: JObject,
    visible: JBoolean,
) {
    SIGNALS.set_visible(visible != JNI_FALSE);
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeIsVisible(
    _env: JniEnv,
    _this: JObject,
) -> JBoolean {
    jbool(SIGNALS.is_visible())
}

#[no_mangle]
pub extern "system" fn Java_com_overlay_bridge_OverlayBridge_nativeGetMainWindowSize(
    _env: JniEnv,
    _this: JObject,
) -> i64 {
    SIGNALS.packed_panel_size() as i64
}
