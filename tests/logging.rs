use std::{fs, thread::sleep, time::Duration};

use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn first_log_file_stays_in_use_after_reinit() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("bridge.log");
    let second = dir.path().join("bridge-reinit.log");

    overlay_bridge::logging::init(true, Some(&first));
    tracing::info!(width = 1080, height = 1920, "surface ready");

    overlay_bridge::logging::init(false, Some(&second));
    tracing::info!("after reinit");

    sleep(Duration::from_millis(100));

    let contents = fs::read_to_string(&first).unwrap();
    assert!(contents.contains("surface ready"));
    assert!(contents.contains("width=1080"));
    assert!(contents.contains("after reinit"));
    assert!(!second.exists(), "second log file should not be created");
}
