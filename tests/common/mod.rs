// Common test utilities for front-end integration tests
//
// Builds programs on top of the scripted input driver and the built-in
// cores, with every generated file kept in a temporary directory.

#![allow(dead_code)]

use emu_front::audio::NullSink;
use emu_front::input::keyboard::KEYBOARD_ID;
use emu_front::input::virtual_port::KEYBOARD_KEYS;
use emu_front::input::{HidDevice, InputConfig, ScriptHandle, ScriptedDriver};
use emu_front::{blank_factory, consoles, InputManager, Program, Settings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long to wait for the emulation thread before failing a test
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Index of a key in the canonical keyboard
pub fn key(name: &str) -> u32 {
    KEYBOARD_KEYS
        .iter()
        .position(|k| *k == name)
        .unwrap_or_else(|| panic!("unknown key {}", name)) as u32
}

/// Input manager with a keyboard plugged in and the default bindings
pub fn keyboard_input() -> (Arc<InputManager>, ScriptHandle) {
    let (driver, handle) = ScriptedDriver::new();
    handle.connect(Arc::new(HidDevice::keyboard(
        KEYBOARD_ID,
        "Keyboard",
        KEYBOARD_KEYS,
    )));
    let manager = Arc::new(InputManager::new(Box::new(driver)));
    manager.poll(true);
    InputConfig::new().apply(&manager);
    (manager, handle)
}

/// Settings with every generated path under `dir`
pub fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.home = Some(dir.to_path_buf());
    settings.paths.screenshots = Some(dir.join("screenshots"));
    settings.paths.debugging = Some(dir.join("debugging"));
    settings
}

/// Write a small game file
///
/// # Arguments
///
/// * `dir` - Directory to create the file in
/// * `file` - File name; the extension picks the emulator
pub fn game_file(dir: &Path, file: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, b"integration test program").expect("write game file");
    path
}

/// Program with the built-in cores and no audio device
pub fn program(settings: Settings, input: Arc<InputManager>) -> Program {
    let list = consoles();
    let factory = blank_factory(&list);
    Program::new(
        settings,
        list,
        Box::new(factory),
        input,
        Box::new(NullSink::new(48000)),
    )
}

/// Poll `condition` until it holds or `WAIT_TIMEOUT` passes
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < WAIT_TIMEOUT {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
