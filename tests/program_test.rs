// Program integration tests
// Loading, the emulation thread, save slots, rewind, screenshots, medium
// changes and tracing exercised through the public `Program` surface

mod common;

use common::{game_file, key, keyboard_input, program, settings_in, wait_until};
use emu_front::input::hid::keyboard;
use emu_front::input::keyboard::KEYBOARD_ID;
use emu_front::program::{StateError, Step, SLOT_COUNT};
use emu_front::{Emulator, Settings};
use std::fs;
use std::path::Path;

#[test]
fn test_load_run_unload_writes_battery_memory() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input);

    program.load_file(&game_file(dir.path(), "game.nes")).unwrap();
    assert_eq!(program.loaded(), Some("Famicom"));
    for _ in 0..5 {
        assert!(matches!(program.step(), Step::Ran { .. }));
    }

    program.unload();
    assert_eq!(program.loaded(), None);
    assert_eq!(program.step(), Step::Idle);
    assert!(dir.path().join("game.sav").exists());
}

#[test]
fn test_worker_runs_frames_and_yields_to_guards() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input);
    program.load("Game Boy", Some(&game_file(dir.path(), "game.gb"))).unwrap();

    program.start().unwrap();
    assert!(program.is_running());
    assert!(wait_until(|| program.frames() >= 3));

    // Every operation below parks the emulation thread first
    let before = program.interrupts();
    program.state_save(Some(2)).unwrap();
    program.state_load(Some(2)).unwrap();
    assert!(program.interrupts() >= before + 2);

    let frames = program.frames();
    assert!(wait_until(|| program.frames() > frames));

    program.quit();
    assert!(!program.is_running());
    assert_eq!(program.loaded(), None);
}

#[test]
fn test_pause_stops_the_worker_from_running_frames() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input);
    program.load("Famicom", Some(&game_file(dir.path(), "game.nes"))).unwrap();
    program.start().unwrap();
    assert!(wait_until(|| program.frames() >= 1));

    program.set_paused(true);
    let paused_at = program.frames();
    std::thread::sleep(std::time::Duration::from_millis(100));
    assert_eq!(program.frames(), paused_at);

    program.set_paused(false);
    assert!(wait_until(|| program.frames() > paused_at));
    program.quit();
}

#[test]
fn test_state_slots_with_undo() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input);
    program.load("Famicom", Some(&game_file(dir.path(), "game.nes"))).unwrap();

    assert!(matches!(
        program.state_load(Some(4)),
        Err(StateError::NotFound(4))
    ));

    program.step();
    let metadata = program.state_save(None).unwrap();
    assert_eq!(metadata.slot, 1);
    assert_eq!(metadata.system, "Famicom");
    assert!(dir.path().join("game.bs1").exists());

    // Saving over a slot can be undone
    program.step();
    program.state_save(Some(1)).unwrap();
    assert_eq!(program.undo_state_save().unwrap(), 1);
    assert!(matches!(
        program.undo_state_save(),
        Err(StateError::NothingToUndo)
    ));

    program.state_load(Some(1)).unwrap();
    program.undo_state_load().unwrap();
}

#[test]
fn test_slot_selection_wraps() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input);

    assert_eq!(program.decrement_slot(), SLOT_COUNT);
    assert_eq!(program.increment_slot(), 1);
    assert_eq!(program.increment_slot(), 2);
}

#[test]
fn test_hotkeys_save_and_load_state() {
    let dir = tempfile::tempdir().unwrap();
    let (input, handle) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input);
    program.load("Famicom", Some(&game_file(dir.path(), "game.nes"))).unwrap();
    program.step();

    // F2 saves, F7 selects the next slot
    handle.set(KEYBOARD_ID, keyboard::BUTTON, key("F7"), 1);
    program.input().poll(true);
    program.main();
    handle.set(KEYBOARD_ID, keyboard::BUTTON, key("F2"), 1);
    program.input().poll(true);
    let tick = program.main();

    assert!(dir.path().join("game.bs2").exists());
    assert_eq!(tick.status.as_deref(), Some("Saved state to slot 2"));
}

#[test]
fn test_rewind_walks_back_until_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.general.rewind = true;
    settings.rewind.length = 4;
    settings.rewind.frequency = 1;
    let (input, _) = keyboard_input();
    let mut program = program(settings, input);
    program.load("Famicom", Some(&game_file(dir.path(), "game.nes"))).unwrap();

    for _ in 0..10 {
        program.step();
    }
    assert_eq!(program.inspect(|s| s.rewind().len()), 4);

    assert!(program.set_rewinding(true));
    let mut steps = 0;
    while !program
        .messages()
        .any(|m| m.text == "Rewind history exhausted")
    {
        program.step();
        program.main();
        steps += 1;
        assert!(steps < 20, "rewind never ran out");
    }
    assert!(program.inspect(|s| s.rewind().is_empty()));
}

#[test]
fn test_screenshot_of_next_frame() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input);
    assert!(!program.screenshot());

    program.load("Famicom", Some(&game_file(dir.path(), "game.nes"))).unwrap();
    assert!(program.screenshot());
    program.step();
    program.main();

    let shots: Vec<_> = fs::read_dir(dir.path().join("screenshots").join("game"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|e| e == "png"))
        .collect();
    assert_eq!(shots.len(), 1);
    assert!(program
        .messages()
        .any(|m| m.text.starts_with("Captured screenshot")));
}

#[test]
fn test_quit_persists_settings_and_recent_games() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.toml");
    let recent_path = dir.path().join("recent.toml");
    let (input, _) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input)
        .with_settings_path(&settings_path)
        .with_recent_path(&recent_path);

    program.set_volume(0.5);
    program.load("Famicom", Some(&game_file(dir.path(), "game.nes"))).unwrap();
    program.quit();

    let saved = Settings::load(&settings_path).unwrap();
    assert_eq!(saved.audio.volume, 0.5);
    assert!(saved.input.bindings.contains_key("hotkey/Save State"));
    let recent = fs::read_to_string(&recent_path).unwrap();
    assert!(recent.contains("game.nes"));
}

#[test]
fn test_change_medium_reconnects_the_tray_on_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    let bios = dir.path().join("scph1001.bin");
    fs::write(&bios, [0x42; 64]).unwrap();
    settings
        .firmware
        .insert(Settings::firmware_key("PlayStation", "BIOS", "US"), bios);
    let (input, _) = keyboard_input();
    let mut program = program(settings, input);

    assert!(program.change_medium(&game_file(dir.path(), "disc0.cue")).is_err());
    program.load("PlayStation", Some(&game_file(dir.path(), "disc1.cue"))).unwrap();
    let second = game_file(dir.path(), "disc2.cue");
    program.start().unwrap();
    assert!(wait_until(|| program.frames() >= 1));

    program.change_medium(&second).unwrap();
    assert!(program.messages().any(|m| m.text.starts_with("Inserted")));
    let drive = program.inspect(|s| {
        s.emulator()
            .map(|e| (e.reconnect_pending(), e.location().map(Path::to_path_buf)))
    });
    assert_eq!(drive, Some((true, Some(second.clone()))));

    // The emulation thread closes the tray once the delay has passed
    assert!(wait_until(|| !program
        .inspect(|s| s.emulator().is_some_and(Emulator::reconnect_pending))));
    assert!(program.frames() > 1);
    program.quit();
}

#[test]
fn test_trace_written_to_debugging_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = keyboard_input();
    let mut program = program(settings_in(dir.path()), input);
    assert!(!program.set_trace(true));

    program.load("Famicom", Some(&game_file(dir.path(), "game.nes"))).unwrap();
    assert!(program.set_trace(true));
    program.step();
    assert!(!program.set_trace(false));

    let trace = fs::read_to_string(dir.path().join("debugging").join("game.log")).unwrap();
    assert!(trace.starts_with("Famicom: attached, medium game"));
    assert!(program.messages().any(|m| m.text == "Tracing stopped"));
}
