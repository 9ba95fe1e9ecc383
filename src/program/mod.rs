// Program module - The front-end control layer
//
// `Program` is the application context: it owns the session shared with
// the emulation thread, the input manager and the UI-side status messages.
// The UI thread calls `main` once per tick; every operation that touches
// the session goes through a guard, which parks the emulation thread for
// as long as the operation runs.
//
// Submodules:
// - `guard`: interrupt request/acknowledge handshake
// - `session`: the shared state and the per-frame step
// - `worker`: the emulation thread
// - `platform`: callbacks the core makes while it runs
// - `rewind`, `state`, `screenshot`: rewind history, save slots, PNG capture

pub mod guard;
pub mod platform;
pub mod rewind;
pub mod screenshot;
pub mod session;
pub mod state;
pub mod worker;

pub use guard::{Guard, Guarded, Interrupt};
pub use platform::{Hooks, InputGate, Output, Teardown, TraceFile};
pub use rewind::{Rewind, RewindMode, RewindStep};
pub use screenshot::{save_screenshot, ScreenshotError};
pub use session::{Session, Step};
pub use state::{StateError, StateManager, StateMetadata, SLOT_COUNT};

use crate::audio::AudioSink;
use crate::emulator::{Console, LoadError};
use crate::engine::CoreFactory;
use crate::input::{Defocus, HotkeyAction, HotkeyEvent, InputManager};
use crate::settings::{RecentGames, Settings};
use crate::video::Latch;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long a status message stays visible
pub const MESSAGE_LIFETIME: Duration = Duration::from_secs(2);

/// Volume change per hotkey press
const VOLUME_STEP: f64 = 0.1;

/// State shared with the emulation thread
pub struct Shared {
    pub(crate) session: Guarded<Session>,
    pub(crate) input: Arc<InputManager>,
    /// Set by the emulation thread when the video geometry changed
    pub(crate) needs_resize: AtomicBool,
    pub(crate) vblanks: AtomicU32,
    pub(crate) frames: AtomicU64,
    /// Messages produced on the emulation thread
    pub(crate) messages: Mutex<Vec<String>>,
}

/// A status message and when it was posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub posted: Instant,
    pub text: String,
}

/// What the UI should do after a tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tick {
    /// Text for the status bar
    pub status: Option<String>,
    /// New video geometry, if it changed
    pub resize: Option<Latch>,
    /// The quit hotkey was pressed
    pub quit: bool,
    /// Fullscreen was toggled
    pub fullscreen: Option<bool>,
}

pub struct Program {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    messages: VecDeque<Message>,
    settings_path: Option<PathBuf>,
    /// UI-side copies of session state, so a tick needs no guard
    loaded: Option<String>,
    paused: bool,
    focused: bool,
    fullscreen: bool,
    defocus: Defocus,
    show_status: bool,
    modal: bool,
    quit_requested: bool,
}

impl Program {
    /// Create the program
    ///
    /// The stored bindings are pushed into the input manager. No thread is
    /// started until `start`.
    ///
    /// # Arguments
    ///
    /// * `settings` - Front-end settings
    /// * `consoles` - One emulator is created per console
    /// * `factory` - Creates cores for loaded games
    /// * `input` - Input manager, shared with the window layer
    /// * `sink` - Audio output
    pub fn new(
        settings: Settings,
        consoles: Vec<Console>,
        factory: Box<dyn CoreFactory>,
        input: Arc<InputManager>,
        sink: Box<dyn AudioSink>,
    ) -> Self {
        settings.input.apply(&input);
        let defocus = settings.input.defocus;
        let show_status = settings.general.show_status;
        let session = Session::new(settings, consoles, factory, Output::new(sink));

        Self {
            shared: Arc::new(Shared {
                session: Guarded::new(session),
                input,
                needs_resize: AtomicBool::new(false),
                vblanks: AtomicU32::new(0),
                frames: AtomicU64::new(0),
                messages: Mutex::new(Vec::new()),
            }),
            worker: None,
            messages: VecDeque::new(),
            settings_path: None,
            loaded: None,
            paused: false,
            focused: true,
            fullscreen: false,
            defocus,
            show_status,
            modal: false,
            quit_requested: false,
        }
    }

    /// Persist settings to `path` when the program quits
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Keep the recent-games list in `path`
    pub fn with_recent_path(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let recent = RecentGames::load_or_default(&path);
        self.session(|s| s.set_recent(recent, Some(path)));
        self
    }

    /// Run `f` on the session with the emulation thread parked
    fn session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let guard = self.shared.session.guard();
        let mut session = guard.borrow_mut();
        f(&mut session)
    }

    /// Read the session with the emulation thread parked
    pub fn inspect<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        self.session(|s| f(s))
    }

    pub fn input(&self) -> &InputManager {
        &self.shared.input
    }

    /// Post a status message
    pub fn show(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{}", text);
        self.messages.push_back(Message {
            posted: Instant::now(),
            text,
        });
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Start the emulation thread
    pub fn start(&mut self) -> io::Result<()> {
        if self.worker.is_none() {
            self.worker = Some(worker::spawn(Arc::clone(&self.shared))?);
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Run one emulation iteration on the calling thread
    ///
    /// Only does something while the emulation thread is not running.
    pub fn step(&mut self) -> Step {
        if self.worker.is_some() {
            return Step::Idle;
        }
        let shared = Arc::clone(&self.shared);
        self.session(|s| worker::advance(&shared, s, Instant::now()))
    }

    /// Frames run since the program was created
    pub fn frames(&self) -> u64 {
        self.shared.frames.load(Ordering::Relaxed)
    }

    pub fn vblanks_per_second(&self) -> u32 {
        self.shared.vblanks.load(Ordering::Relaxed)
    }

    /// Interrupt requests raised so far
    pub fn interrupts(&self) -> u64 {
        self.shared.session.interrupt().interrupts()
    }

    /// Name of the emulator with a game loaded
    pub fn loaded(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Add locations from the command line
    pub fn push_start(&self, locations: impl IntoIterator<Item = PathBuf>) {
        self.session(|s| locations.into_iter().for_each(|l| s.push_start(l)));
    }

    /// Load a game into the named emulator
    ///
    /// # Arguments
    ///
    /// * `system` - Emulator name, e.g. "Super Famicom"
    /// * `location` - The game; the start list is used when `None`
    pub fn load(&mut self, system: &str, location: Option<&Path>) -> Result<(), LoadError> {
        let result: Result<Option<String>, LoadError> = self.session(|s| {
            s.load(system, location)?;
            Ok(s.emulator().and_then(|e| e.game()).map(|g| g.name().to_string()))
        });
        match result {
            Ok(game) => {
                self.loaded = Some(system.to_string());
                self.paused = false;
                self.show(format!("Loaded {}", game.unwrap_or_default()));
                Ok(())
            }
            Err(e) => {
                self.loaded = self.inspect(|s| s.emulator().map(|e| e.name().to_string()));
                if !e.is_silent() {
                    self.show(format!("Failed to load: {}", e));
                }
                Err(e)
            }
        }
    }

    /// Load a game into the first emulator that accepts its extension
    pub fn load_file(&mut self, location: &Path) -> Result<(), LoadError> {
        let system = self.inspect(|s| s.system_for(location)).ok_or_else(|| {
            LoadError::Other(format!("no emulator for {}", location.display()))
        })?;
        self.load(&system, Some(location))
    }

    pub fn unload(&mut self) {
        if self.session(|s| s.unload()) {
            self.show("Unloaded");
        }
        self.loaded = None;
        self.paused = false;
    }

    pub fn reset(&mut self) {
        if self.session(|s| s.reset()) {
            self.show("System reset");
        }
    }

    /// Unload and load the same game again
    pub fn reload(&mut self) -> Result<(), LoadError> {
        let Some((system, location)) = self.inspect(|s| s.current()) else {
            return Err(LoadError::Other("nothing is loaded".to_string()));
        };
        self.load(&system, Some(&location))
    }

    /// Insert another medium into the drive of the loaded console
    pub fn change_medium(&mut self, location: &Path) -> Result<(), LoadError> {
        let result = self.session(|s| s.change_medium(location));
        match &result {
            Ok(()) => self.show(format!("Inserted {}", location.display())),
            Err(e) => self.show(format!("Could not change medium: {}", e)),
        }
        result
    }

    /// Save to `slot`, or to the current slot
    pub fn state_save(&mut self, slot: Option<u32>) -> Result<StateMetadata, StateError> {
        let result = self.session(|s| {
            let slot = slot.unwrap_or_else(|| s.states().slot());
            s.save_state(slot)
        });
        match &result {
            Ok(metadata) => self.show(format!("Saved state to slot {}", metadata.slot)),
            Err(e) => self.show(format!("Failed to save state: {}", e)),
        }
        result
    }

    /// Load from `slot`, or from the current slot
    pub fn state_load(&mut self, slot: Option<u32>) -> Result<u32, StateError> {
        let result = self.session(|s| {
            let slot = slot.unwrap_or_else(|| s.states().slot());
            s.load_state(slot).map(|()| slot)
        });
        match &result {
            Ok(slot) => self.show(format!("Loaded state from slot {}", slot)),
            Err(e) => self.show(format!("Failed to load state: {}", e)),
        }
        result
    }

    pub fn undo_state_save(&mut self) -> Result<u32, StateError> {
        let result = self.session(|s| s.undo_save_state());
        match &result {
            Ok(slot) => self.show(format!("Undid state save to slot {}", slot)),
            Err(e) => self.show(format!("Failed to undo state save: {}", e)),
        }
        result
    }

    pub fn undo_state_load(&mut self) -> Result<(), StateError> {
        let result = self.session(|s| s.undo_load_state());
        match &result {
            Ok(()) => self.show("Undid state load"),
            Err(e) => self.show(format!("Failed to undo state load: {}", e)),
        }
        result
    }

    pub fn increment_slot(&mut self) -> u32 {
        let slot = self.session(|s| s.states_mut().increment());
        self.show(format!("Selected state slot {}", slot));
        slot
    }

    pub fn decrement_slot(&mut self) -> u32 {
        let slot = self.session(|s| s.states_mut().decrement());
        self.show(format!("Selected state slot {}", slot));
        slot
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.session(|s| s.set_paused(paused));
        self.paused = paused;
    }

    /// Pause and run exactly one frame
    pub fn frame_advance(&mut self) {
        self.session(|s| s.frame_advance());
        self.paused = true;
    }

    pub fn set_fast_forward(&mut self, enabled: bool) {
        self.session(|s| s.set_fast_forward(enabled));
    }

    pub fn set_rewinding(&mut self, rewinding: bool) -> bool {
        self.session(|s| s.set_rewinding(rewinding))
    }

    pub fn set_focused(&mut self, focused: bool) {
        if self.focused != focused {
            self.focused = focused;
            self.session(|s| s.set_focused(focused));
        }
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if self.fullscreen != fullscreen {
            self.fullscreen = fullscreen;
            self.session(|s| s.set_fullscreen(fullscreen));
        }
    }

    /// While a modal dialog is open hotkeys are ignored
    pub fn set_modal(&mut self, modal: bool) {
        self.modal = modal;
    }

    /// Capture the next frame to PNG
    pub fn screenshot(&mut self) -> bool {
        let requested = self.session(|s| s.request_screenshot());
        if !requested {
            self.show("No game loaded");
        }
        requested
    }

    /// Start or stop writing core trace messages to the debugging directory
    ///
    /// # Returns
    ///
    /// Whether a trace file is open afterwards
    pub fn set_trace(&mut self, enabled: bool) -> bool {
        match self.session(|s| s.set_trace(enabled)) {
            Ok(Some(path)) => {
                self.show(format!("Tracing to {}", path.display()));
                true
            }
            Ok(None) => {
                self.show("Tracing stopped");
                false
            }
            Err(e) => {
                self.show(format!("Could not open trace file: {}", e));
                false
            }
        }
    }

    pub fn set_volume(&mut self, volume: f64) -> f64 {
        let volume = self.session(|s| s.set_volume(volume));
        self.show(format!("Volume {:.0}%", volume * 100.0));
        volume
    }

    /// Whether hotkeys are read this tick
    fn hotkeys_enabled(&self) -> bool {
        !self.modal && (self.focused || self.fullscreen || self.defocus == Defocus::Allow)
    }

    /// Act on a hotkey edge
    pub fn hotkey(&mut self, event: HotkeyEvent, tick: &mut Tick) {
        let HotkeyEvent { action, pressed } = event;
        match action {
            HotkeyAction::FastForward => self.set_fast_forward(pressed),
            HotkeyAction::Rewind => {
                self.set_rewinding(pressed);
            }
            _ if !pressed => {}
            HotkeyAction::ToggleFullscreen => {
                let fullscreen = !self.fullscreen;
                self.set_fullscreen(fullscreen);
                tick.fullscreen = Some(fullscreen);
            }
            HotkeyAction::ToggleMouseCapture => {
                let input = self.input();
                if input.mouse_acquired() {
                    input.release_mouse();
                } else {
                    input.acquire_mouse();
                }
            }
            HotkeyAction::ToggleKeyboardCapture => {
                let captured = !self.input().keyboard_captured();
                self.input().set_keyboard_captured(captured);
                self.show(if captured {
                    "Keyboard captured"
                } else {
                    "Keyboard released"
                });
            }
            HotkeyAction::FrameAdvance => self.frame_advance(),
            HotkeyAction::CaptureScreenshot => {
                self.screenshot();
            }
            HotkeyAction::SaveState => {
                let _ = self.state_save(None);
            }
            HotkeyAction::LoadState => {
                let _ = self.state_load(None);
            }
            HotkeyAction::UndoSaveState => {
                let _ = self.undo_state_save();
            }
            HotkeyAction::UndoLoadState => {
                let _ = self.undo_state_load();
            }
            HotkeyAction::DecrementStateSlot => {
                self.decrement_slot();
            }
            HotkeyAction::IncrementStateSlot => {
                self.increment_slot();
            }
            HotkeyAction::PauseEmulation => {
                let paused = !self.paused;
                self.set_paused(paused);
            }
            HotkeyAction::ResetSystem => self.reset(),
            HotkeyAction::ReloadGame => {
                let _ = self.reload();
            }
            HotkeyAction::QuitEmulator => {
                self.quit_requested = true;
                tick.quit = true;
            }
            HotkeyAction::MuteAudio => {
                let mute = self.session(|s| s.toggle_mute());
                self.show(if mute { "Audio muted" } else { "Audio unmuted" });
            }
            HotkeyAction::DecreaseVolume => {
                let volume = self.inspect(|s| s.settings().audio.volume);
                self.set_volume(volume - VOLUME_STEP);
            }
            HotkeyAction::IncreaseVolume => {
                let volume = self.inspect(|s| s.settings().audio.volume);
                self.set_volume(volume + VOLUME_STEP);
            }
            HotkeyAction::ToggleShader => self.show("No shaders available"),
        }
    }

    /// One UI tick
    ///
    /// Polls input and hotkeys, picks up geometry changes and messages from
    /// the emulation thread, and builds the status line.
    pub fn main(&mut self) -> Tick {
        let mut tick = Tick {
            quit: self.quit_requested,
            ..Tick::default()
        };

        self.shared.input.poll(false);
        if self.hotkeys_enabled() {
            for event in self.shared.input.poll_hotkeys() {
                self.hotkey(event, &mut tick);
            }
        }

        if self.shared.needs_resize.swap(false, Ordering::AcqRel) {
            tick.resize = self.session(|s| s.take_latch());
        }

        let posted: Vec<String> = std::mem::take(&mut *self.shared.messages.lock());
        for text in posted {
            self.show(text);
        }

        let now = Instant::now();
        while self
            .messages
            .front()
            .is_some_and(|m| now.duration_since(m.posted) >= MESSAGE_LIFETIME)
        {
            self.messages.pop_front();
        }

        tick.status = match self.messages.back() {
            Some(message) => Some(message.text.clone()),
            None if !self.show_status => None,
            None if self.loaded.is_none() => None,
            None if self.paused => Some("Paused".to_string()),
            None => Some(format!("{} VPS", self.vblanks_per_second())),
        };
        tick
    }

    /// Stop the emulation thread and wait for it
    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.shared.session.interrupt().quit();
            if worker.join().is_err() {
                log::error!("Emulation thread panicked");
            }
        }
    }

    /// Stop the emulation thread, unload and persist settings
    pub fn quit(&mut self) {
        self.stop();
        self.unload();

        if let Some(path) = self.settings_path.clone() {
            let input = Arc::clone(&self.shared.input);
            let settings = self.session(|s| {
                s.store_configurations();
                s.settings_mut().input.capture(&input);
                s.settings().clone()
            });
            if let Err(e) = settings.save(&path) {
                log::warn!("Could not save settings: {}", e);
            }
        }
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullSink;
    use crate::emulator::{blank_factory, consoles};
    use crate::input::binding::{Assignment, Qualifier};
    use crate::input::hid::keyboard;
    use crate::input::keyboard::KEYBOARD_ID;
    use crate::input::virtual_port::KEYBOARD_KEYS;
    use crate::input::{BindTarget, HidDevice, ScriptHandle, ScriptedDriver};
    use std::fs;

    fn program(settings: Settings) -> (Program, ScriptHandle) {
        let (driver, handle) = ScriptedDriver::new();
        handle.connect(Arc::new(HidDevice::keyboard(KEYBOARD_ID, "Keyboard", KEYBOARD_KEYS)));
        let input = Arc::new(InputManager::new(Box::new(driver)));
        let list = consoles();
        let factory = blank_factory(&list);
        let program = Program::new(
            settings,
            list,
            Box::new(factory),
            input,
            Box::new(NullSink::new(48000)),
        );
        program.input().poll(true);
        (program, handle)
    }

    fn game(dir: &tempfile::TempDir, file: &str) -> PathBuf {
        let path = dir.path().join(file);
        fs::write(&path, b"program").unwrap();
        path
    }

    fn key(name: &str) -> u32 {
        KEYBOARD_KEYS.iter().position(|k| *k == name).unwrap() as u32
    }

    #[test]
    fn test_load_file_picks_emulator() {
        let dir = tempfile::tempdir().unwrap();
        let (mut program, _) = program(Settings::default());
        program.load_file(&game(&dir, "game.sfc")).unwrap();
        assert_eq!(program.loaded(), Some("Super Famicom"));
        assert_eq!(program.messages().last().map(|m| m.text.as_str()), Some("Loaded game"));

        assert!(program.load_file(&game(&dir, "notes.txt")).is_err());
        assert_eq!(program.loaded(), Some("Super Famicom"));
    }

    #[test]
    fn test_failed_load_reports_and_stays_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let (mut program, _) = program(Settings::default());
        let result = program.load("PlayStation", Some(&game(&dir, "disc.cue")));
        assert!(matches!(result, Err(LoadError::FirmwareMissing { .. })));
        assert_eq!(program.loaded(), None);
        assert!(program
            .messages()
            .any(|m| m.text.contains("firmware is missing")));

        // A cancelled pick is silent
        let count = program.messages().count();
        assert_eq!(program.load("Famicom", None), Err(LoadError::NoFileSelected));
        assert_eq!(program.messages().count(), count);
    }

    #[test]
    fn test_step_counts_frames() {
        let dir = tempfile::tempdir().unwrap();
        let (mut program, _) = program(Settings::default());
        assert_eq!(program.step(), Step::Idle);
        program.load("Famicom", Some(&game(&dir, "game.nes"))).unwrap();
        for _ in 0..3 {
            program.step();
        }
        assert_eq!(program.frames(), 3);

        let tick = program.main();
        assert_eq!(tick.resize.map(|l| (l.width, l.height)), Some((256, 240)));
        assert!(program.main().resize.is_none());
    }

    #[test]
    fn test_hotkeys_drive_the_program() {
        let dir = tempfile::tempdir().unwrap();
        let (mut program, handle) = program(Settings::default());
        program.load("Famicom", Some(&game(&dir, "game.nes"))).unwrap();
        program.input().bind_assignment(
            BindTarget::Hotkey(HotkeyAction::PauseEmulation),
            0,
            Assignment::new(KEYBOARD_ID, keyboard::BUTTON, key("P"), Qualifier::None),
        );
        program.input().bind_assignment(
            BindTarget::Hotkey(HotkeyAction::QuitEmulator),
            0,
            Assignment::new(KEYBOARD_ID, keyboard::BUTTON, key("Q"), Qualifier::None),
        );

        handle.set(KEYBOARD_ID, keyboard::BUTTON, key("P"), 1);
        program.input().poll(true);
        program.main();
        assert!(program.paused());
        assert_eq!(program.step(), Step::Idle);

        // Hotkeys are ignored behind a modal dialog
        handle.set(KEYBOARD_ID, keyboard::BUTTON, key("P"), 0);
        program.input().poll(true);
        program.main();
        program.set_modal(true);
        handle.set(KEYBOARD_ID, keyboard::BUTTON, key("Q"), 1);
        program.input().poll(true);
        assert!(!program.main().quit);

        program.set_modal(false);
        assert!(program.main().quit);
    }

    #[test]
    fn test_hotkeys_follow_the_focus_policy() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            (Defocus::Pause, false, false),
            (Defocus::Block, false, false),
            (Defocus::Pause, true, true),
            (Defocus::Allow, false, true),
        ];
        for (defocus, fullscreen, expected) in cases {
            let mut settings = Settings::default();
            settings.input.defocus = defocus;
            let (mut program, handle) = program(settings);
            program.load("Famicom", Some(&game(&dir, "game.nes"))).unwrap();
            program.input().bind_assignment(
                BindTarget::Hotkey(HotkeyAction::PauseEmulation),
                0,
                Assignment::new(KEYBOARD_ID, keyboard::BUTTON, key("P"), Qualifier::None),
            );

            program.set_focused(false);
            program.set_fullscreen(fullscreen);
            handle.set(KEYBOARD_ID, keyboard::BUTTON, key("P"), 1);
            program.input().poll(true);
            program.main();
            assert_eq!(
                program.paused(),
                expected,
                "{:?} with fullscreen {}",
                defocus,
                fullscreen
            );
        }
    }

    #[test]
    fn test_status_line() {
        let dir = tempfile::tempdir().unwrap();
        let (mut program, _) = program(Settings::default());
        assert_eq!(program.main().status, None);

        program.load("Famicom", Some(&game(&dir, "game.nes"))).unwrap();
        assert_eq!(program.main().status.as_deref(), Some("Loaded game"));

        program.messages.clear();
        assert_eq!(program.main().status.as_deref(), Some("0 VPS"));
        program.set_paused(true);
        assert_eq!(program.main().status.as_deref(), Some("Paused"));
    }

    #[test]
    fn test_quit_saves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let (program, _) = program(Settings::default());
        let mut program = program.with_settings_path(&path);
        program.load("Game Boy", Some(&game(&dir, "game.gb"))).unwrap();
        program.start().unwrap();
        program.quit();

        assert!(!program.is_running());
        assert_eq!(program.loaded(), None);
        let settings = Settings::load(&path).unwrap();
        assert_eq!(
            settings.emulator("Game Boy").game_path.as_deref(),
            Some(dir.path())
        );
    }
}
