// Session
//
// The state shared by the UI thread and the emulation thread: every
// emulator, the active one, the output buffers, rewind history, save-state
// bookkeeping, settings and the run flags. The emulation thread owns it
// while it runs; everything else reaches it through a guard.

use super::platform::{Hooks, InputGate, Output, Teardown, TraceFile};
use super::rewind::{Rewind, RewindMode, RewindStep};
use super::state::{StateError, StateManager, StateMetadata};
use crate::emulator::{Console, Emulator, LoadError, Running};
use crate::engine::CoreFactory;
use crate::input::{Defocus, InputManager};
use crate::settings::{RecentGames, Settings};
use crate::video::Latch;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Battery memory is written this often while a game runs
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of one emulation thread iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing ran; the thread should sleep
    Idle,
    /// One frame ran
    Ran { resized: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Flags {
    paused: bool,
    fast_forward: bool,
    frame_advance: bool,
    focused: bool,
    fullscreen: bool,
}

pub struct Session {
    emulators: Vec<Emulator>,
    active: Option<usize>,
    pub(crate) output: Output,
    rewind: Rewind,
    states: StateManager,
    settings: Settings,
    factory: Box<dyn CoreFactory>,
    /// Locations given on the command line, consumed by `load`
    start: VecDeque<PathBuf>,
    recent: RecentGames,
    recent_path: Option<PathBuf>,
    flags: Flags,
    last_autosave: Instant,
}

impl Session {
    pub fn new(
        settings: Settings,
        consoles: Vec<Console>,
        factory: Box<dyn CoreFactory>,
        mut output: Output,
    ) -> Self {
        let emulators = consoles
            .into_iter()
            .map(|console| {
                let configuration = settings.emulator(console.name());
                Emulator::new(console, configuration)
            })
            .collect();
        output.configure(&settings.audio);

        Self {
            emulators,
            active: None,
            output,
            rewind: Rewind::new(settings.rewind.length, settings.rewind.frequency),
            states: StateManager::new(),
            settings,
            factory,
            start: VecDeque::new(),
            recent: RecentGames::new(),
            recent_path: None,
            flags: Flags {
                paused: false,
                fast_forward: false,
                frame_advance: false,
                focused: true,
                fullscreen: false,
            },
            last_autosave: Instant::now(),
        }
    }

    pub fn emulators(&self) -> &[Emulator] {
        &self.emulators
    }

    /// The emulator with a game loaded, if any
    pub fn emulator(&self) -> Option<&Emulator> {
        self.emulators.get(self.active?)
    }

    pub fn emulator_mut(&mut self) -> Option<&mut Emulator> {
        let index = self.active?;
        self.emulators.get_mut(index)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn rewind(&self) -> &Rewind {
        &self.rewind
    }

    pub fn states(&self) -> &StateManager {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut StateManager {
        &mut self.states
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Output {
        &mut self.output
    }

    pub fn recent(&self) -> &RecentGames {
        &self.recent
    }

    /// Use a persisted recent-games list
    pub fn set_recent(&mut self, recent: RecentGames, path: Option<PathBuf>) {
        self.recent = recent;
        self.recent_path = path;
    }

    pub fn push_start(&mut self, location: PathBuf) {
        self.start.push_back(location);
    }

    pub fn paused(&self) -> bool {
        self.flags.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.flags.paused = paused;
        if paused {
            self.output.clear_audio();
        }
    }

    pub fn fast_forward(&self) -> bool {
        self.flags.fast_forward
    }

    pub fn set_fast_forward(&mut self, enabled: bool) {
        self.flags.fast_forward = enabled;
    }

    /// Run exactly one frame on the next iteration while paused
    pub fn frame_advance(&mut self) {
        self.flags.paused = true;
        self.flags.frame_advance = true;
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.flags.focused = focused;
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.flags.fullscreen = fullscreen;
    }

    /// Start or stop rewinding; does nothing while rewind is disabled
    pub fn set_rewinding(&mut self, rewinding: bool) -> bool {
        if !self.settings.general.rewind || self.active.is_none() {
            return false;
        }
        let mode = if rewinding {
            RewindMode::Rewinding
        } else {
            RewindMode::Playing
        };
        if self.rewind.mode() != mode {
            self.rewind.set_mode(mode);
        }
        true
    }

    /// Name of the first emulator whose medium has the file's extension
    pub fn system_for(&self, location: &Path) -> Option<String> {
        let extension = location.extension()?.to_str()?;
        self.emulators
            .iter()
            .find(|emulator| emulator.console().accepts(extension))
            .map(|emulator| emulator.name().to_string())
    }

    /// Name and location of the loaded game
    pub fn current(&self) -> Option<(String, PathBuf)> {
        let emulator = self.emulator()?;
        let location = emulator.location()?.to_path_buf();
        Some((emulator.name().to_string(), location))
    }

    /// Load a game into an emulator, unloading the active one first
    ///
    /// # Arguments
    /// * `system` - Emulator name
    /// * `location` - Game to queue; the queue and start list are used if `None`
    pub fn load(&mut self, system: &str, location: Option<&Path>) -> Result<(), LoadError> {
        let index = self
            .emulators
            .iter()
            .position(|emulator| emulator.name() == system)
            .ok_or_else(|| LoadError::Other(format!("unknown system {}", system)))?;
        self.unload();

        let emulator = &mut self.emulators[index];
        if let Some(location) = location {
            emulator.queue(location);
        }
        emulator.load(&*self.factory, &self.settings, &mut self.start)?;

        if let Some(location) = emulator.location() {
            self.recent.add(system, location);
            if let Some(path) = &self.recent_path {
                if let Err(e) = self.recent.save(path) {
                    log::warn!("Could not save recent games: {}", e);
                }
            }
        }
        self.settings
            .emulators
            .insert(system.to_string(), emulator.configuration().clone());

        self.active = Some(index);
        self.rewind
            .reset(self.settings.rewind.length, self.settings.rewind.frequency);
        self.states = StateManager::new();
        self.output.reset();
        self.flags.paused = false;
        self.flags.frame_advance = false;
        self.last_autosave = Instant::now();
        Ok(())
    }

    /// Save and unload the active emulator
    ///
    /// # Returns
    /// `false` if nothing was loaded
    pub fn unload(&mut self) -> bool {
        let Some(index) = self.active.take() else {
            return false;
        };
        let emulator = &mut self.emulators[index];
        if let Some(game) = emulator.game() {
            if let Err(e) = self.states.clear_undo(game) {
                log::warn!("Could not remove undo states: {}", e);
            }
        }
        emulator.unload(&mut Teardown {
            output: &mut self.output,
        });

        self.output.set_trace(None);
        self.rewind.clear();
        self.output.reset();
        self.flags.paused = false;
        self.flags.fast_forward = false;
        self.flags.frame_advance = false;
        true
    }

    /// Soft reset the active core
    pub fn reset(&mut self) -> bool {
        let reset = self.emulator_mut().is_some_and(|emulator| emulator.power(true));
        if reset {
            self.rewind.clear();
        }
        reset
    }

    pub fn change_medium(&mut self, location: &Path) -> Result<(), LoadError> {
        let index = self
            .active
            .ok_or_else(|| LoadError::Other("nothing is loaded".to_string()))?;
        self.emulators[index].change_medium(location, &self.settings)?;
        self.rewind.clear();
        Ok(())
    }

    pub fn save_state(&mut self, slot: u32) -> Result<StateMetadata, StateError> {
        let index = self.active.ok_or(StateError::NotLoaded)?;
        let emulator = &mut self.emulators[index];
        let system = emulator.name().to_string();
        let (core, game) = emulator.loaded().ok_or(StateError::NotLoaded)?;
        self.states.save(core, game, &system, slot)
    }

    pub fn load_state(&mut self, slot: u32) -> Result<(), StateError> {
        let index = self.active.ok_or(StateError::NotLoaded)?;
        let (core, game) = self.emulators[index]
            .loaded()
            .ok_or(StateError::NotLoaded)?;
        self.states.load(core, game, slot)?;
        self.rewind.clear();
        Ok(())
    }

    pub fn undo_save_state(&mut self) -> Result<u32, StateError> {
        let index = self.active.ok_or(StateError::NotLoaded)?;
        let game = self.emulators[index].game().ok_or(StateError::NotLoaded)?;
        self.states.undo_save(game)
    }

    pub fn undo_load_state(&mut self) -> Result<(), StateError> {
        let index = self.active.ok_or(StateError::NotLoaded)?;
        let (core, game) = self.emulators[index]
            .loaded()
            .ok_or(StateError::NotLoaded)?;
        self.states.undo_load(core, game)?;
        self.rewind.clear();
        Ok(())
    }

    /// Set the master volume and return the clamped value
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.output.mixer_mut().set_volume(volume);
        let volume = self.output.mixer().volume();
        self.settings.audio.volume = volume;
        volume
    }

    pub fn toggle_mute(&mut self) -> bool {
        let mute = !self.settings.audio.mute;
        self.settings.audio.mute = mute;
        self.output.mixer_mut().set_mute(mute);
        mute
    }

    /// Ask for the next frame to be saved as PNG
    pub fn request_screenshot(&mut self) -> bool {
        let Some(location) = self
            .emulator()
            .and_then(|emulator| emulator.location())
            .map(Path::to_path_buf)
        else {
            return false;
        };
        let directory = self.settings.screenshots_dir();
        self.output.request_screenshot(directory, Some(location));
        true
    }

    /// Write core trace messages to `<debugging>/<game>.log`, or stop
    ///
    /// # Returns
    /// The path of the trace file while tracing
    pub fn set_trace(&mut self, enabled: bool) -> io::Result<Option<PathBuf>> {
        if !enabled {
            self.output.set_trace(None);
            return Ok(None);
        }
        let Some(location) = self.emulator().and_then(Emulator::location) else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no game loaded"));
        };
        let stem = location
            .file_stem()
            .map_or_else(|| "trace".to_string(), |s| s.to_string_lossy().into_owned());
        let path = self.settings.debugging_dir().join(format!("{}.log", stem));
        self.output.set_trace(Some(TraceFile::create(&path)?));
        log::info!("Tracing to {}", path.display());
        Ok(Some(path))
    }

    /// Take the geometry latch if a resize is pending
    pub fn take_latch(&mut self) -> Option<Latch> {
        let latch = self.emulator_mut()?.latch_mut();
        latch.take_changed().then_some(*latch)
    }

    /// Copy per-emulator configuration back into the settings
    pub fn store_configurations(&mut self) {
        for emulator in &self.emulators {
            self.settings
                .emulators
                .insert(emulator.name().to_string(), emulator.configuration().clone());
        }
    }

    /// One iteration of the emulation thread
    ///
    /// Runs deferred timers, then one frame unless nothing is loaded, the
    /// session is paused (without a pending frame advance) or the window is
    /// unfocused under the pause-on-defocus policy.
    pub fn step(&mut self, input: &InputManager, now: Instant) -> Step {
        let Some(index) = self.active else {
            return Step::Idle;
        };
        let Session {
            emulators,
            output,
            rewind,
            settings,
            flags,
            last_autosave,
            ..
        } = self;
        let emulator = &mut emulators[index];
        emulator.poll_deferred(now);

        let unfocused = !flags.focused && !flags.fullscreen;
        let defocus = settings.input.defocus;
        if (flags.paused && !flags.frame_advance) || (unfocused && defocus == Defocus::Pause) {
            output.clear_audio();
            return Step::Idle;
        }
        flags.frame_advance = false;

        let gate = if unfocused && defocus == Defocus::Block {
            InputGate::Blocked
        } else {
            InputGate::Open
        };
        let fast_forward = flags.fast_forward;
        let Some(Running {
            core,
            console,
            latch,
        }) = emulator.running()
        else {
            return Step::Idle;
        };

        let capturing = rewind.mode() == RewindMode::Playing;
        if settings.general.rewind && !(fast_forward && capturing) {
            match rewind.step(core) {
                RewindStep::Exhausted => output.push_message("Rewind history exhausted"),
                RewindStep::Failed => output.push_message("Rewind failed"),
                _ => {}
            }
        }

        let mut hooks = Hooks {
            output: &mut *output,
            console,
            latch: &mut *latch,
            input,
            gate,
        };
        if settings.general.run_ahead && !fast_forward && rewind.mode() == RewindMode::Playing {
            core.set_run_ahead(true);
            core.run(&mut hooks);
            let state = core.serialize(false);
            core.set_run_ahead(false);
            core.run(&mut hooks);
            if !core.unserialize(&state) {
                log::warn!("Run-ahead state rejected by the core");
            }
        } else {
            core.run(&mut hooks);
        }
        let resized = latch.changed;

        if settings.general.auto_save_memory && now.duration_since(*last_autosave) >= AUTOSAVE_INTERVAL {
            *last_autosave = now;
            emulator.save();
        }
        Step::Ran { resized }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSink, Frame, NullSink, RecordingSink};
    use crate::emulator::{blank_factory, consoles};
    use crate::engine::blank::SAMPLES_PER_FRAME;
    use crate::input::NullDriver;
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::Arc;

    fn session_with(settings: Settings, sink: Box<dyn AudioSink>) -> Session {
        let list = consoles();
        let factory = blank_factory(&list);
        Session::new(settings, list, Box::new(factory), Output::new(sink))
    }

    fn session(settings: Settings) -> Session {
        session_with(settings, Box::new(NullSink::new(48000)))
    }

    /// Run `steps` frames and return the sink contents and the core state
    fn record(
        dir: &tempfile::TempDir,
        run_ahead: bool,
        steps: usize,
    ) -> (Arc<Mutex<Vec<Frame>>>, Vec<u8>) {
        let input = InputManager::new(Box::new(NullDriver));
        let mut settings = Settings::default();
        settings.general.run_ahead = run_ahead;
        let sink = RecordingSink::new(48000);
        let frames = sink.frames();
        let mut session = session_with(settings, Box::new(sink));
        session.load("Famicom", Some(&game(dir))).unwrap();

        for _ in 0..steps {
            assert!(matches!(session.step(&input, Instant::now()), Step::Ran { .. }));
        }
        let state = session
            .emulator_mut()
            .and_then(Emulator::core_mut)
            .map(|core| core.serialize(false))
            .unwrap();
        (frames, state)
    }

    fn game(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("game.nes");
        fs::write(&path, b"program").unwrap();
        path
    }

    #[test]
    fn test_step_runs_only_when_loaded_and_unpaused() {
        let dir = tempfile::tempdir().unwrap();
        let input = InputManager::new(Box::new(NullDriver));
        let mut session = session(Settings::default());
        assert_eq!(session.step(&input, Instant::now()), Step::Idle);

        session.load("Famicom", Some(&game(&dir))).unwrap();
        assert_eq!(
            session.step(&input, Instant::now()),
            Step::Ran { resized: true }
        );
        assert_eq!(
            session.step(&input, Instant::now()),
            Step::Ran { resized: true }
        );
        assert!(session.take_latch().is_some());
        assert_eq!(
            session.step(&input, Instant::now()),
            Step::Ran { resized: false }
        );

        session.set_paused(true);
        assert_eq!(session.step(&input, Instant::now()), Step::Idle);
        session.frame_advance();
        assert!(matches!(session.step(&input, Instant::now()), Step::Ran { .. }));
        assert_eq!(session.step(&input, Instant::now()), Step::Idle);
    }

    #[test]
    fn test_defocus_policy() {
        let dir = tempfile::tempdir().unwrap();
        let input = InputManager::new(Box::new(NullDriver));
        let mut session = session(Settings::default());
        session.load("Famicom", Some(&game(&dir))).unwrap();

        session.set_focused(false);
        assert_eq!(session.step(&input, Instant::now()), Step::Idle);
        session.set_fullscreen(true);
        assert!(matches!(session.step(&input, Instant::now()), Step::Ran { .. }));

        session.set_fullscreen(false);
        session.settings_mut().input.defocus = Defocus::Block;
        assert!(matches!(session.step(&input, Instant::now()), Step::Ran { .. }));
    }

    #[test]
    fn test_rewind_during_steps() {
        let dir = tempfile::tempdir().unwrap();
        let input = InputManager::new(Box::new(NullDriver));
        let mut settings = Settings::default();
        settings.general.rewind = true;
        settings.rewind.frequency = 2;
        let mut session = session(settings);
        session.load("Famicom", Some(&game(&dir))).unwrap();

        for _ in 0..10 {
            session.step(&input, Instant::now());
        }
        assert_eq!(session.rewind().len(), 5);

        assert!(session.set_rewinding(true));
        for _ in 0..5 {
            session.step(&input, Instant::now());
        }
        assert_eq!(session.rewind().mode(), RewindMode::Playing);
        assert_eq!(
            session.output_mut().take_messages(),
            vec!["Rewind history exhausted".to_string()]
        );
    }

    #[test]
    fn test_rewind_needs_setting() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(Settings::default());
        session.load("Famicom", Some(&game(&dir))).unwrap();
        assert!(!session.set_rewinding(true));
        assert_eq!(session.rewind().mode(), RewindMode::Playing);
    }

    #[test]
    fn test_load_replaces_active_and_records_recent() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(Settings::default());
        let first = game(&dir);
        let second = dir.path().join("other.gb");
        fs::write(&second, b"program").unwrap();

        session.load("Famicom", Some(&first)).unwrap();
        session.load("Game Boy", Some(&second)).unwrap();
        assert_eq!(session.emulator().map(Emulator::name), Some("Game Boy"));
        assert!(!session.emulators()[0].is_loaded());
        assert_eq!(session.recent().len(), 2);
        assert_eq!(session.system_for(&first).as_deref(), Some("Famicom"));

        assert!(session.unload());
        assert!(!session.unload());
        assert!(session.emulator().is_none());
    }

    #[test]
    fn test_state_round_trip_through_session() {
        let dir = tempfile::tempdir().unwrap();
        let input = InputManager::new(Box::new(NullDriver));
        let mut session = session(Settings::default());
        assert!(matches!(session.save_state(1), Err(StateError::NotLoaded)));

        session.load("Famicom", Some(&game(&dir))).unwrap();
        session.step(&input, Instant::now());
        session.save_state(1).unwrap();
        for _ in 0..3 {
            session.step(&input, Instant::now());
        }
        session.load_state(1).unwrap();
        session.undo_load_state().unwrap();
        assert_eq!(session.undo_save_state().unwrap(), 1);
        assert!(!dir.path().join("game.bs1").exists());
    }

    #[test]
    fn test_run_ahead_keeps_audio_and_frame_count() {
        let dir = tempfile::tempdir().unwrap();
        let steps = 6;
        let (plain_audio, plain_state) = record(&dir, false, steps);
        let (ahead_audio, ahead_state) = record(&dir, true, steps);

        let plain = plain_audio.lock().len();
        assert!(plain > 0);
        assert!(plain <= steps * SAMPLES_PER_FRAME);
        assert_eq!(ahead_audio.lock().len(), plain);

        // The speculative frame is rolled back: both cores stand on frame 6
        assert_eq!(ahead_state, plain_state);
        let frame = u64::from_le_bytes(plain_state[2..10].try_into().unwrap());
        assert_eq!(frame, steps as u64);
    }

    #[test]
    fn test_battery_memory_autosaves() {
        let dir = tempfile::tempdir().unwrap();
        let input = InputManager::new(Box::new(NullDriver));
        let mut session = session(Settings::default());
        session.load("Famicom", Some(&game(&dir))).unwrap();
        let save = dir.path().join("game.sav");
        let start = Instant::now();

        session.step(&input, start + AUTOSAVE_INTERVAL);
        assert!(!save.exists());

        session.settings_mut().general.auto_save_memory = true;
        session.step(&input, start + AUTOSAVE_INTERVAL / 2);
        assert!(!save.exists());
        session.step(&input, start + AUTOSAVE_INTERVAL);
        assert!(save.exists());

        // The next write waits a full interval again
        fs::remove_file(&save).unwrap();
        session.step(&input, start + AUTOSAVE_INTERVAL + Duration::from_secs(1));
        assert!(!save.exists());
        session.step(&input, start + AUTOSAVE_INTERVAL * 2);
        assert!(save.exists());
    }

    #[test]
    fn test_trace_file_follows_the_game() {
        let dir = tempfile::tempdir().unwrap();
        let input = InputManager::new(Box::new(NullDriver));
        let mut settings = Settings::default();
        settings.paths.debugging = Some(dir.path().join("debugging"));
        let mut session = session(settings);
        assert!(session.set_trace(true).is_err());

        session.load("Famicom", Some(&game(&dir))).unwrap();
        let path = session.set_trace(true).unwrap().unwrap();
        assert_eq!(path, dir.path().join("debugging").join("game.log"));
        session.step(&input, Instant::now());

        // Unloading closes and flushes the file
        session.unload();
        assert!(session.output().trace().is_none());
        let trace = fs::read_to_string(&path).unwrap();
        assert!(trace.starts_with("Famicom: attached, medium game"));
    }

    #[test]
    fn test_unknown_system() {
        let mut session = session(Settings::default());
        assert!(matches!(
            session.load("Atari 2600", None),
            Err(LoadError::Other(_))
        ));
    }
}
