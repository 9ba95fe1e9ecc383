// Emulator module - One supported console and the game loaded into it
//
// An `Emulator` exists for every console in the registry for the whole
// process lifetime. `load` instantiates the core with the game and the
// firmware, connects the declared peripherals and powers it on; `unload`
// saves battery memory and releases everything again. `input` resolves a
// core input poll through the console's port declarations into the input
// manager's mappings.
//
// Nothing here synchronizes: the program wraps every call made off the
// emulation thread in a guard.

mod console;
mod error;

pub use console::{blank_factory, consoles, Connection, Console, Firmware, PortPolicy};
pub use error::LoadError;

use crate::engine::{Core, CoreFactory, CoreInput, InputKind, Platform};
use crate::input::device::find_input;
use crate::input::{InputManager, InputSource};
use crate::media::{FirmwarePak, GamePak, Pak};
use crate::settings::{BootSettings, EmulatorSettings, Settings};
use crate::video::Latch;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Minimum interval between two mapping reads of the same button or axis
pub const INPUT_THROTTLE: Duration = Duration::from_millis(5);

/// Delay before a drive notices its new medium
pub const TRAY_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Region families in the order they are tried
const REGION_PRIORITY: [&str; 4] = ["NTSC-U", "NTSC-J", "NTSC", "PAL"];

/// Choose the region to boot a game in
///
/// The user's preference list (`boot.regions`, or `boot.prefer` when the
/// list is empty) wins if the game supports one of its entries, then the
/// fixed NTSC-U, NTSC-J, NTSC, PAL order, then the game's first region.
/// A game without regions boots in the preferred region.
///
/// # Arguments
///
/// * `regions` - Regions the game declares
/// * `boot` - Boot settings
pub fn select_region(regions: &[String], boot: &BootSettings) -> Option<String> {
    let prefer = boot.prefer.trim();
    if regions.is_empty() {
        return (!prefer.is_empty()).then(|| prefer.to_string());
    }

    let preferences: Vec<&str> = if boot.regions.trim().is_empty() {
        vec![prefer]
    } else {
        boot.regions.split(',').map(str::trim).collect()
    };

    preferences
        .into_iter()
        .chain(REGION_PRIORITY)
        .find(|wanted| regions.iter().any(|r| r == wanted))
        .map(str::to_string)
        .or_else(|| regions.first().cloned())
}

/// Resolve a core input poll and write the value back into the node
///
/// Buttons and axes are read at most once per `INPUT_THROTTLE`; in between
/// the node keeps its last value. Rumble nodes push the motor levels the
/// core requested to the bound device on every call.
pub fn dispatch_input(console: &Console, node: &mut CoreInput, manager: &InputManager) {
    if node.kind != InputKind::Rumble {
        let now = Instant::now();
        if node
            .last_poll
            .is_some_and(|last| now.duration_since(last) < INPUT_THROTTLE)
        {
            return;
        }
        node.last_poll = Some(now);
    }

    let Some(input) = find_input(console.ports(), &node.port, &node.device, &node.name) else {
        return;
    };

    match node.kind {
        InputKind::Button => {
            node.value = manager.with_ports(|ports, devices, ctx| input.pressed(ports, devices, ctx))
                as i16;
        }
        InputKind::Axis => {
            node.value = manager.with_ports(|ports, devices, ctx| input.value(ports, devices, ctx));
        }
        InputKind::Rumble => {
            if let InputSource::Single(id) = input.source() {
                manager.rumble(id, node.strong, node.weak);
            }
        }
    }
}

/// Borrowed pieces of a loaded emulator, for running one frame
pub struct Running<'a> {
    pub core: &'a mut dyn Core,
    pub console: &'a Console,
    pub latch: &'a mut Latch,
}

/// A console and the game loaded into it
pub struct Emulator {
    console: Console,
    configuration: EmulatorSettings,
    core: Option<Box<dyn Core>>,
    game: Option<Box<dyn Pak>>,
    system: Option<FirmwarePak>,
    region: Option<String>,
    queue: VecDeque<PathBuf>,
    latch: Latch,
    reconnect: Option<Instant>,
}

impl Emulator {
    /// Create an emulator for a console
    ///
    /// # Example
    ///
    /// ```
    /// use emu_front::emulator::{consoles, Emulator};
    ///
    /// let console = consoles().remove(0);
    /// let emulator = Emulator::new(console, Default::default());
    /// assert!(!emulator.is_loaded());
    /// ```
    pub fn new(console: Console, configuration: EmulatorSettings) -> Self {
        Self {
            console,
            configuration,
            core: None,
            game: None,
            system: None,
            region: None,
            queue: VecDeque::new(),
            latch: Latch::default(),
            reconnect: None,
        }
    }

    pub fn name(&self) -> &str {
        self.console.name()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Persisted per-emulator settings (menu visibility, last game folder)
    pub fn configuration(&self) -> &EmulatorSettings {
        &self.configuration
    }

    pub fn configuration_mut(&mut self) -> &mut EmulatorSettings {
        &mut self.configuration
    }

    /// Queue a location for the next `load`
    pub fn queue(&mut self, location: impl Into<PathBuf>) {
        self.queue.push_back(location.into());
    }

    /// Locations waiting to be loaded
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.core.is_some()
    }

    pub fn core_mut(&mut self) -> Option<&mut (dyn Core + 'static)> {
        self.core.as_deref_mut()
    }

    pub fn game(&self) -> Option<&dyn Pak> {
        self.game.as_deref()
    }

    /// Firmware package of the loaded game
    pub fn system(&self) -> Option<&FirmwarePak> {
        self.system.as_ref()
    }

    /// Location of the loaded game
    pub fn location(&self) -> Option<&Path> {
        self.game.as_ref().map(|game| game.location())
    }

    /// Region the loaded game was booted in
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn latch(&self) -> &Latch {
        &self.latch
    }

    pub fn latch_mut(&mut self) -> &mut Latch {
        &mut self.latch
    }

    /// Split borrows for running a frame, `None` if nothing is loaded
    pub fn running(&mut self) -> Option<Running<'_>> {
        let core = self.core.as_deref_mut()?;
        Some(Running {
            core,
            console: &self.console,
            latch: &mut self.latch,
        })
    }

    /// The core together with the game it runs, for save states
    pub fn loaded(&mut self) -> Option<(&mut (dyn Core + 'static), &dyn Pak)> {
        match (self.core.as_deref_mut(), self.game.as_deref()) {
            (Some(core), Some(game)) => Some((core, game)),
            _ => None,
        }
    }

    /// Load the next queued location
    ///
    /// Takes the location from the queue, then from the command line start
    /// list. On success the core is powered on.
    ///
    /// # Arguments
    ///
    /// * `factory` - Creates the core
    /// * `settings` - Paths, firmware, region preference and core options
    /// * `start` - Locations given on the command line
    ///
    /// # Returns
    ///
    /// `Err` leaves the emulator unloaded
    pub fn load(
        &mut self,
        factory: &dyn CoreFactory,
        settings: &Settings,
        start: &mut VecDeque<PathBuf>,
    ) -> Result<(), LoadError> {
        if self.is_loaded() {
            return Err(LoadError::Other(format!("{} is already loaded", self.name())));
        }
        let location = self
            .queue
            .pop_front()
            .or_else(|| start.pop_front())
            .ok_or(LoadError::NoFileSelected)?;

        let name = self.console.name().to_string();
        let game = GamePak::open(&location, &name, settings.paths.saves.as_deref())?;
        let region = select_region(&game.regions(), &settings.boot);

        let mut system = FirmwarePak::new(&name);
        if let Some(firmware) = self.console.firmware_for(region.as_deref()) {
            let missing = || LoadError::FirmwareMissing {
                system: name.clone(),
                kind: firmware.kind.clone(),
                region: firmware.region.clone(),
            };
            let path = settings
                .firmware_path(&name, &firmware.kind, &firmware.region)
                .ok_or_else(missing)?;
            system.insert(&firmware.kind, &path).map_err(|_| missing())?;
            if let Some(sha256) = &firmware.sha256 {
                log::debug!("{} {}: expecting SHA-256 {}", name, firmware.kind, sha256);
            }
        }

        let mut core = factory.load(&name, &game, &system)?;

        for connection in self.console.connections(&game) {
            let connected = match core.port(&connection.port) {
                Some(port) => {
                    let allocated = port.allocate(&connection.device);
                    if allocated {
                        port.connect();
                    }
                    allocated
                }
                None => false,
            };
            if !connected {
                log::warn!(
                    "{}: could not connect {} to {}",
                    name,
                    connection.device,
                    connection.port
                );
            }
        }

        core.set_boolean("Color Emulation", settings.video.color_emulation);
        core.set_boolean("Fast Boot", settings.boot.fast);
        core.set_boolean("Overscan", settings.video.overscan);
        self.latch.reset();
        core.power(false);

        log::info!(
            "Loaded {} on {} ({})",
            game.name(),
            name,
            region.as_deref().unwrap_or("no region")
        );
        self.configuration.game_path = location.parent().map(Path::to_path_buf);
        self.core = Some(core);
        self.game = Some(Box::new(game));
        self.system = Some(system);
        self.region = region;
        Ok(())
    }

    /// Write battery-backed memory to the game's backing files
    ///
    /// # Returns
    ///
    /// `false` if nothing is loaded
    pub fn save(&mut self) -> bool {
        let (Some(core), Some(game)) = (self.core.as_mut(), self.game.as_ref()) else {
            return false;
        };
        for (name, data) in core.save() {
            if let Err(e) = game.write(&name, &data) {
                log::warn!("Could not write {}: {}", game.save_path(&name).display(), e);
            }
        }
        true
    }

    /// Save, then release the core, the game and the firmware
    ///
    /// Does nothing but clear the queue when nothing is loaded.
    pub fn unload(&mut self, platform: &mut dyn Platform) {
        if self.is_loaded() {
            self.save();
            if let Some(mut core) = self.core.take() {
                core.unload(platform);
            }
            log::info!("Unloaded {}", self.name());
        }
        self.game = None;
        self.system = None;
        self.region = None;
        self.queue.clear();
        self.reconnect = None;
        self.latch.reset();
    }

    /// Power cycle (or reset) the loaded core
    pub fn power(&mut self, reset: bool) -> bool {
        match self.core.as_mut() {
            Some(core) => {
                core.power(reset);
                true
            }
            None => false,
        }
    }

    /// Resolve a core input poll
    pub fn input(&self, node: &mut CoreInput, manager: &InputManager) {
        dispatch_input(&self.console, node, manager);
    }

    /// Swap the medium in the drive
    ///
    /// Once the core accepts the medium the tray is disconnected and then
    /// reconnected by `poll_deferred` after `TRAY_RECONNECT_DELAY`. A
    /// rejected medium leaves the tray as it was.
    pub fn change_medium(&mut self, location: &Path, settings: &Settings) -> Result<(), LoadError> {
        let tray = self
            .console
            .tray_port()
            .map(str::to_string)
            .ok_or_else(|| LoadError::Other(format!("{} has no drive", self.name())))?;
        if !self.is_loaded() {
            return Err(LoadError::Other("nothing is loaded".to_string()));
        }

        self.save();
        let game = GamePak::open(location, self.console.name(), settings.paths.saves.as_deref())?;
        let Some(core) = self.core.as_mut() else {
            return Err(LoadError::Other("nothing is loaded".to_string()));
        };
        if !core.change_medium(&game) {
            return Err(LoadError::InvalidRom(location.display().to_string()));
        }
        if let Some(port) = core.port(&tray) {
            port.disconnect();
        }
        self.reconnect = Some(Instant::now() + TRAY_RECONNECT_DELAY);

        log::info!("Inserted {}", game.name());
        self.game = Some(Box::new(game));
        Ok(())
    }

    /// Whether a tray reconnect is pending
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Run timers that are due; called from the emulation thread
    ///
    /// # Returns
    ///
    /// `true` if the tray was reconnected
    pub fn poll_deferred(&mut self, now: Instant) -> bool {
        if !self.reconnect.is_some_and(|at| now >= at) {
            return false;
        }
        self.reconnect = None;

        let Some(tray) = self.console.tray_port() else {
            return false;
        };
        let device = self.console.default_device(tray).unwrap_or_default();
        let Some(port) = self.core.as_mut().and_then(|core| core.port(tray)) else {
            return false;
        };
        if port.allocate(device) {
            port.connect();
            log::debug!("{} reconnected", tray);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::blank::BlankSystem;
    use crate::engine::{AudioStream, BlankFactory, Node, Screen};
    use crate::input::binding::{Assignment, Qualifier};
    use crate::input::hid::{joypad, keyboard, DeviceKind, HidDevice};
    use crate::input::keyboard::KEYBOARD_ID;
    use crate::input::virtual_port::KEYBOARD_KEYS;
    use crate::input::{BindTarget, MappingId, PadControl, ScriptedDriver};
    use std::fs;
    use std::sync::Arc;

    struct NullPlatform;

    impl Platform for NullPlatform {
        fn attach(&mut self, _node: &Node) {}
        fn detach(&mut self, _node: &Node) {}
        fn video(&mut self, _screen: &Screen, _pixels: &[u32], _pitch: usize, _w: u32, _h: u32) {}
        fn audio(&mut self, _streams: &mut [AudioStream]) {}
        fn input(&mut self, _input: &mut CoreInput) {}
    }

    fn console(name: &str) -> Console {
        consoles().into_iter().find(|c| c.name() == name).unwrap()
    }

    fn write_game(dir: &tempfile::TempDir, file: &str, manifest: Option<&str>) -> PathBuf {
        let path = dir.path().join(file);
        fs::write(&path, b"test program").unwrap();
        if let Some(manifest) = manifest {
            fs::write(dir.path().join(format!("{}.toml", file)), manifest).unwrap();
        }
        path
    }

    fn boot(prefer: &str, regions: &str) -> BootSettings {
        BootSettings {
            prefer: prefer.to_string(),
            regions: regions.to_string(),
            ..BootSettings::default()
        }
    }

    fn list(regions: &[&str]) -> Vec<String> {
        regions.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_select_region() {
        let all = list(&["PAL", "NTSC-J", "NTSC-U"]);
        assert_eq!(select_region(&all, &boot("PAL", "")), Some("PAL".to_string()));
        assert_eq!(select_region(&all, &boot("", "")), Some("NTSC-U".to_string()));
        assert_eq!(
            select_region(&all, &boot("PAL", "NTSC-J, NTSC-U")),
            Some("NTSC-J".to_string())
        );
        assert_eq!(
            select_region(&list(&["PAL", "NTSC"]), &boot("NTSC-J", "")),
            Some("NTSC".to_string())
        );
        assert_eq!(
            select_region(&list(&["KOR"]), &boot("NTSC-U", "")),
            Some("KOR".to_string())
        );
        assert_eq!(select_region(&[], &boot("PAL", "")), Some("PAL".to_string()));
        assert_eq!(select_region(&[], &boot("", "")), None);
    }

    #[test]
    fn test_load_save_unload() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_game(&dir, "game.nes", None);
        let consoles = consoles();
        let factory = blank_factory(&consoles);
        let settings = Settings::default();

        let mut emulator = Emulator::new(console("Famicom"), EmulatorSettings::default());
        emulator.queue(&location);
        emulator
            .load(&factory, &settings, &mut VecDeque::new())
            .unwrap();
        assert!(emulator.is_loaded());
        assert_eq!(emulator.location(), Some(location.as_path()));
        assert_eq!(emulator.configuration().game_path.as_deref(), Some(dir.path()));

        let core = emulator.core_mut().unwrap();
        assert_eq!(core.name(), "Famicom");
        assert!(emulator.save());
        assert!(dir.path().join("game.sav").exists());

        emulator.queue(&location);
        emulator.unload(&mut NullPlatform);
        assert!(!emulator.is_loaded());
        assert!(emulator.game().is_none());
        assert!(emulator.system().is_none());
        assert_eq!(emulator.queued(), 0);

        emulator.unload(&mut NullPlatform);
        assert!(!emulator.save());
    }

    #[test]
    fn test_load_takes_start_list_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_game(&dir, "game.gb", None);
        let factory = blank_factory(&consoles());
        let settings = Settings::default();
        let mut start = VecDeque::from(vec![location]);

        let mut emulator = Emulator::new(console("Game Boy"), EmulatorSettings::default());
        emulator.load(&factory, &settings, &mut start).unwrap();
        assert!(start.is_empty());
        emulator.unload(&mut NullPlatform);

        assert_eq!(
            emulator.load(&factory, &settings, &mut start),
            Err(LoadError::NoFileSelected)
        );
        emulator.queue(dir.path().join("missing.gb"));
        assert!(matches!(
            emulator.load(&factory, &settings, &mut start),
            Err(LoadError::RomNotFound(_))
        ));
        assert!(!emulator.is_loaded());
    }

    #[test]
    fn test_firmware_missing_then_found() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_game(&dir, "disc.cue", Some("region = \"NTSC-J\"\n"));
        let factory = blank_factory(&consoles());
        let mut settings = Settings::default();

        let mut emulator = Emulator::new(console("PlayStation"), EmulatorSettings::default());
        emulator.queue(&location);
        assert_eq!(
            emulator.load(&factory, &settings, &mut VecDeque::new()),
            Err(LoadError::FirmwareMissing {
                system: "PlayStation".to_string(),
                kind: "BIOS".to_string(),
                region: "Japan".to_string(),
            })
        );
        assert!(!emulator.is_loaded());

        let bios = dir.path().join("scph5500.bin");
        fs::write(&bios, [0x13; 64]).unwrap();
        settings
            .firmware
            .insert(Settings::firmware_key("PlayStation", "BIOS", "Japan"), bios);
        emulator.queue(&location);
        emulator
            .load(&factory, &settings, &mut VecDeque::new())
            .unwrap();
        assert_eq!(emulator.region(), Some("NTSC-J"));

        let core = emulator.core_mut().unwrap();
        assert_eq!(
            core.port("Controller Port 1").and_then(|p| p.connected().map(str::to_string)),
            Some("Digital Gamepad".to_string())
        );
        assert_eq!(
            core.port("Memory Card Port 1").and_then(|p| p.connected().map(str::to_string)),
            Some("Memory Card".to_string())
        );
    }

    #[test]
    fn test_change_medium_reconnects_later() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_game(&dir, "disc1.cue", Some("region = \"NTSC-U\"\n"));
        let second = write_game(&dir, "disc2.cue", Some("region = \"NTSC-U\"\n"));
        let bios = dir.path().join("scph1001.bin");
        fs::write(&bios, [0x42; 64]).unwrap();
        let mut settings = Settings::default();
        settings
            .firmware
            .insert(Settings::firmware_key("PlayStation", "BIOS", "US"), bios);
        let factory = blank_factory(&consoles());

        let mut emulator = Emulator::new(console("PlayStation"), EmulatorSettings::default());
        emulator.queue(&first);
        emulator
            .load(&factory, &settings, &mut VecDeque::new())
            .unwrap();

        emulator.change_medium(&second, &settings).unwrap();
        assert_eq!(emulator.location(), Some(second.as_path()));
        let tray = |emulator: &mut Emulator| {
            emulator
                .core_mut()
                .and_then(|core| core.port("PlayStation/Disc Tray"))
                .and_then(|port| port.connected().map(str::to_string))
        };
        assert_eq!(tray(&mut emulator), None);

        assert!(!emulator.poll_deferred(Instant::now()));
        assert!(emulator.reconnect_pending());
        assert!(emulator.poll_deferred(Instant::now() + TRAY_RECONNECT_DELAY));
        assert_eq!(tray(&mut emulator), Some("Disc".to_string()));
        assert!(!emulator.reconnect_pending());
    }

    #[test]
    fn test_rejected_medium_keeps_the_tray_closed() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_game(&dir, "disc1.cue", Some("region = \"NTSC-U\"\n"));
        let second = write_game(&dir, "disc2.cue", Some("region = \"NTSC-U\"\n"));
        let bios = dir.path().join("scph1001.bin");
        fs::write(&bios, [0x42; 64]).unwrap();
        let mut settings = Settings::default();
        settings
            .firmware
            .insert(Settings::firmware_key("PlayStation", "BIOS", "US"), bios);

        // A core build without hot swapping refuses every disc change
        let playstation = console("PlayStation");
        let system = BlankSystem {
            hot_swap: false,
            ..playstation.core_system()
        };
        let factory = BlankFactory::new().system("PlayStation", system);

        let mut emulator = Emulator::new(playstation, EmulatorSettings::default());
        emulator.queue(&first);
        emulator
            .load(&factory, &settings, &mut VecDeque::new())
            .unwrap();

        assert!(matches!(
            emulator.change_medium(&second, &settings),
            Err(LoadError::InvalidRom(_))
        ));
        assert_eq!(emulator.location(), Some(first.as_path()));
        assert!(!emulator.reconnect_pending());
        let tray = emulator
            .core_mut()
            .and_then(|core| core.port("PlayStation/Disc Tray"))
            .and_then(|port| port.connected().map(str::to_string));
        assert_eq!(tray, Some("Disc".to_string()));
    }

    #[test]
    fn test_change_medium_needs_a_drive() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_game(&dir, "game.sfc", None);
        let mut emulator = Emulator::new(console("Super Famicom"), EmulatorSettings::default());
        assert!(emulator
            .change_medium(&location, &Settings::default())
            .is_err());
    }

    #[test]
    fn test_input_dispatch() {
        let (driver, handle) = ScriptedDriver::new();
        let manager = InputManager::new(Box::new(driver));
        handle.connect(Arc::new(HidDevice::keyboard(KEYBOARD_ID, "Keyboard", KEYBOARD_KEYS)));
        handle.connect(Arc::new(
            HidDevice::new(DeviceKind::Joypad, 0x30, "Pad")
                .with_group("Axis", &["LX", "LY"])
                .with_group("Hat", &[])
                .with_group("Trigger", &[])
                .with_group("Button", &["South"]),
        ));
        manager.poll(true);

        let z = KEYBOARD_KEYS.iter().position(|k| *k == "Z").unwrap() as u32;
        manager.bind_assignment(
            BindTarget::Port(MappingId::pad(0, PadControl::South)),
            0,
            Assignment::new(KEYBOARD_ID, keyboard::BUTTON, z, Qualifier::None),
        );
        manager.bind_assignment(
            BindTarget::Port(MappingId::pad(0, PadControl::LStickLeft)),
            0,
            Assignment::new(0x30, joypad::AXIS, 0, Qualifier::Lo),
        );
        manager.bind_assignment(
            BindTarget::Port(MappingId::pad(0, PadControl::LStickRight)),
            0,
            Assignment::new(0x30, joypad::AXIS, 0, Qualifier::Hi),
        );

        let emulator = Emulator::new(console("PlayStation"), EmulatorSettings::default());
        let mut cross = CoreInput::new("Controller Port 1", "DualShock", "Cross", InputKind::Button);
        handle.set(KEYBOARD_ID, keyboard::BUTTON, z, 1);
        emulator.input(&mut cross, &manager);
        assert_eq!(cross.value, 1);

        // Within the throttle window the last value is kept
        handle.set(KEYBOARD_ID, keyboard::BUTTON, z, 0);
        cross.last_poll = Some(Instant::now() + Duration::from_secs(60));
        emulator.input(&mut cross, &manager);
        assert_eq!(cross.value, 1);
        cross.last_poll = None;
        emulator.input(&mut cross, &manager);
        assert_eq!(cross.value, 0);

        let mut stick = CoreInput::new("Controller Port 1", "DualShock", "L-Stick X", InputKind::Axis);
        handle.set(0x30, joypad::AXIS, 0, -20000);
        emulator.input(&mut stick, &manager);
        assert!(stick.value < 0);

        let mut unknown = CoreInput::new("Controller Port 9", "DualShock", "Cross", InputKind::Button);
        unknown.value = 7;
        emulator.input(&mut unknown, &manager);
        assert_eq!(unknown.value, 7);
    }

    #[test]
    fn test_rumble_dispatch_is_not_throttled() {
        let (driver, handle) = ScriptedDriver::new();
        let manager = InputManager::new(Box::new(driver));
        handle.connect(Arc::new(
            HidDevice::new(DeviceKind::Joypad, 0x40, "Pad")
                .with_group("Axis", &[])
                .with_group("Hat", &[])
                .with_group("Trigger", &[])
                .with_group("Button", &["South"]),
        ));
        manager.poll(true);
        manager.bind_assignment(
            BindTarget::Port(MappingId::pad(0, PadControl::Rumble)),
            0,
            Assignment::new(0x40, joypad::BUTTON, 0, Qualifier::Rumble),
        );

        let emulator = Emulator::new(console("Nintendo 64"), EmulatorSettings::default());
        let mut motor = CoreInput::new("Controller Port 1", "Gamepad", "Rumble", InputKind::Rumble);
        motor.strong = 1000;
        motor.weak = 500;
        emulator.input(&mut motor, &manager);
        emulator.input(&mut motor, &manager);
        assert_eq!(handle.rumbles(), vec![(0x40, 1000, 500), (0x40, 1000, 500)]);
    }
}
