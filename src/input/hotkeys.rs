// Front-end hotkeys
//
// Hotkeys are digital mappings that drive the front-end instead of the
// emulated console. They are polled once per UI tick and report edges:
// a press when the value goes 0 -> 1, a release when it goes 1 -> 0.

use super::hid::DeviceTable;
use super::mapping::{InputMapping, MappingContext, MappingKind};

/// Actions that can be bound to a hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    ToggleFullscreen,
    ToggleMouseCapture,
    ToggleKeyboardCapture,
    FastForward,
    Rewind,
    FrameAdvance,
    CaptureScreenshot,
    SaveState,
    LoadState,
    UndoSaveState,
    UndoLoadState,
    DecrementStateSlot,
    IncrementStateSlot,
    PauseEmulation,
    ResetSystem,
    ReloadGame,
    QuitEmulator,
    MuteAudio,
    DecreaseVolume,
    IncreaseVolume,
    ToggleShader,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 21] = [
        HotkeyAction::ToggleFullscreen,
        HotkeyAction::ToggleMouseCapture,
        HotkeyAction::ToggleKeyboardCapture,
        HotkeyAction::FastForward,
        HotkeyAction::Rewind,
        HotkeyAction::FrameAdvance,
        HotkeyAction::CaptureScreenshot,
        HotkeyAction::SaveState,
        HotkeyAction::LoadState,
        HotkeyAction::UndoSaveState,
        HotkeyAction::UndoLoadState,
        HotkeyAction::DecrementStateSlot,
        HotkeyAction::IncrementStateSlot,
        HotkeyAction::PauseEmulation,
        HotkeyAction::ResetSystem,
        HotkeyAction::ReloadGame,
        HotkeyAction::QuitEmulator,
        HotkeyAction::MuteAudio,
        HotkeyAction::DecreaseVolume,
        HotkeyAction::IncreaseVolume,
        HotkeyAction::ToggleShader,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HotkeyAction::ToggleFullscreen => "Toggle Fullscreen",
            HotkeyAction::ToggleMouseCapture => "Toggle Mouse Capture",
            HotkeyAction::ToggleKeyboardCapture => "Toggle Keyboard Capture",
            HotkeyAction::FastForward => "Fast Forward",
            HotkeyAction::Rewind => "Rewind",
            HotkeyAction::FrameAdvance => "Frame Advance",
            HotkeyAction::CaptureScreenshot => "Capture Screenshot",
            HotkeyAction::SaveState => "Save State",
            HotkeyAction::LoadState => "Load State",
            HotkeyAction::UndoSaveState => "Undo Save State",
            HotkeyAction::UndoLoadState => "Undo Load State",
            HotkeyAction::DecrementStateSlot => "Decrement State Slot",
            HotkeyAction::IncrementStateSlot => "Increment State Slot",
            HotkeyAction::PauseEmulation => "Pause Emulation",
            HotkeyAction::ResetSystem => "Reset System",
            HotkeyAction::ReloadGame => "Reload Game",
            HotkeyAction::QuitEmulator => "Quit Emulator",
            HotkeyAction::MuteAudio => "Mute Audio",
            HotkeyAction::DecreaseVolume => "Decrease Volume",
            HotkeyAction::IncreaseVolume => "Increase Volume",
            HotkeyAction::ToggleShader => "Toggle Shader",
        }
    }

    /// Stable key used in the settings file
    pub fn settings_key(self) -> String {
        format!("hotkey/{}", self.name())
    }
}

/// A pressed or released hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyEvent {
    pub action: HotkeyAction,
    pub pressed: bool,
}

#[derive(Debug, Clone)]
pub struct Hotkey {
    action: HotkeyAction,
    mapping: InputMapping,
    state: bool,
}

impl Hotkey {
    pub fn new(action: HotkeyAction) -> Self {
        Self {
            action,
            mapping: InputMapping::new(action.name(), MappingKind::Hotkey),
            state: false,
        }
    }

    pub fn action(&self) -> HotkeyAction {
        self.action
    }

    pub fn mapping(&self) -> &InputMapping {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut InputMapping {
        &mut self.mapping
    }

    /// Read the mapping and report an edge, if any
    pub fn poll(&mut self, devices: &DeviceTable, ctx: &MappingContext) -> Option<HotkeyEvent> {
        let state = self.mapping.value(devices, ctx) != 0;
        if state == self.state {
            return None;
        }
        self.state = state;
        Some(HotkeyEvent {
            action: self.action,
            pressed: state,
        })
    }
}

/// All hotkeys, one per action
pub fn hotkey_table() -> Vec<Hotkey> {
    HotkeyAction::ALL.iter().map(|&action| Hotkey::new(action)).collect()
}
