// Gamepad input
//
// Joypads enumerated through gilrs. gilrs lives on its own thread (its
// context is not guaranteed to be `Send` on every platform); the thread
// forwards connection and value changes over a channel and receives rumble
// requests back. Each connected gamepad becomes a joypad `HidDevice` with
// the standard Axis/Hat/Trigger/Button groups.

use super::driver::InputEvent;
use super::hid::{joypad, DeviceKind, HidDevice};
use super::keyboard::update;
use gilrs::ff::{BaseEffect, BaseEffectType, Effect, EffectBuilder};
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

const AXES: &[&str] = &["LeftStickX", "LeftStickY", "RightStickX", "RightStickY"];
const HATS: &[&str] = &["X", "Y"];
const TRIGGERS: &[&str] = &["L2", "R2"];
const BUTTONS: &[&str] = &[
    "South",
    "East",
    "North",
    "West",
    "L1",
    "R1",
    "Select",
    "Start",
    "Mode",
    "LeftThumb",
    "RightThumb",
    "DPadUp",
    "DPadDown",
    "DPadLeft",
    "DPadRight",
];

/// How long the gamepad thread sleeps when gilrs has no events
const IDLE_SLEEP: Duration = Duration::from_millis(2);

#[derive(Debug, Error)]
pub enum GamepadError {
    #[error("gamepad support unavailable: {0}")]
    Init(String),
    #[error("failed to spawn gamepad thread: {0}")]
    Thread(#[from] std::io::Error),
}

fn button_index(button: Button) -> Option<u32> {
    let index = match button {
        Button::South => 0,
        Button::East => 1,
        Button::North => 2,
        Button::West => 3,
        Button::LeftTrigger => 4,
        Button::RightTrigger => 5,
        Button::Select => 6,
        Button::Start => 7,
        Button::Mode => 8,
        Button::LeftThumb => 9,
        Button::RightThumb => 10,
        Button::DPadUp => 11,
        Button::DPadDown => 12,
        Button::DPadLeft => 13,
        Button::DPadRight => 14,
        _ => return None,
    };
    Some(index)
}

/// Where a gilrs axis lands in the joypad layout: (group, input, invert)
fn axis_target(axis: Axis) -> Option<(u32, u32, bool)> {
    // gilrs reports up as positive
    match axis {
        Axis::LeftStickX => Some((joypad::AXIS, 0, false)),
        Axis::LeftStickY => Some((joypad::AXIS, 1, true)),
        Axis::RightStickX => Some((joypad::AXIS, 2, false)),
        Axis::RightStickY => Some((joypad::AXIS, 3, true)),
        Axis::DPadX => Some((joypad::HAT, 0, false)),
        Axis::DPadY => Some((joypad::HAT, 1, true)),
        Axis::LeftZ => Some((joypad::TRIGGER, 0, false)),
        Axis::RightZ => Some((joypad::TRIGGER, 1, false)),
        _ => None,
    }
}

fn scale(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

enum Message {
    Connected { index: usize, id: u64, name: String },
    Disconnected { index: usize },
    Value { index: usize, group: u32, input: u32, value: i16 },
}

enum Command {
    Rumble { index: usize, strong: u16, weak: u16 },
    Quit,
}

/// All gamepads currently known to gilrs
pub struct Gamepads {
    pads: BTreeMap<usize, Arc<HidDevice>>,
    messages: Receiver<Message>,
    commands: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl Gamepads {
    /// Start the gamepad thread
    pub fn new() -> Result<Self, GamepadError> {
        let (message_tx, messages) = mpsc::channel();
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("gamepads".to_string())
            .spawn(move || match Gilrs::new() {
                Ok(gilrs) => {
                    let _ = ready_tx.send(Ok(()));
                    GamepadThread::new(gilrs, message_tx).run(command_rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                pads: BTreeMap::new(),
                messages,
                commands,
                thread: Some(thread),
            }),
            Ok(Err(e)) => Err(GamepadError::Init(e)),
            Err(_) => Err(GamepadError::Init("gamepad thread exited".to_string())),
        }
    }

    pub fn devices(&self) -> Vec<Arc<HidDevice>> {
        self.pads.values().cloned().collect()
    }

    /// Apply everything the gamepad thread reported since the last poll
    pub fn poll(&mut self, events: &mut Vec<InputEvent>) {
        while let Ok(message) = self.messages.try_recv() {
            match message {
                Message::Connected { index, id, name } => {
                    log::info!("Gamepad '{}' connected (0x{:x})", name, id);
                    let device = HidDevice::new(DeviceKind::Joypad, id, &name)
                        .with_group("Axis", AXES)
                        .with_group("Hat", HATS)
                        .with_group("Trigger", TRIGGERS)
                        .with_group("Button", BUTTONS);
                    self.pads.insert(index, Arc::new(device));
                }
                Message::Disconnected { index } => {
                    if let Some(device) = self.pads.remove(&index) {
                        log::info!("Gamepad '{}' disconnected", device.name());
                    }
                }
                Message::Value {
                    index,
                    group,
                    input,
                    value,
                } => {
                    if let Some(device) = self.pads.get(&index) {
                        update(device, group, input, value, events);
                    }
                }
            }
        }
    }

    /// Start, update or stop (`strong == weak == 0`) the rumble of a gamepad
    pub fn rumble(&mut self, device_id: u64, strong: u16, weak: u16) -> bool {
        let Some(index) = self
            .pads
            .iter()
            .find(|(_, device)| device.id() == device_id)
            .map(|(index, _)| *index)
        else {
            return false;
        };
        self.commands
            .send(Command::Rumble {
                index,
                strong,
                weak,
            })
            .is_ok()
    }
}

impl Drop for Gamepads {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Quit);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct GamepadThread {
    gilrs: Gilrs,
    messages: Sender<Message>,
    effects: HashMap<usize, Effect>,
}

impl GamepadThread {
    fn new(gilrs: Gilrs, messages: Sender<Message>) -> Self {
        Self {
            gilrs,
            messages,
            effects: HashMap::new(),
        }
    }

    fn run(mut self, commands: Receiver<Command>) {
        let connected: Vec<GamepadId> = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, _)| id)
            .collect();
        if connected.is_empty() {
            log::info!("No gamepads detected");
        }
        for id in connected {
            self.connected(id);
        }

        loop {
            while let Ok(command) = commands.try_recv() {
                match command {
                    Command::Rumble {
                        index,
                        strong,
                        weak,
                    } => self.rumble(index, strong, weak),
                    Command::Quit => return,
                }
            }

            let mut idle = true;
            while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
                idle = false;
                if !self.event(id, event) {
                    return;
                }
            }
            if idle {
                thread::sleep(IDLE_SLEEP);
            }
        }
    }

    fn send(&self, message: Message) -> bool {
        self.messages.send(message).is_ok()
    }

    fn connected(&mut self, id: GamepadId) -> bool {
        let index: usize = id.into();
        let gamepad = self.gilrs.gamepad(id);
        let vendor = gamepad.vendor_id().unwrap_or(0) as u64;
        let product = gamepad.product_id().unwrap_or(0) as u64;
        let device_id = (vendor << 32) | (product << 16) | (index as u64 & 0xffff);
        self.send(Message::Connected {
            index,
            id: device_id,
            name: gamepad.name().to_string(),
        })
    }

    /// Forward one gilrs event; returns `false` once the receiver is gone
    fn event(&mut self, id: GamepadId, event: EventType) -> bool {
        let index: usize = id.into();
        let value = |group, input, value| Message::Value {
            index,
            group,
            input,
            value,
        };

        match event {
            EventType::Connected => self.connected(id),
            EventType::Disconnected => {
                self.effects.remove(&index);
                self.send(Message::Disconnected { index })
            }
            EventType::ButtonPressed(button, _) => match button_index(button) {
                Some(input) => self.send(value(joypad::BUTTON, input, 1)),
                None => true,
            },
            EventType::ButtonReleased(button, _) => match button_index(button) {
                Some(input) => self.send(value(joypad::BUTTON, input, 0)),
                None => true,
            },
            EventType::ButtonChanged(Button::LeftTrigger2, v, _) => {
                self.send(value(joypad::TRIGGER, 0, scale(v)))
            }
            EventType::ButtonChanged(Button::RightTrigger2, v, _) => {
                self.send(value(joypad::TRIGGER, 1, scale(v)))
            }
            EventType::AxisChanged(axis, v, _) => match axis_target(axis) {
                Some((group, input, invert)) => {
                    let v = if invert { -v } else { v };
                    self.send(value(group, input, scale(v)))
                }
                None => true,
            },
            _ => true,
        }
    }

    fn rumble(&mut self, index: usize, strong: u16, weak: u16) {
        if let Some(effect) = self.effects.remove(&index) {
            if let Err(e) = effect.stop() {
                log::debug!("Failed to stop rumble: {}", e);
            }
        }
        if strong == 0 && weak == 0 {
            return;
        }

        let Some(id) = self
            .gilrs
            .gamepads()
            .map(|(id, _)| id)
            .find(|id| usize::from(*id) == index)
        else {
            return;
        };
        if !self.gilrs.gamepad(id).is_ff_supported() {
            return;
        }

        let effect = EffectBuilder::new()
            .add_effect(BaseEffect {
                kind: BaseEffectType::Strong { magnitude: strong },
                ..Default::default()
            })
            .add_effect(BaseEffect {
                kind: BaseEffectType::Weak { magnitude: weak },
                ..Default::default()
            })
            .gamepads(&[id])
            .finish(&mut self.gilrs);

        match effect {
            Ok(effect) => match effect.play() {
                Ok(()) => {
                    self.effects.insert(index, effect);
                }
                Err(e) => log::warn!("Failed to play rumble: {}", e),
            },
            Err(e) => log::warn!("Failed to build rumble effect: {}", e),
        }
    }
}
