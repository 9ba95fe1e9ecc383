// Input manager
//
// Owns the input driver, the list of enumerated physical devices, the
// virtual ports and the hotkeys. Polling is rate limited; whenever the
// device list changes every mapping is re-resolved and observers are told
// to refresh their binding displays.
//
// All state lives behind a reentrant mutex so a UI callback triggered from
// inside a poll (e.g. a bind-capture dialog rebinding another slot) can
// call back into the manager on the same thread.

use super::binding::{format_assignments, parse_assignments, Assignment, BINDING_LIMIT};
use super::driver::{InputDriver, InputEvent};
use super::hid::{DeviceTable, HidDevice};
use super::hotkeys::{hotkey_table, Hotkey, HotkeyAction, HotkeyEvent};
use super::mapping::{InputMapping, MappingContext};
use super::virtual_port::{MappingId, VirtualPorts};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default minimum interval between two hardware polls
pub const DEFAULT_POLL_FREQUENCY: Duration = Duration::from_millis(5);

/// Receives raw input transitions and binding refresh notifications
pub trait InputObserver: Send {
    /// Called for every raw input transition seen during a poll
    fn event_input(&mut self, event: &InputEvent);

    /// Called after bindings were re-resolved or a capture completed
    fn refresh(&mut self) {}
}

/// A mapping that can be the target of a bind capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindTarget {
    Port(MappingId),
    Hotkey(HotkeyAction),
}

impl BindTarget {
    pub fn settings_key(&self) -> String {
        match self {
            BindTarget::Port(id) => id.settings_key(),
            BindTarget::Hotkey(action) => action.settings_key(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Capture {
    target: BindTarget,
    index: usize,
}

struct InputState {
    driver: Box<dyn InputDriver>,
    devices: DeviceTable,
    ports: VirtualPorts,
    hotkeys: Vec<Hotkey>,
    context: MappingContext,
    poll_frequency: Duration,
    last_poll: Option<Instant>,
    capture: Option<Capture>,
    observers: Vec<Box<dyn InputObserver>>,
    refreshes: u64,
}

impl InputState {
    fn mapping(&self, target: BindTarget) -> Option<&InputMapping> {
        match target {
            BindTarget::Port(id) => self.ports.mapping(id),
            BindTarget::Hotkey(action) => self
                .hotkeys
                .iter()
                .find(|h| h.action() == action)
                .map(Hotkey::mapping),
        }
    }

    fn mapping_mut(&mut self, target: BindTarget) -> Option<&mut InputMapping> {
        match target {
            BindTarget::Port(id) => self.ports.mapping_mut(id),
            BindTarget::Hotkey(action) => self
                .hotkeys
                .iter_mut()
                .find(|h| h.action() == action)
                .map(Hotkey::mapping_mut),
        }
    }

    fn targets(&self) -> Vec<BindTarget> {
        let mut targets: Vec<BindTarget> =
            self.ports.ids().into_iter().map(BindTarget::Port).collect();
        targets.extend(self.hotkeys.iter().map(|h| BindTarget::Hotkey(h.action())));
        targets
    }

    fn bind_all(&mut self) {
        self.ports.bind(&self.devices);
        for hotkey in &mut self.hotkeys {
            hotkey.mapping_mut().bind(&self.devices);
        }
    }
}

/// Owner of the physical devices and all input mappings
pub struct InputManager {
    state: ReentrantMutex<RefCell<InputState>>,
}

impl InputManager {
    /// Create a manager around a driver
    ///
    /// The device list is empty until the first poll.
    pub fn new(driver: Box<dyn InputDriver>) -> Self {
        log::info!("Input driver: {}", driver.name());
        Self {
            state: ReentrantMutex::new(RefCell::new(InputState {
                driver,
                devices: DeviceTable::new(),
                ports: VirtualPorts::new(),
                hotkeys: hotkey_table(),
                context: MappingContext::default(),
                poll_frequency: DEFAULT_POLL_FREQUENCY,
                last_poll: None,
                capture: None,
                observers: Vec::new(),
                refreshes: 0,
            })),
        }
    }

    /// Run a closure with shared access to the state
    fn read<R>(&self, f: impl FnOnce(&InputState) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    /// Run a closure with exclusive access to the state
    ///
    /// The borrow is released before the closure's result is returned, so
    /// callers must not call back into the manager from inside `f`.
    fn write<R>(&self, f: impl FnOnce(&mut InputState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Call every observer with the state borrow released
    fn notify(&self, f: impl Fn(&mut dyn InputObserver)) {
        let guard = self.state.lock();
        let mut observers = std::mem::take(&mut guard.borrow_mut().observers);
        for observer in &mut observers {
            f(&mut **observer);
        }
        // Observers registered during the callbacks go after the existing ones
        let mut state = guard.borrow_mut();
        observers.append(&mut state.observers);
        state.observers = observers;
    }

    pub fn set_poll_frequency(&self, frequency: Duration) {
        self.write(|s| s.poll_frequency = frequency);
    }

    pub fn poll_frequency(&self) -> Duration {
        self.read(|s| s.poll_frequency)
    }

    pub fn add_observer(&self, observer: Box<dyn InputObserver>) {
        self.write(|s| s.observers.push(observer));
    }

    /// Poll the driver
    ///
    /// Does nothing if the previous poll was less than the poll frequency
    /// ago, unless `force` is set.
    ///
    /// # Returns
    /// `true` if the driver was actually polled
    pub fn poll(&self, force: bool) -> bool {
        let guard = self.state.lock();
        let mut events = Vec::new();

        let topology_changed = {
            let mut state = guard.borrow_mut();
            let now = Instant::now();
            if let Some(last) = state.last_poll {
                if !force && now.duration_since(last) < state.poll_frequency {
                    return false;
                }
            }
            state.last_poll = Some(now);

            let devices = state.driver.poll(&mut events);
            state.context.mouse_acquired = state.driver.acquired();
            let changed = state.devices.replace(devices);
            if changed {
                log::info!(
                    "Input devices changed ({} connected), rebinding",
                    state.devices.len()
                );
                state.bind_all();
                state.refreshes += 1;
            }
            changed
        };

        if topology_changed {
            self.notify(|observer| observer.refresh());
        }

        for event in &events {
            self.event_input(event);
        }
        true
    }

    /// Relay a raw transition to the bind capture and to observers
    pub fn event_input(&self, event: &InputEvent) {
        let captured = self.write(|state| {
            let Some(capture) = state.capture else {
                return false;
            };
            let InputState {
                devices,
                ports,
                hotkeys,
                ..
            } = state;
            let mapping = match capture.target {
                BindTarget::Port(id) => ports.mapping_mut(id),
                BindTarget::Hotkey(action) => hotkeys
                    .iter_mut()
                    .find(|h| h.action() == action)
                    .map(Hotkey::mapping_mut),
            };
            let Some(mapping) = mapping else {
                state.capture = None;
                return false;
            };
            let consumed = mapping.capture(
                capture.index,
                &event.device,
                event.group,
                event.input,
                event.old_value,
                event.new_value,
                devices,
            );
            if consumed {
                state.capture = None;
                state.refreshes += 1;
            }
            consumed
        });

        self.notify(|observer| observer.event_input(event));
        if captured {
            self.notify(|observer| observer.refresh());
        }
    }

    /// Start a "press a button to bind" capture for one slot
    pub fn begin_capture(&self, target: BindTarget, index: usize) {
        if index >= BINDING_LIMIT {
            return;
        }
        self.write(|s| s.capture = Some(Capture { target, index }));
    }

    pub fn cancel_capture(&self) {
        self.write(|s| s.capture = None);
    }

    pub fn capturing(&self) -> bool {
        self.read(|s| s.capture.is_some())
    }

    /// Re-resolve every mapping against the current device list
    pub fn bind(&self) {
        self.write(InputState::bind_all);
    }

    /// Assign one slot of a mapping
    pub fn bind_assignment(&self, target: BindTarget, index: usize, assignment: Assignment) -> bool {
        self.write(|state| {
            let InputState {
                devices,
                ports,
                hotkeys,
                ..
            } = state;
            let mapping = match target {
                BindTarget::Port(id) => ports.mapping_mut(id),
                BindTarget::Hotkey(action) => hotkeys
                    .iter_mut()
                    .find(|h| h.action() == action)
                    .map(Hotkey::mapping_mut),
            };
            match mapping {
                Some(mapping) => {
                    mapping.bind_assignment(index, assignment, devices);
                    true
                }
                None => false,
            }
        })
    }

    pub fn unbind(&self, target: BindTarget) {
        self.write(|s| {
            if let Some(mapping) = s.mapping_mut(target) {
                mapping.unbind();
            }
        });
    }

    pub fn unbind_slot(&self, target: BindTarget, index: usize) {
        self.write(|s| {
            if let Some(mapping) = s.mapping_mut(target) {
                mapping.unbind_slot(index);
            }
        });
    }

    pub fn assignment(&self, target: BindTarget, index: usize) -> Option<Assignment> {
        self.read(|s| s.mapping(target).and_then(|m| m.assignment(index)))
    }

    /// Current logical value of a mapping
    pub fn value(&self, target: BindTarget) -> i16 {
        self.read(|s| {
            s.mapping(target)
                .map_or(0, |m| m.value(&s.devices, &s.context))
        })
    }

    pub fn pressed(&self, target: BindTarget) -> bool {
        self.read(|s| {
            s.mapping(target)
                .is_some_and(|m| m.pressed(&s.devices, &s.context))
        })
    }

    /// Read access to the virtual ports for per-console input dispatch
    pub fn with_ports<R>(
        &self,
        f: impl FnOnce(&VirtualPorts, &DeviceTable, &MappingContext) -> R,
    ) -> R {
        self.read(|s| f(&s.ports, &s.devices, &s.context))
    }

    /// Drive a rumble mapping
    pub fn rumble(&self, id: MappingId, strong: u16, weak: u16) {
        self.write(|state| {
            let InputState {
                driver,
                devices,
                ports,
                ..
            } = state;
            if let Some(mapping) = ports.mapping(id) {
                mapping.rumble(devices, &mut **driver, strong, weak);
            }
        });
    }

    /// Edge-detect every hotkey
    pub fn poll_hotkeys(&self) -> Vec<HotkeyEvent> {
        self.write(|state| {
            let InputState {
                devices,
                hotkeys,
                context,
                ..
            } = state;
            hotkeys
                .iter_mut()
                .filter_map(|hotkey| hotkey.poll(devices, context))
                .collect()
        })
    }

    pub fn keyboard_captured(&self) -> bool {
        self.read(|s| s.context.keyboard_captured)
    }

    pub fn set_keyboard_captured(&self, captured: bool) {
        self.write(|s| s.context.keyboard_captured = captured);
    }

    pub fn mouse_acquired(&self) -> bool {
        self.read(|s| s.context.mouse_acquired)
    }

    pub fn acquire_mouse(&self) -> bool {
        self.write(|s| {
            let acquired = s.driver.acquire();
            s.context.mouse_acquired = s.driver.acquired();
            acquired
        })
    }

    pub fn release_mouse(&self) -> bool {
        self.write(|s| {
            let released = s.driver.release();
            s.context.mouse_acquired = s.driver.acquired();
            released
        })
    }

    pub fn devices(&self) -> Vec<Arc<HidDevice>> {
        self.read(|s| s.devices.devices().to_vec())
    }

    pub fn driver_name(&self) -> String {
        self.read(|s| s.driver.name().to_string())
    }

    /// Number of binding refreshes so far (topology changes and captures)
    pub fn refresh_count(&self) -> u64 {
        self.read(|s| s.refreshes)
    }

    /// Export every bound mapping as `settings key -> "a;b;c"`
    pub fn assignments(&self) -> BTreeMap<String, String> {
        self.read(|s| {
            s.targets()
                .into_iter()
                .filter_map(|target| {
                    let mapping = s.mapping(target)?;
                    mapping
                        .is_bound()
                        .then(|| (target.settings_key(), format_assignments(mapping.assignments())))
                })
                .collect()
        })
    }

    /// Import assignments previously produced by `assignments`
    ///
    /// Mappings absent from `values` are left untouched.
    pub fn load_assignments(&self, values: &BTreeMap<String, String>) {
        self.write(|state| {
            for target in state.targets() {
                let Some(value) = values.get(&target.settings_key()) else {
                    continue;
                };
                let assignments = parse_assignments(value);
                let InputState {
                    devices,
                    ports,
                    hotkeys,
                    ..
                } = &mut *state;
                let mapping = match target {
                    BindTarget::Port(id) => ports.mapping_mut(id),
                    BindTarget::Hotkey(action) => hotkeys
                        .iter_mut()
                        .find(|h| h.action() == action)
                        .map(Hotkey::mapping_mut),
                };
                if let Some(mapping) = mapping {
                    mapping.set_assignments(assignments, devices);
                }
            }
        });
    }
}
