// Input module
//
// Physical devices, bindings and the mapping engine that turns raw device
// readings into per-console controller values.
//
// Layering, leaves first:
// - `hid`: physical devices and the generation-tagged device table
// - `binding`: typed bindings and their on-disk string form
// - `mapping`: per-control mapping with auto-bind and value computation
// - `virtual_port` / `device`: canonical virtual devices and the
//   per-console port/device/input declarations that point at them
// - `hotkeys`, `manager`: front-end hotkeys and the owner of all of the above
// - `driver`, `keyboard`, `gamepad`, `unified`: device backends

pub mod binding;
pub mod config;
pub mod device;
pub mod driver;
pub mod gamepad;
pub mod hid;
pub mod hotkeys;
pub mod keyboard;
pub mod manager;
pub mod mapping;
pub mod unified;
pub mod virtual_port;

pub use binding::{Assignment, Binding, BindingParseError, Qualifier, BINDING_LIMIT};
pub use config::{Defocus, InputConfig};
pub use device::{InputDevice, InputNode, InputPair, InputPort, InputSource};
pub use driver::{InputDriver, InputEvent, NullDriver, ScriptHandle, ScriptedDriver};
pub use hid::{DeviceKind, DeviceSlot, DeviceTable, HidDevice};
pub use hotkeys::{HotkeyAction, HotkeyEvent};
pub use keyboard::KeyboardFeed;
pub use manager::{BindTarget, InputManager, InputObserver};
pub use mapping::{InputMapping, MappingContext, MappingKind};
pub use unified::UnifiedDriver;
pub use virtual_port::{MappingId, MouseControl, PadControl, VirtualPorts, VIRTUAL_PORTS};
