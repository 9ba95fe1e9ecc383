// Input binding types
//
// An `Assignment` is the persisted, device-independent description of one
// binding slot: which device (by numeric id), which group and input, and an
// optional qualifier. On disk it is written as
//
//     0x<hex device id>/<group>/<input>[/Lo|Hi|Rumble]
//
// A `Binding` is the runtime form: the assignment plus the device slot it
// currently resolves to, if the device is connected.

use super::hid::{DeviceSlot, DeviceTable};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of bindings per mapping
pub const BINDING_LIMIT: usize = 3;

/// Which part of an input a binding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Qualifier {
    /// The whole input
    #[default]
    None,
    /// Lower half of a bidirectional axis
    Lo,
    /// Upper half of a bidirectional axis
    Hi,
    /// The force feedback motor of the device
    Rumble,
}

impl Qualifier {
    fn suffix(self) -> Option<&'static str> {
        match self {
            Qualifier::None => None,
            Qualifier::Lo => Some("Lo"),
            Qualifier::Hi => Some("Hi"),
            Qualifier::Rumble => Some("Rumble"),
        }
    }
}

/// Errors produced while parsing an assignment string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingParseError {
    #[error("binding '{0}' needs at least device/group/input")]
    TooFewFields(String),
    #[error("invalid device id '{0}'")]
    InvalidDevice(String),
    #[error("invalid group or input id '{0}'")]
    InvalidIndex(String),
    #[error("unknown qualifier '{0}'")]
    UnknownQualifier(String),
}

/// Persisted form of a single binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub device_id: u64,
    pub group: u32,
    pub input: u32,
    pub qualifier: Qualifier,
}

impl Assignment {
    pub fn new(device_id: u64, group: u32, input: u32, qualifier: Qualifier) -> Self {
        Self {
            device_id,
            group,
            input,
            qualifier,
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}/{}/{}", self.device_id, self.group, self.input)?;
        if let Some(suffix) = self.qualifier.suffix() {
            write!(f, "/{}", suffix)?;
        }
        Ok(())
    }
}

impl FromStr for Assignment {
    type Err = BindingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.trim().split('/').collect();
        if tokens.len() < 3 {
            return Err(BindingParseError::TooFewFields(s.to_string()));
        }

        let hex = tokens[0]
            .strip_prefix("0x")
            .or_else(|| tokens[0].strip_prefix("0X"))
            .unwrap_or(tokens[0]);
        let device_id = u64::from_str_radix(hex, 16)
            .map_err(|_| BindingParseError::InvalidDevice(tokens[0].to_string()))?;
        let group = tokens[1]
            .parse()
            .map_err(|_| BindingParseError::InvalidIndex(tokens[1].to_string()))?;
        let input = tokens[2]
            .parse()
            .map_err(|_| BindingParseError::InvalidIndex(tokens[2].to_string()))?;

        let qualifier = match tokens.get(3).copied() {
            None | Some("") => Qualifier::None,
            Some("Lo") => Qualifier::Lo,
            Some("Hi") => Qualifier::Hi,
            Some("Rumble") => Qualifier::Rumble,
            Some(other) => return Err(BindingParseError::UnknownQualifier(other.to_string())),
        };

        Ok(Self::new(device_id, group, input, qualifier))
    }
}

/// Runtime form of a binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub assignment: Assignment,
    /// Where the device currently lives in the device table, if connected
    pub slot: Option<DeviceSlot>,
}

impl Binding {
    /// Resolve an assignment against the current device list
    ///
    /// A missing device still yields a binding: the id is kept so the
    /// binding comes back to life once the device is reconnected.
    pub fn resolve(assignment: Assignment, devices: &DeviceTable) -> Self {
        Self {
            assignment,
            slot: devices.resolve(assignment.device_id),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.slot.is_some()
    }
}

/// Split a persisted `a;b;c` list into typed assignments
///
/// Empty entries keep their slot so that slot positions survive a round
/// trip. Entries that fail to parse are logged and left empty.
pub fn parse_assignments(value: &str) -> [Option<Assignment>; BINDING_LIMIT] {
    let mut assignments = [None; BINDING_LIMIT];
    for (index, token) in value.split(';').take(BINDING_LIMIT).enumerate() {
        if token.trim().is_empty() {
            continue;
        }
        match token.parse::<Assignment>() {
            Ok(assignment) => assignments[index] = Some(assignment),
            Err(e) => log::warn!("Ignoring binding: {}", e),
        }
    }
    assignments
}

/// Join assignments back into the `a;b;c` settings form
pub fn format_assignments(assignments: &[Option<Assignment>]) -> String {
    let parts: Vec<String> = assignments
        .iter()
        .map(|a| a.map(|a| a.to_string()).unwrap_or_default())
        .collect();
    let joined = parts.join(";");
    joined.trim_end_matches(';').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::hid::HidDevice;
    use std::sync::Arc;

    #[test]
    fn test_parse_with_qualifier() {
        let a: Assignment = "0x1a2b/0/1/Hi".parse().unwrap();
        assert_eq!(a, Assignment::new(0x1a2b, 0, 1, Qualifier::Hi));
        assert_eq!(a.to_string(), "0x1a2b/0/1/Hi");
    }

    #[test]
    fn test_parse_without_qualifier() {
        let a: Assignment = "0x1/3/12".parse().unwrap();
        assert_eq!(a.qualifier, Qualifier::None);
        assert_eq!(a.to_string(), "0x1/3/12");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "0x1/0".parse::<Assignment>(),
            Err(BindingParseError::TooFewFields(_))
        ));
        assert!(matches!(
            "zz/0/0".parse::<Assignment>(),
            Err(BindingParseError::InvalidDevice(_))
        ));
        assert!(matches!(
            "0x1/a/0".parse::<Assignment>(),
            Err(BindingParseError::InvalidIndex(_))
        ));
        assert!(matches!(
            "0x1/0/0/Sideways".parse::<Assignment>(),
            Err(BindingParseError::UnknownQualifier(_))
        ));
    }

    #[test]
    fn test_assignment_list_keeps_slots() {
        let list = parse_assignments(";0x2/0/5;garbage");
        assert_eq!(list[0], None);
        assert_eq!(list[1], Some(Assignment::new(2, 0, 5, Qualifier::None)));
        assert_eq!(list[2], None);
        assert_eq!(format_assignments(&list), ";0x2/0/5");
        assert_eq!(format_assignments(&[None, None, None]), "");
    }

    #[test]
    fn test_resolve_soft_disconnect() {
        let mut table = DeviceTable::new();
        let assignment = Assignment::new(5, 0, 0, Qualifier::None);

        let binding = Binding::resolve(assignment, &table);
        assert!(!binding.is_connected());
        assert_eq!(binding.assignment.device_id, 5);

        table.replace(vec![Arc::new(HidDevice::keyboard(5, "Keyboard", &["A"]))]);
        let binding = Binding::resolve(assignment, &table);
        assert!(binding.is_connected());
    }
}
