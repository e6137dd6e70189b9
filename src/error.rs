//! Error type shared by every clock block

use crate::oscillator::WakeUpSource;

/// Errors raised by register handlers and oscillator state machines.
///
/// None of these are fatal to the simulator. Register-level errors are
/// logged and absorbed by [`RegisterBackedPeripheral`](crate::registers::RegisterBackedPeripheral);
/// the CMU escalates its own lock violations to a CPU exception instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("{block} is locked, write to offset {offset:#x} rejected")]
    LockViolation { block: &'static str, offset: u32 },

    #[error("Wake up source {0:?} not implemented")]
    UnimplementedWakeSource(WakeUpSource),

    #[error("unhandled access to {block} at offset {offset:#x}")]
    UnhandledOffset { block: &'static str, offset: u32 },

    #[error("write to read-only register of {block} at offset {offset:#x}")]
    ReadOnly { block: &'static str, offset: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ClockResult<T> = Result<T, ClockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ClockError::LockViolation { block: "HFXO0", offset: 0x28 };
        assert_eq!(err.to_string(), "HFXO0 is locked, write to offset 0x28 rejected");

        let err = ClockError::UnimplementedWakeSource(WakeUpSource::Prs);
        assert_eq!(err.to_string(), "Wake up source Prs not implemented");
    }
}
