//! Register write-lock guard
//!
//! Each lockable block has a LOCK register with a 16-bit LOCKKEY field.
//! Writing the block's magic key unlocks it; writing anything else locks it,
//! including a value that was meant as configuration.

use serde::Serialize;

use crate::error::{ClockError, ClockResult};

/// Unlock keys. Each block has its own; they are not interchangeable.
pub mod keys {
    /// CMU LOCK and WDOGLOCK
    pub const CMU: u16 = 0x93F7;
    pub const HFXO: u16 = 0x580E;
    pub const DPLL: u16 = 0x7102;
    pub const HFRCO: u16 = 0x8195;
    pub const LFXO: u16 = 0x1A20;
    pub const SOCPLL: u16 = 0x81A6;
}

/// STATUS.LOCK encoding shared by every block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Unlocked = 0,
    Locked = 1,
}

#[derive(Debug, Clone, Serialize)]
pub struct LockGuard {
    #[serde(skip)]
    key: u16,
    state: LockState,
}

impl LockGuard {
    pub fn new(key: u16) -> Self {
        Self {
            key,
            state: LockState::Unlocked,
        }
    }

    pub fn reset(&mut self) {
        self.state = LockState::Unlocked;
    }

    /// Handle a write to the LOCK register. Only the LOCKKEY field is compared.
    pub fn write(&mut self, value: u32) -> LockState {
        self.state = if value as u16 == self.key {
            LockState::Unlocked
        } else {
            LockState::Locked
        };
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// STATUS.LOCK bit value
    pub fn status_bit(&self) -> u32 {
        self.state as u32
    }

    /// Fail a guarded write while locked
    pub fn check(&self, block: &'static str, offset: u32) -> ClockResult<()> {
        if self.is_locked() {
            return Err(ClockError::LockViolation { block, offset });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_key_unlocks() {
        let mut guard = LockGuard::new(keys::CMU);
        guard.write(0);
        assert!(guard.is_locked());
        assert_eq!(guard.write(0x93F7), LockState::Unlocked);
        assert!(!guard.is_locked());
    }

    #[test]
    fn test_any_other_value_locks() {
        for value in [0u32, !0x93F7u32 & 0xFFFF, 0x93F6, 0x1234, 0xFFFF] {
            let mut guard = LockGuard::new(keys::CMU);
            guard.write(value);
            assert!(guard.is_locked(), "value {value:#x} should lock");
        }
    }

    #[test]
    fn test_only_lockkey_field_is_compared() {
        let mut guard = LockGuard::new(keys::HFXO);
        guard.write(0xFFFF_0000 | keys::HFXO as u32);
        assert!(!guard.is_locked());
    }

    #[test]
    fn test_keys_are_distinct() {
        let mut all = [keys::CMU, keys::HFXO, keys::DPLL, keys::HFRCO, keys::LFXO, keys::SOCPLL];
        all.sort();
        assert!(all.windows(2).all(|w| w[0] != w[1]));

        // Another block's key locks
        let mut guard = LockGuard::new(keys::LFXO);
        guard.write(keys::HFRCO as u32);
        assert!(guard.is_locked());
    }

    #[test]
    fn test_check_and_reset() {
        let mut guard = LockGuard::new(keys::DPLL);
        assert!(guard.check("DPLL0", 0x8).is_ok());
        guard.write(1);
        assert_eq!(guard.status_bit(), 1);
        assert_eq!(
            guard.check("DPLL0", 0x8),
            Err(ClockError::LockViolation { block: "DPLL0", offset: 0x8 })
        );
        guard.reset();
        assert_eq!(guard.state(), LockState::Unlocked);
    }
}
