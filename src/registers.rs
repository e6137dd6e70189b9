//! Register block access convention
//!
//! Every clock block is a 0x4000-byte window of 32-bit registers. The upper
//! three quarters alias the first one:
//!
//! | Window          | Effect on the base register |
//! |-----------------|-----------------------------|
//! | 0x0000 - 0x0FFF | plain write                 |
//! | 0x1000 - 0x1FFF | SET: `old \| value`         |
//! | 0x2000 - 0x2FFF | CLR: `old & !value`         |
//! | 0x3000 - 0x3FFF | TGL: `old ^ value`          |

use tracing::{debug, trace, warn};

use crate::error::{ClockError, ClockResult};
use crate::scheduler::Scheduler;

/// Size of one register block window
pub const BLOCK_SIZE: u32 = 0x4000;
/// Offset of the SET alias window
pub const SET_OFFSET: u32 = 0x1000;
/// Offset of the CLEAR alias window
pub const CLEAR_OFFSET: u32 = 0x2000;
/// Offset of the TOGGLE alias window
pub const TOGGLE_OFFSET: u32 = 0x3000;

/// Operation selected by the alias window an access falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOp {
    Write,
    Set,
    Clear,
    Toggle,
}

impl AliasOp {
    /// Split a block offset into its alias operation and base register offset
    pub fn decode(offset: u32) -> (AliasOp, u32) {
        let offset = offset % BLOCK_SIZE;
        let op = match offset & 0x3000 {
            SET_OFFSET => AliasOp::Set,
            CLEAR_OFFSET => AliasOp::Clear,
            TOGGLE_OFFSET => AliasOp::Toggle,
            _ => AliasOp::Write,
        };
        (op, offset & 0x0FFF)
    }

    /// Value the base register ends up with
    pub fn apply(self, old: u32, value: u32) -> u32 {
        match self {
            AliasOp::Write => value,
            AliasOp::Set => old | value,
            AliasOp::Clear => old & !value,
            AliasOp::Toggle => old ^ value,
        }
    }
}

/// Behaviour half of a memory-mapped clock block.
///
/// Implementors only see base offsets. The provided `read`/`write` resolve
/// the SET/CLR/TGL aliases into a read-modify-write and absorb the
/// non-fatal errors with a log line.
pub trait RegisterBackedPeripheral {
    /// Side effect a write reports back to the clock tree
    type Effect: Default;

    /// Block name used in log lines and errors
    fn name(&self) -> &'static str;

    /// Read a base register
    fn read_register(&self, offset: u32) -> ClockResult<u32>;

    /// Write a base register
    fn write_register(
        &mut self,
        offset: u32,
        value: u32,
        sched: &mut Scheduler,
    ) -> ClockResult<Self::Effect>;

    /// Bus read at any offset of the block
    fn read(&self, offset: u32) -> u32 {
        let (op, base) = AliasOp::decode(offset);
        match self.read_register(base) {
            Ok(value) => {
                trace!(block = self.name(), ?op, offset = base, value, "read");
                value
            }
            Err(err) => {
                debug!("{err}");
                0
            }
        }
    }

    /// Bus write at any offset of the block
    fn write(&mut self, offset: u32, value: u32, sched: &mut Scheduler) -> Self::Effect {
        let (op, base) = AliasOp::decode(offset);
        let value = match op {
            AliasOp::Write => value,
            _ => {
                let old = self.read_register(base).unwrap_or(0);
                let new = op.apply(old, value);
                trace!(block = self.name(), ?op, offset = base, old, new, "alias write");
                new
            }
        };
        trace!(block = self.name(), offset = base, value, "write");

        match self.write_register(base, value, sched) {
            Ok(effect) => effect,
            Err(err @ ClockError::LockViolation { .. }) => {
                warn!("{err}");
                Self::Effect::default()
            }
            Err(err) => {
                debug!("{err}");
                Self::Effect::default()
            }
        }
    }
}

/// Extract a `width`-bit field starting at bit `shift`
pub(crate) fn field(value: u32, shift: u32, width: u32) -> u32 {
    (value >> shift) & ((1u32 << width) - 1)
}

/// Single-bit test
pub(crate) fn bit(value: u32, n: u32) -> bool {
    value & (1 << n) != 0
}
