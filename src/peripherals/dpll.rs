//! DPLL0 digital phase-locked loop
//!
//! Register layout:
//!   0x00: IPVERSION
//!   0x04: EN          (EN 0, DISABLING 1)
//!   0x08: CFG
//!   0x0C: CFG1
//!   0x10: IF          (LOCK 0, LOCKFAILLOW 1, LOCKFAILHIGH 2)
//!   0x14: IEN
//!   0x18: STATUS      (RDY 0, ENS 1, LOCK 31)
//!   0x1C: DEBUGSTATUS
//!   0x20: OFFSET
//!   0x24: LOCK        (key 0x7102)
//!
//! The DPLL only runs when EN is set; it is never started on demand.
//! Lock always succeeds after the configured lock time.

use serde::Serialize;
use tracing::error;

use crate::error::{ClockError, ClockResult};
use crate::lock::{keys, LockGuard};
use crate::oscillator::{OscillatorController, OscillatorKind};
use crate::registers::{bit, RegisterBackedPeripheral};
use crate::scheduler::Scheduler;

const IPVERSION: u32 = 0x00;
const EN: u32 = 0x04;
const CFG: u32 = 0x08;
const CFG1: u32 = 0x0C;
const IF: u32 = 0x10;
const IEN: u32 = 0x14;
const STATUS: u32 = 0x18;
const DEBUGSTATUS: u32 = 0x1C;
const OFFSET: u32 = 0x20;
const LOCK: u32 = 0x24;

#[derive(Debug, Clone, Serialize)]
pub struct Dpll {
    osc: OscillatorController,
    lock: LockGuard,
    cfg: u32,
    cfg1: u32,
    offset: u32,
}

impl Dpll {
    const NAME: &'static str = "DPLL0";
    const IPVERSION: u32 = 1;
    const OFFSET_RESET: u32 = 0x5_A880;

    pub fn new(lock_ticks: u32) -> Self {
        Self {
            // Demand never reaches the DPLL, only EN does
            osc: OscillatorController::new(OscillatorKind::Dpll, lock_ticks, true),
            lock: LockGuard::new(keys::DPLL),
            cfg: 0,
            cfg1: 0,
            offset: Self::OFFSET_RESET,
        }
    }

    pub fn reset(&mut self, sched: &mut Scheduler) {
        self.osc.reset(sched);
        self.lock.reset();
        self.cfg = 0;
        self.cfg1 = 0;
        self.offset = Self::OFFSET_RESET;
    }

    pub fn osc(&self) -> &OscillatorController {
        &self.osc
    }

    pub fn osc_mut(&mut self) -> &mut OscillatorController {
        &mut self.osc
    }

    /// EN bit; this is the DPLL's `Enabled` as a reference-clock consumer
    pub fn is_enabled(&self) -> bool {
        self.osc.force_enabled()
    }
}

impl RegisterBackedPeripheral for Dpll {
    type Effect = ();

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read_register(&self, offset: u32) -> ClockResult<u32> {
        Ok(match offset {
            IPVERSION => Self::IPVERSION,
            EN => self.is_enabled() as u32,
            CFG => self.cfg,
            CFG1 => self.cfg1,
            IF => self.osc.interrupt_flags(),
            IEN => self.osc.interrupt_enable(),
            STATUS => {
                self.osc.is_ready() as u32
                    | (self.osc.is_enabled() as u32) << 1
                    | self.lock.status_bit() << 31
            }
            DEBUGSTATUS | LOCK => 0,
            OFFSET => self.offset,
            _ => return Err(ClockError::UnhandledOffset { block: Self::NAME, offset }),
        })
    }

    fn write_register(&mut self, offset: u32, value: u32, sched: &mut Scheduler) -> ClockResult<()> {
        match offset {
            LOCK => {
                self.lock.write(value);
            }
            IF => self.osc.set_interrupt_flags(value),
            IEN => self.osc.set_interrupt_enable(value),
            IPVERSION | STATUS | DEBUGSTATUS => {
                return Err(ClockError::ReadOnly { block: Self::NAME, offset });
            }
            EN => {
                self.lock.check(Self::NAME, offset)?;
                self.osc.set_force_enable(bit(value, 0), sched);
            }
            CFG | CFG1 => {
                self.lock.check(Self::NAME, offset)?;
                if self.is_enabled() {
                    error!(offset, value, "DPLL0 configuration written while enabled, ignored");
                    return Ok(());
                }
                if offset == CFG {
                    self.cfg = value;
                } else {
                    self.cfg1 = value;
                }
            }
            OFFSET => {
                self.lock.check(Self::NAME, offset)?;
                self.offset = value;
            }
            _ => return Err(ClockError::UnhandledOffset { block: Self::NAME, offset }),
        }
        Ok(())
    }
}
