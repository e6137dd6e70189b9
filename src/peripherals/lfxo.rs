//! LFXO low-frequency crystal oscillator
//!
//! Register layout:
//!   0x00: IPVERSION (read-only)
//!   0x04: CTRL      (FORCEEN 0, DISONDEMAND 1, FAILDETEN 4, FAILDETEM4WUEN 5)
//!   0x08: CFG
//!   0x0C: CFG1
//!   0x10: STATUS    (RDY 0, ENS 16, LOCK 31; read-only)
//!   0x14: CAL
//!   0x18: IF
//!   0x1C: IEN
//!   0x20: SYNCBUSY  (always idle)
//!   0x24: LOCK      (key 0x1A20)

use serde::Serialize;

use crate::error::{ClockError, ClockResult};
use crate::lock::{keys, LockGuard};
use crate::oscillator::{OscillatorController, OscillatorKind};
use crate::registers::{bit, RegisterBackedPeripheral};
use crate::scheduler::Scheduler;

const IPVERSION: u32 = 0x00;
const CTRL: u32 = 0x04;
const CFG: u32 = 0x08;
const CFG1: u32 = 0x0C;
const STATUS: u32 = 0x10;
const CAL: u32 = 0x14;
const IF: u32 = 0x18;
const IEN: u32 = 0x1C;
const SYNCBUSY: u32 = 0x20;
const LOCK: u32 = 0x24;

const CTRL_FORCEEN: u32 = 0;
const CTRL_DISONDEMAND: u32 = 1;
/// Failure detection bits, stored only
const CTRL_STORED_MASK: u32 = 0x30;

#[derive(Debug, Clone, Serialize)]
pub struct Lfxo {
    osc: OscillatorController,
    lock: LockGuard,
    cfg: u32,
    cfg1: u32,
    cal: u32,
    ctrl_stored: u32,
}

impl Lfxo {
    const NAME: &'static str = "LFXO";
    const IPVERSION: u32 = 2;
    const CTRL_RESET: u32 = 0x2;
    const CFG_RESET: u32 = 0x0001_0700;
    const CFG1_RESET: u32 = 0x305;
    const CAL_RESET: u32 = 0x100;

    pub fn new(startup_delay_ticks: u32) -> Self {
        Self {
            osc: OscillatorController::new(
                OscillatorKind::Lfxo,
                startup_delay_ticks,
                bit(Self::CTRL_RESET, CTRL_DISONDEMAND),
            ),
            lock: LockGuard::new(keys::LFXO),
            cfg: Self::CFG_RESET,
            cfg1: Self::CFG1_RESET,
            cal: Self::CAL_RESET,
            ctrl_stored: 0,
        }
    }

    pub fn reset(&mut self, sched: &mut Scheduler) {
        self.osc.reset(sched);
        self.lock.reset();
        self.cfg = Self::CFG_RESET;
        self.cfg1 = Self::CFG1_RESET;
        self.cal = Self::CAL_RESET;
        self.ctrl_stored = 0;
    }

    pub fn osc(&self) -> &OscillatorController {
        &self.osc
    }

    pub fn osc_mut(&mut self) -> &mut OscillatorController {
        &mut self.osc
    }
}

impl RegisterBackedPeripheral for Lfxo {
    type Effect = ();

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read_register(&self, offset: u32) -> ClockResult<u32> {
        let value = match offset {
            IPVERSION => Self::IPVERSION,
            CTRL => {
                self.ctrl_stored
                    | (self.osc.force_enabled() as u32) << CTRL_FORCEEN
                    | (self.osc.on_demand_disabled() as u32) << CTRL_DISONDEMAND
            }
            CFG => self.cfg,
            CFG1 => self.cfg1,
            STATUS => {
                self.osc.is_ready() as u32
                    | (self.osc.is_enabled() as u32) << 16
                    | self.lock.status_bit() << 31
            }
            CAL => self.cal,
            IF => self.osc.interrupt_flags(),
            IEN => self.osc.interrupt_enable(),
            SYNCBUSY | LOCK => 0,
            _ => return Err(ClockError::UnhandledOffset { block: Self::NAME, offset }),
        };
        Ok(value)
    }

    fn write_register(&mut self, offset: u32, value: u32, sched: &mut Scheduler) -> ClockResult<()> {
        match offset {
            LOCK => {
                self.lock.write(value);
            }
            IF => self.osc.set_interrupt_flags(value),
            IEN => self.osc.set_interrupt_enable(value),
            IPVERSION | STATUS | SYNCBUSY => {
                return Err(ClockError::ReadOnly { block: Self::NAME, offset })
            }
            CTRL => {
                self.lock.check(Self::NAME, offset)?;
                self.ctrl_stored = value & CTRL_STORED_MASK;
                self.osc.set_ctrl(
                    bit(value, CTRL_FORCEEN),
                    bit(value, CTRL_DISONDEMAND),
                    sched,
                );
            }
            CFG | CFG1 | CAL => {
                self.lock.check(Self::NAME, offset)?;
                match offset {
                    CFG => self.cfg = value,
                    CFG1 => self.cfg1 = value,
                    _ => self.cal = value,
                }
            }
            _ => return Err(ClockError::UnhandledOffset { block: Self::NAME, offset }),
        }
        Ok(())
    }
}
