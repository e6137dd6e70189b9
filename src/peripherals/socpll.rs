//! SOCPLL0 system PLL (variant 8 devices)
//!
//! Register layout:
//!   0x00: IPVERSION
//!   0x04: CTRL      (FORCEEN 0, DISONDEMAND 1, ENFRACN 2, REFCLKSEL [5:4])
//!   0x08: CFG
//!   0x18: STATUS    (RDY 0, PLLLOCK 1, ENS 8, LOCK 31)
//!   0x1C: IF
//!   0x20: IEN
//!   0x24: LOCK      (key 0x81A6)

use serde::Serialize;

use crate::error::{ClockError, ClockResult};
use crate::lock::{keys, LockGuard};
use crate::oscillator::{OscillatorController, OscillatorKind};
use crate::registers::{bit, field, RegisterBackedPeripheral};
use crate::scheduler::Scheduler;

const IPVERSION: u32 = 0x00;
const CTRL: u32 = 0x04;
const CFG: u32 = 0x08;
const STATUS: u32 = 0x18;
const IF: u32 = 0x1C;
const IEN: u32 = 0x20;
const LOCK: u32 = 0x24;

const CTRL_FORCEEN: u32 = 0;
const CTRL_DISONDEMAND: u32 = 1;
/// Everything in CTRL except the two FSM inputs
const CTRL_STORED_MASK: u32 = !0b11;

/// CTRL.REFCLKSEL encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefClkSel {
    Hfxo = 0,
    Hfrco = 1,
    Extclk = 2,
    DefaultHfxo = 3,
}

impl RefClkSel {
    fn from_raw(raw: u32) -> Self {
        match raw & 0b11 {
            0 => RefClkSel::Hfxo,
            1 => RefClkSel::Hfrco,
            2 => RefClkSel::Extclk,
            _ => RefClkSel::DefaultHfxo,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Socpll {
    osc: OscillatorController,
    lock: LockGuard,
    ctrl_stored: u32,
    cfg: u32,
}

impl Socpll {
    const NAME: &'static str = "SOCPLL0";
    const IPVERSION: u32 = 1;
    const CTRL_RESET: u32 = 0x9276_1604;
    const CFG_RESET: u32 = 0x20;

    pub fn new(lock_ticks: u32) -> Self {
        Self {
            osc: OscillatorController::new(
                OscillatorKind::Socpll,
                lock_ticks,
                bit(Self::CTRL_RESET, CTRL_DISONDEMAND),
            ),
            lock: LockGuard::new(keys::SOCPLL),
            ctrl_stored: Self::CTRL_RESET & CTRL_STORED_MASK,
            cfg: Self::CFG_RESET,
        }
    }

    pub fn reset(&mut self, sched: &mut Scheduler) {
        self.osc.reset(sched);
        self.lock.reset();
        self.ctrl_stored = Self::CTRL_RESET & CTRL_STORED_MASK;
        self.cfg = Self::CFG_RESET;
    }

    pub fn osc(&self) -> &OscillatorController {
        &self.osc
    }

    pub fn osc_mut(&mut self) -> &mut OscillatorController {
        &mut self.osc
    }

    pub fn ref_clk_sel(&self) -> RefClkSel {
        RefClkSel::from_raw(field(self.ctrl_stored, 4, 2))
    }

    /// Whether the reference clock is the HFXO
    pub fn is_using_hfxo(&self) -> bool {
        matches!(self.ref_clk_sel(), RefClkSel::Hfxo | RefClkSel::DefaultHfxo)
    }
}

impl RegisterBackedPeripheral for Socpll {
    type Effect = ();

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read_register(&self, offset: u32) -> ClockResult<u32> {
        Ok(match offset {
            IPVERSION => Self::IPVERSION,
            CTRL => {
                self.ctrl_stored
                    | (self.osc.force_enabled() as u32) << CTRL_FORCEEN
                    | (self.osc.on_demand_disabled() as u32) << CTRL_DISONDEMAND
            }
            CFG => self.cfg,
            // PLLLOCK follows RDY
            STATUS => {
                let ready = self.osc.is_ready() as u32;
                ready | ready << 1 | (self.osc.is_enabled() as u32) << 8 | self.lock.status_bit() << 31
            }
            IF => self.osc.interrupt_flags(),
            IEN => self.osc.interrupt_enable(),
            LOCK => 0,
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
            IPVERSION | STATUS => return Err(ClockError::ReadOnly { block: Self::NAME, offset }),
            CTRL => {
                self.lock.check(Self::NAME, offset)?;
                self.ctrl_stored = value & CTRL_STORED_MASK;
                self.osc.set_ctrl(
                    bit(value, CTRL_FORCEEN),
                    bit(value, CTRL_DISONDEMAND),
                    sched,
                );
            }
            CFG => {
                self.lock.check(Self::NAME, offset)?;
                self.cfg = value;
            }
            _ => return Err(ClockError::UnhandledOffset { block: Self::NAME, offset }),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{CLEAR_OFFSET, SET_OFFSET, TOGGLE_OFFSET};

    #[test]
    fn test_reset_ctrl() {
        let socpll = Socpll::new(4);
        assert_eq!(socpll.read(CTRL), 0x9276_1604);
        assert_eq!(socpll.read(CFG), 0x20);
        // REFCLKSEL reset is HFXO
        assert!(socpll.is_using_hfxo());
        assert!(!socpll.osc().on_demand_disabled());
    }

    #[test]
    fn test_refclksel_decode() {
        let mut sched = Scheduler::new();
        let mut socpll = Socpll::new(4);
        for (raw, sel, hfxo) in [
            (0, RefClkSel::Hfxo, true),
            (1, RefClkSel::Hfrco, false),
            (2, RefClkSel::Extclk, false),
            (3, RefClkSel::DefaultHfxo, true),
        ] {
            socpll.write(CLEAR_OFFSET + CTRL, 0b11 << 4, &mut sched);
            socpll.write(SET_OFFSET + CTRL, raw << 4, &mut sched);
            assert_eq!(socpll.ref_clk_sel(), sel);
            assert_eq!(socpll.is_using_hfxo(), hfxo);
        }
    }

    #[test]
    fn test_force_and_lock() {
        let mut sched = Scheduler::new();
        let mut socpll = Socpll::new(4);
        socpll.write(SET_OFFSET + CTRL, 1, &mut sched);
        assert_eq!(socpll.read(STATUS), 1 << 8);

        socpll.write(LOCK, 0, &mut sched);
        socpll.write(CLEAR_OFFSET + CTRL, 1, &mut sched);
        assert!(socpll.osc().is_enabled());
        assert_eq!(socpll.read(STATUS) >> 31, 1);
    }

    #[test]
    fn test_alias_windows_on_writable_registers() {
        let mut sched = Scheduler::new();
        let mut socpll = Socpll::new(4);
        for offset in [CFG, IEN] {
            socpll.write(offset, 0x30, &mut sched);
            socpll.write(SET_OFFSET + offset, 0x03, &mut sched);
            assert_eq!(socpll.read(offset), 0x33);
            socpll.write(CLEAR_OFFSET + offset, 0x30, &mut sched);
            assert_eq!(socpll.read(offset), 0x03);
            socpll.write(TOGGLE_OFFSET + offset, 0x0F, &mut sched);
            assert_eq!(socpll.read(offset), 0x0C);
        }
    }
}
