//! HFRCO RC oscillator block
//!
//! One type serves both instances: HFRCO0 (the DPLL-capable main RC
//! oscillator) and HFRCOEM23 (the instance kept alive in EM2/EM3).
//!
//! Register layout:
//!   0x00: IPVERSION
//!   0x04: CTRL      (FORCEEN 0, DISONDEMAND 1, EM23ONDEMAND 2)
//!   0x08: CAL
//!   0x0C: STATUS    (RDY 0, FREQBSY 1, SYNCBUSY 2, ENS 16, LOCK 31)
//!   0x10: IF
//!   0x14: IEN
//!   0x1C: LOCK      (key 0x8195)
//!   0x20: TEST
//!   0x24: FEATURE

use serde::Serialize;

use crate::error::{ClockError, ClockResult};
use crate::lock::{keys, LockGuard};
use crate::oscillator::{OscillatorController, OscillatorKind};
use crate::registers::{bit, RegisterBackedPeripheral};
use crate::scheduler::Scheduler;

const IPVERSION: u32 = 0x00;
const CTRL: u32 = 0x04;
const CAL: u32 = 0x08;
const STATUS: u32 = 0x0C;
const IF: u32 = 0x10;
const IEN: u32 = 0x14;
const LOCK: u32 = 0x1C;
const TEST: u32 = 0x20;
const FEATURE: u32 = 0x24;

const CTRL_FORCEEN: u32 = 0;
const CTRL_DISONDEMAND: u32 = 1;
const CTRL_EM23ONDEMAND: u32 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct Hfrco {
    osc: OscillatorController,
    lock: LockGuard,
    em23_on_demand: bool,
    cal: u32,
    test: u32,
    feature: u32,
}

impl Hfrco {
    const IPVERSION: u32 = 2;
    const CAL_RESET: u32 = 0xA868_9F7F;
    const TEST_RESET: u32 = 0x4;

    /// `kind` is [`OscillatorKind::Hfrco`] or [`OscillatorKind::HfrcoEm23`]
    pub fn new(kind: OscillatorKind, startup_delay_ticks: u32) -> Self {
        Self {
            osc: OscillatorController::new(kind, startup_delay_ticks, false),
            lock: LockGuard::new(keys::HFRCO),
            em23_on_demand: false,
            cal: Self::CAL_RESET,
            test: Self::TEST_RESET,
            feature: 0,
        }
    }

    pub fn reset(&mut self, sched: &mut Scheduler) {
        self.osc.reset(sched);
        self.lock.reset();
        self.em23_on_demand = false;
        self.cal = Self::CAL_RESET;
        self.test = Self::TEST_RESET;
        self.feature = 0;
    }

    pub fn osc(&self) -> &OscillatorController {
        &self.osc
    }

    pub fn osc_mut(&mut self) -> &mut OscillatorController {
        &mut self.osc
    }
}

impl RegisterBackedPeripheral for Hfrco {
    type Effect = ();

    fn name(&self) -> &'static str {
        self.osc.kind().name()
    }

    fn read_register(&self, offset: u32) -> ClockResult<u32> {
        Ok(match offset {
            IPVERSION => Self::IPVERSION,
            CTRL => {
                (self.osc.force_enabled() as u32) << CTRL_FORCEEN
                    | (self.osc.on_demand_disabled() as u32) << CTRL_DISONDEMAND
                    | (self.em23_on_demand as u32) << CTRL_EM23ONDEMAND
            }
            CAL => self.cal,
            // FREQBSY and SYNCBUSY never assert
            STATUS => {
                self.osc.is_ready() as u32
                    | (self.osc.is_enabled() as u32) << 16
                    | self.lock.status_bit() << 31
            }
            IF => self.osc.interrupt_flags(),
            IEN => self.osc.interrupt_enable(),
            LOCK => 0,
            TEST => self.test,
            FEATURE => self.feature,
            _ => return Err(ClockError::UnhandledOffset { block: self.name(), offset }),
        })
    }

    fn write_register(&mut self, offset: u32, value: u32, sched: &mut Scheduler) -> ClockResult<()> {
        let name = self.name();
        match offset {
            LOCK => {
                self.lock.write(value);
                return Ok(());
            }
            IF => {
                self.osc.set_interrupt_flags(value);
                return Ok(());
            }
            IEN => {
                self.osc.set_interrupt_enable(value);
                return Ok(());
            }
            IPVERSION | STATUS => return Err(ClockError::ReadOnly { block: name, offset }),
            CTRL | CAL | TEST | FEATURE => self.lock.check(name, offset)?,
            _ => return Err(ClockError::UnhandledOffset { block: name, offset }),
        }

        match offset {
            CTRL => {
                self.em23_on_demand = bit(value, CTRL_EM23ONDEMAND);
                self.osc.set_ctrl(
                    bit(value, CTRL_FORCEEN),
                    bit(value, CTRL_DISONDEMAND),
                    sched,
                );
            }
            CAL => self.cal = value,
            TEST => self.test = value,
            _ => self.feature = value,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{CLEAR_OFFSET, SET_OFFSET, TOGGLE_OFFSET};
    use crate::scheduler::{ClockId, EventId};

    #[test]
    fn test_instances_use_their_own_events() {
        let mut sched = Scheduler::new();
        let mut hfrco = Hfrco::new(OscillatorKind::Hfrco, 1);
        let mut em23 = Hfrco::new(OscillatorKind::HfrcoEm23, 2);
        assert_eq!(hfrco.name(), "HFRCO0");
        assert_eq!(em23.name(), "HFRCOEM23");

        hfrco.write(CTRL, 1, &mut sched);
        em23.write(CTRL, 1, &mut sched);
        sched.advance(1, ClockId::Clock32K);
        assert_eq!(sched.next_pending_event(), Some(EventId::HfrcoStartup));
        hfrco.osc_mut().on_timer_expired(&mut sched).unwrap();
        assert_eq!(sched.next_pending_event(), None);

        sched.advance(1, ClockId::Clock32K);
        assert_eq!(sched.next_pending_event(), Some(EventId::HfrcoEm23Startup));
        em23.osc_mut().on_timer_expired(&mut sched).unwrap();
        assert_eq!(em23.read(STATUS) & 1, 1);
    }

    #[test]
    fn test_demand_starts_without_disondemand() {
        let mut sched = Scheduler::new();
        let mut hfrco = Hfrco::new(OscillatorKind::Hfrco, 1);
        hfrco.osc_mut().update_demand(true, &mut sched);
        assert!(hfrco.osc().is_enabled());

        // Setting DISONDEMAND powers it down
        hfrco.write(SET_OFFSET + CTRL, 1 << CTRL_DISONDEMAND, &mut sched);
        assert!(!hfrco.osc().is_enabled());
        assert_eq!(hfrco.read(CTRL), 0b010);
    }

    #[test]
    fn test_locked_cal_write_dropped() {
        let mut sched = Scheduler::new();
        let mut hfrco = Hfrco::new(OscillatorKind::HfrcoEm23, 1);
        hfrco.write(LOCK, 0, &mut sched);
        hfrco.write(CAL, 0, &mut sched);
        assert_eq!(hfrco.read(CAL), 0xA868_9F7F);
        assert_eq!(hfrco.read(STATUS) >> 31, 1);

        hfrco.write(LOCK, 0x8195, &mut sched);
        hfrco.write(CAL, 0, &mut sched);
        assert_eq!(hfrco.read(CAL), 0);
    }

    #[test]
    fn test_alias_windows_on_writable_registers() {
        let mut sched = Scheduler::new();
        let mut hfrco = Hfrco::new(OscillatorKind::Hfrco, 1);
        for offset in [CAL, TEST, FEATURE, IEN] {
            hfrco.write(offset, 0xF00F, &mut sched);
            hfrco.write(SET_OFFSET + offset, 0x0FF0, &mut sched);
            assert_eq!(hfrco.read(offset), 0xFFFF);
            hfrco.write(CLEAR_OFFSET + offset, 0xFF00, &mut sched);
            assert_eq!(hfrco.read(offset), 0x00FF);
            hfrco.write(TOGGLE_OFFSET + offset, 0x0F0F, &mut sched);
            assert_eq!(hfrco.read(offset), 0x0FF0);
        }
    }
}
