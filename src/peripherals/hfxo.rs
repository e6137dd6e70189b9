//! HFXO0 high-frequency crystal oscillator
//!
//! Register layout:
//!   0x00: IPVERSION (read-only)
//!   0x08: SWRST     (bit 0 pulse resets the block)
//!   0x10: XTALCFG
//!   0x18: XTALCTRL
//!   0x20: CFG
//!   0x28: CTRL      (FORCEEN 0, DISONDEMAND 1)
//!   0x50: CMD       (COREBIASOPT 0, MANUALOVERRIDE 1; write-only)
//!   0x58: STATUS    (read-only)
//!   0x70: IF
//!   0x74: IEN
//!   0x80: LOCK      (key 0x580E, write-only)
//!
//! Besides the FORCEEN/demand path, the HFXO is the only oscillator
//! that serves PRS and SYSRTC early-wakeup requests.

use serde::Serialize;

use crate::error::{ClockError, ClockResult};
use crate::lock::{keys, LockGuard};
use crate::oscillator::{OscillatorController, OscillatorKind, WakeUpSource};
use crate::registers::{bit, RegisterBackedPeripheral};
use crate::scheduler::Scheduler;

mod offsets {
    pub const IPVERSION: u32 = 0x00;
    pub const SWRST: u32 = 0x08;
    pub const XTALCFG: u32 = 0x10;
    pub const XTALCTRL: u32 = 0x18;
    pub const CFG: u32 = 0x20;
    pub const CTRL: u32 = 0x28;
    pub const CMD: u32 = 0x50;
    pub const STATUS: u32 = 0x58;
    pub const IF: u32 = 0x70;
    pub const IEN: u32 = 0x74;
    pub const LOCK: u32 = 0x80;
}

/// STATUS bit positions
pub mod status {
    pub const RDY: u32 = 0;
    pub const COREBIASOPTRDY: u32 = 1;
    pub const PRSRDY: u32 = 2;
    pub const SYSRTCRDY: u32 = 4;
    pub const ENS: u32 = 16;
    pub const HWREQ: u32 = 17;
    pub const PRSHWREQ: u32 = 20;
    pub const SYSRTCHWREQ: u32 = 22;
    pub const FSMLOCK: u32 = 30;
    pub const LOCK: u32 = 31;
}

const CTRL_FORCEEN: u32 = 0;
const CTRL_DISONDEMAND: u32 = 1;
/// CTRL bits stored as plain configuration
const CTRL_STORED_MASK: u32 = 0x3C;

const CMD_COREBIASOPT: u32 = 0;
const CMD_MANUALOVERRIDE: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct Hfxo {
    /// Start-up state machine
    osc: OscillatorController,
    lock: LockGuard,
    xtalcfg: u32,
    xtalctrl: u32,
    cfg: u32,
    /// CTRL bits 2-5, kept for read-back only
    ctrl_stored: u32,
}

impl Hfxo {
    const NAME: &'static str = "HFXO0";
    const IPVERSION: u32 = 3;
    const XTALCFG_RESET: u32 = 0x0BB0_0820;
    const XTALCTRL_RESET: u32 = 0x033C_3C3C;
    const CFG_RESET: u32 = 0x1000_0000;
    /// DISONDEMAND set out of reset
    const CTRL_RESET: u32 = 0x2;

    pub fn new(startup_delay_ticks: u32) -> Self {
        Self {
            osc: OscillatorController::new(
                OscillatorKind::Hfxo,
                startup_delay_ticks,
                bit(Self::CTRL_RESET, CTRL_DISONDEMAND),
            ),
            lock: LockGuard::new(keys::HFXO),
            xtalcfg: Self::XTALCFG_RESET,
            xtalctrl: Self::XTALCTRL_RESET,
            cfg: Self::CFG_RESET,
            ctrl_stored: Self::CTRL_RESET & CTRL_STORED_MASK,
        }
    }

    pub fn reset(&mut self, sched: &mut Scheduler) {
        self.osc.reset(sched);
        self.lock.reset();
        self.xtalcfg = Self::XTALCFG_RESET;
        self.xtalctrl = Self::XTALCTRL_RESET;
        self.cfg = Self::CFG_RESET;
        self.ctrl_stored = Self::CTRL_RESET & CTRL_STORED_MASK;
    }

    pub fn osc(&self) -> &OscillatorController {
        &self.osc
    }

    pub fn osc_mut(&mut self) -> &mut OscillatorController {
        &mut self.osc
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    fn ctrl(&self) -> u32 {
        self.ctrl_stored
            | (self.osc.force_enabled() as u32) << CTRL_FORCEEN
            | (self.osc.on_demand_disabled() as u32) << CTRL_DISONDEMAND
    }

    fn status(&self) -> u32 {
        let osc = &self.osc;
        let hw = osc.hardware_request();
        (osc.is_ready() as u32) << status::RDY
            | (osc.core_bias_ready() as u32) << status::COREBIASOPTRDY
            | (osc.prs_ready() as u32) << status::PRSRDY
            | (osc.sysrtc_ready() as u32) << status::SYSRTCRDY
            | (osc.is_enabled() as u32) << status::ENS
            | (osc.requested() as u32) << status::HWREQ
            | ((hw == Some(WakeUpSource::Prs)) as u32) << status::PRSHWREQ
            | ((hw == Some(WakeUpSource::Sysrtc)) as u32) << status::SYSRTCHWREQ
            | (osc.fsm_locked() as u32) << status::FSMLOCK
            | self.lock.status_bit() << status::LOCK
    }
}

impl RegisterBackedPeripheral for Hfxo {
    type Effect = ();

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read_register(&self, offset: u32) -> ClockResult<u32> {
        match offset {
            offsets::IPVERSION => Ok(Self::IPVERSION),
            offsets::SWRST => Ok(0),
            offsets::XTALCFG => Ok(self.xtalcfg),
            offsets::XTALCTRL => Ok(self.xtalctrl),
            offsets::CFG => Ok(self.cfg),
            offsets::CTRL => Ok(self.ctrl()),
            offsets::CMD => Ok(0),
            offsets::STATUS => Ok(self.status()),
            offsets::IF => Ok(self.osc.interrupt_flags()),
            offsets::IEN => Ok(self.osc.interrupt_enable()),
            offsets::LOCK => Ok(0),
            _ => Err(ClockError::UnhandledOffset { block: Self::NAME, offset }),
        }
    }

    fn write_register(&mut self, offset: u32, value: u32, sched: &mut Scheduler) -> ClockResult<()> {
        match offset {
            // Unguarded
            offsets::LOCK => {
                self.lock.write(value);
                return Ok(());
            }
            offsets::IF => {
                self.osc.set_interrupt_flags(value);
                return Ok(());
            }
            offsets::IEN => {
                self.osc.set_interrupt_enable(value);
                return Ok(());
            }
            offsets::CMD => {
                if bit(value, CMD_COREBIASOPT) {
                    self.osc.core_bias_opt();
                }
                if bit(value, CMD_MANUALOVERRIDE) {
                    self.osc.manual_override();
                }
                return Ok(());
            }
            offsets::IPVERSION | offsets::STATUS => {
                return Err(ClockError::ReadOnly { block: Self::NAME, offset });
            }
            _ => {}
        }

        self.lock.check(Self::NAME, offset)?;
        match offset {
            offsets::SWRST => {
                if bit(value, 0) {
                    self.reset(sched);
                }
            }
            offsets::XTALCFG => self.xtalcfg = value,
            offsets::XTALCTRL => self.xtalctrl = value,
            offsets::CFG => self.cfg = value,
            offsets::CTRL => {
                self.ctrl_stored = value & CTRL_STORED_MASK;
                self.osc.set_ctrl(
                    bit(value, CTRL_FORCEEN),
                    bit(value, CTRL_DISONDEMAND),
                    sched,
                );
            }
            _ => return Err(ClockError::UnhandledOffset { block: Self::NAME, offset }),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::{int_bits, OscState};
    use crate::registers::{CLEAR_OFFSET, SET_OFFSET, TOGGLE_OFFSET};
    use crate::scheduler::{ClockId, EventId};

    fn setup() -> (Hfxo, Scheduler) {
        (Hfxo::new(4), Scheduler::new())
    }

    fn expire(hfxo: &mut Hfxo, sched: &mut Scheduler, ticks: u64) {
        sched.advance(ticks, ClockId::Clock32K);
        if sched.next_pending_event() == Some(EventId::HfxoStartup) {
            hfxo.osc_mut().on_timer_expired(sched).unwrap();
        }
    }

    #[test]
    fn test_reset_values() {
        let (hfxo, _) = setup();
        assert_eq!(hfxo.read(offsets::XTALCFG), 0x0BB0_0820);
        assert_eq!(hfxo.read(offsets::XTALCTRL), 0x033C_3C3C);
        assert_eq!(hfxo.read(offsets::CFG), 0x1000_0000);
        assert_eq!(hfxo.read(offsets::CTRL), 0x2);
        assert_eq!(hfxo.read(offsets::STATUS), 0);
    }

    #[test]
    fn test_forceen_reaches_ready() {
        let (mut hfxo, mut sched) = setup();
        hfxo.write(SET_OFFSET + offsets::CTRL, 1 << CTRL_FORCEEN, &mut sched);
        assert_ne!(hfxo.read(offsets::STATUS) & (1 << status::ENS), 0);
        assert_eq!(hfxo.read(offsets::STATUS) & (1 << status::RDY), 0);

        expire(&mut hfxo, &mut sched, 4);
        let st = hfxo.read(offsets::STATUS);
        assert_ne!(st & (1 << status::RDY), 0);
        assert_ne!(st & (1 << status::COREBIASOPTRDY), 0);
        assert_ne!(hfxo.read(offsets::IF) & int_bits::RDY, 0);
    }

    #[test]
    fn test_lock_rejects_ctrl_but_not_if() {
        let (mut hfxo, mut sched) = setup();
        hfxo.write(offsets::LOCK, 0, &mut sched);
        assert!(hfxo.is_locked());
        assert_ne!(hfxo.read(offsets::STATUS) & (1 << status::LOCK), 0);

        assert_eq!(
            hfxo.write_register(offsets::CTRL, 1, &mut sched),
            Err(ClockError::LockViolation { block: "HFXO0", offset: offsets::CTRL })
        );
        hfxo.write(offsets::CTRL, 1, &mut sched);
        assert!(!hfxo.osc().force_enabled());

        hfxo.write(offsets::IEN, int_bits::RDY, &mut sched);
        assert_eq!(hfxo.read(offsets::IEN), int_bits::RDY);

        hfxo.write(offsets::LOCK, keys::HFXO as u32, &mut sched);
        hfxo.write(offsets::CTRL, 1, &mut sched);
        assert!(hfxo.osc().force_enabled());
        assert_eq!(hfxo.read(offsets::LOCK), 0);
    }

    #[test]
    fn test_prs_status_bits() {
        let (mut hfxo, mut sched) = setup();
        hfxo.osc_mut().on_request(WakeUpSource::Prs, &mut sched);
        assert_ne!(hfxo.read(offsets::STATUS) & (1 << status::PRSHWREQ), 0);

        expire(&mut hfxo, &mut sched, 4);
        let st = hfxo.read(offsets::STATUS);
        assert_ne!(st & (1 << status::PRSRDY), 0);
        assert_eq!(st & (1 << status::RDY), 0);
        assert_ne!(hfxo.read(offsets::IF) & int_bits::PRSRDY, 0);
        assert_eq!(hfxo.osc().state(), OscState::CoreBiasPending);
    }

    #[test]
    fn test_cmd_corebias_and_override() {
        let (mut hfxo, mut sched) = setup();
        hfxo.write(CLEAR_OFFSET + offsets::CTRL, 1 << CTRL_DISONDEMAND, &mut sched);
        assert_ne!(hfxo.read(offsets::STATUS) & (1 << status::FSMLOCK), 0);

        hfxo.write(offsets::CTRL, 0b11, &mut sched);
        hfxo.write(offsets::CMD, 1 << CMD_COREBIASOPT, &mut sched);
        assert_ne!(hfxo.read(offsets::IF) & int_bits::COREBIASOPTRDY, 0);

        hfxo.write(offsets::CMD, 1 << CMD_MANUALOVERRIDE, &mut sched);
        assert_eq!(hfxo.read(offsets::STATUS) & (1 << status::FSMLOCK), 0);
    }

    #[test]
    fn test_swrst_returns_to_reset() {
        let (mut hfxo, mut sched) = setup();
        hfxo.write(offsets::CFG, 0x1234, &mut sched);
        hfxo.write(offsets::CTRL, 1, &mut sched);
        hfxo.write(offsets::SWRST, 1, &mut sched);
        assert_eq!(hfxo.read(offsets::CFG), 0x1000_0000);
        assert_eq!(hfxo.osc().state(), OscState::Idle);
        assert!(!sched.is_active(EventId::HfxoStartup));
    }

    #[test]
    fn test_alias_windows_on_writable_registers() {
        let (mut hfxo, mut sched) = setup();
        for offset in [offsets::XTALCFG, offsets::XTALCTRL, offsets::CFG, offsets::IEN] {
            hfxo.write(offset, 0x00F0_F0F0, &mut sched);
            hfxo.write(SET_OFFSET + offset, 0x0000_000F, &mut sched);
            assert_eq!(hfxo.read(offset), 0x00F0_F0FF, "set {offset:#x}");
            hfxo.write(CLEAR_OFFSET + offset, 0x00F0_0000, &mut sched);
            assert_eq!(hfxo.read(offset), 0x0000_F0FF, "clear {offset:#x}");
            hfxo.write(TOGGLE_OFFSET + offset, 0x0000_FFFF, &mut sched);
            assert_eq!(hfxo.read(offset), 0x0000_0F00, "toggle {offset:#x}");
        }
    }
}
