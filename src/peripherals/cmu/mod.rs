//! Clock Management Unit
//!
//! Holds every clock-select field and CLKEN bit, answers the oscillator
//! demand queries through the request graph, and runs the calibration
//! counter. The register map differs between variants 3 and 8; see
//! [`layout`].
//!
//! Two writes escalate instead of being dropped quietly:
//! - SYSCLKCTRL while LOCK is locked
//! - WDOGnCLKCTRL while WDOGLOCK is locked
//!
//! Both are reported as [`CmuEffect::BusFault`]; the clock tree turns that
//! into a prefetch abort on the CPU.

pub mod graph;
pub mod layout;

use serde::Serialize;
use tracing::{debug, error};

use crate::calibration::{self, CALCNT_MAX};
use crate::clock::{Clock, Oscillator};
use crate::config::CmuVariant;
use crate::consumers::{ConsumerId, Consumers};
use crate::error::{ClockError, ClockResult};
use crate::lock::{keys, LockGuard};
use crate::registers::{bit, RegisterBackedPeripheral};
use crate::scheduler::Scheduler;

use graph::GraphInputs;
use layout::{CmuLayout, CmuReg, Mux, RegisterFile};

/// CPU exception raised for a locked clock-control write
pub const EXCP_PREFETCH_ABORT: u32 = 3;

/// STATUS bits
const STATUS_CALRDY: u32 = 0;
const STATUS_WDOGLOCK: u32 = 30;
const STATUS_LOCK: u32 = 31;

/// IF bits
pub const IF_CALRDY: u32 = 1 << 0;
pub const IF_CALOF: u32 = 1 << 1;

const CALCMD_CALSTART: u32 = 0;
const CALCMD_CALSTOP: u32 = 1;

/// What a CMU write asks the clock tree to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CmuEffect {
    #[default]
    None,
    /// A locked register was written
    BusFault,
    /// SYSCLKCTRL accepted a new selection
    SysclkSelected(Clock),
}

#[derive(Debug, Clone)]
pub struct Cmu {
    layout: &'static CmuLayout,
    regs: RegisterFile,
    lock: LockGuard,
    wdog_lock: LockGuard,
    dpll_n: u64,
    dpll_m: u64,
}

impl Cmu {
    const NAME: &'static str = "CMU";

    pub fn new(variant: CmuVariant, dpll_n: u64, dpll_m: u64) -> Self {
        let mut cmu = Self {
            layout: CmuLayout::for_variant(variant),
            regs: [0; CmuReg::COUNT],
            lock: LockGuard::new(keys::CMU),
            wdog_lock: LockGuard::new(keys::CMU),
            dpll_n,
            dpll_m,
        };
        cmu.reset();
        cmu
    }

    /// All registers to their reset values, both locks open
    pub fn reset(&mut self) {
        self.regs = [0; CmuReg::COUNT];
        for def in self.layout.registers {
            self.regs[def.reg as usize] = def.reset;
        }
        self.lock.reset();
        self.wdog_lock.reset();
    }

    pub fn variant(&self) -> CmuVariant {
        self.layout.variant
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn is_wdog_locked(&self) -> bool {
        self.wdog_lock.is_locked()
    }

    /// Current SYSCLK source
    pub fn sysclk(&self) -> Clock {
        self.select(Mux::Sysclk)
    }

    fn caltop(&self) -> u32 {
        self.layout.caltop.get(&self.regs)
    }

    /// Uncapped calibration count for the current CALCTRL setup
    fn raw_calibration_count(&self) -> u64 {
        calibration::raw_count(
            self.caltop(),
            self.select(Mux::CalUp),
            self.select(Mux::CalDown),
            self.dpll_n,
            self.dpll_m,
        )
    }

    /// CALCNT value
    pub fn calibration_count(&self) -> u32 {
        self.raw_calibration_count().min(CALCNT_MAX) as u32
    }

    pub fn osc_requested(&self, osc: Oscillator, consumers: &dyn Consumers) -> bool {
        graph::requested(self.layout.graph, osc, self, consumers)
    }

    /// The oscillator's CLKEN bit, independent of demand
    pub fn osc_enabled(&self, osc: Oscillator) -> bool {
        self.layout
            .osc_clken(osc)
            .map_or(false, |clken| clken.get(&self.regs))
    }

    /// Only SOCPLL0 exists; any other instance is never requested
    pub fn osc_socpll_requested(&self, instance: u32, consumers: &dyn Consumers) -> bool {
        instance == 0 && self.osc_requested(Oscillator::Socpll, consumers)
    }

    pub fn osc_socpll_enabled(&self, instance: u32) -> bool {
        instance == 0 && self.osc_enabled(Oscillator::Socpll)
    }

    /// No supported variant has a PERPLL
    pub fn osc_perpll_requested(&self, _instance: u32) -> bool {
        false
    }

    pub fn osc_perpll_enabled(&self, _instance: u32) -> bool {
        false
    }

    pub fn irq(&self) -> bool {
        self.regs[CmuReg::If as usize] & self.regs[CmuReg::Ien as usize] != 0
    }

    /// Decoded value of every select field the variant has
    pub fn mux_state(&self) -> Vec<(Mux, Clock)> {
        self.layout
            .muxes
            .iter()
            .map(|def| (def.mux, self.select(def.mux)))
            .collect()
    }

    fn status(&self) -> u32 {
        1 << STATUS_CALRDY
            | self.wdog_lock.status_bit() << STATUS_WDOGLOCK
            | self.lock.status_bit() << STATUS_LOCK
    }

    fn start_calibration(&mut self) {
        let raw = self.raw_calibration_count();
        debug!(
            top = self.caltop(),
            up = ?self.select(Mux::CalUp),
            down = ?self.select(Mux::CalDown),
            raw,
            "calibration run"
        );
        let flags = &mut self.regs[CmuReg::If as usize];
        *flags |= IF_CALRDY;
        if raw > CALCNT_MAX {
            *flags |= IF_CALOF;
        }
    }
}

impl GraphInputs for Cmu {
    fn select(&self, mux: Mux) -> Clock {
        self.layout
            .mux(mux)
            .map_or(Clock::Disabled, |def| def.decode(def.field.get(&self.regs)))
    }

    fn clken(&self, consumer: ConsumerId) -> bool {
        self.layout
            .consumer_clken(consumer)
            .map_or(false, |clken| clken.get(&self.regs))
    }

    fn osc_clken(&self, osc: Oscillator) -> bool {
        self.osc_enabled(osc)
    }
}

impl RegisterBackedPeripheral for Cmu {
    type Effect = CmuEffect;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read_register(&self, offset: u32) -> ClockResult<u32> {
        let def = self
            .layout
            .register_at(offset)
            .ok_or(ClockError::UnhandledOffset { block: Self::NAME, offset })?;
        Ok(match def.reg {
            CmuReg::Status => self.status(),
            // Write-only
            CmuReg::Lock | CmuReg::Wdoglock | CmuReg::Calcmd => 0,
            CmuReg::Calcnt => self.calibration_count(),
            reg => self.regs[reg as usize],
        })
    }

    fn write_register(&mut self, offset: u32, value: u32, _sched: &mut Scheduler) -> ClockResult<CmuEffect> {
        let reg = self
            .layout
            .register_at(offset)
            .ok_or(ClockError::UnhandledOffset { block: Self::NAME, offset })?
            .reg;

        match reg {
            CmuReg::Ipversion | CmuReg::Status | CmuReg::Calcnt => {
                return Err(ClockError::ReadOnly { block: Self::NAME, offset });
            }
            CmuReg::Lock => {
                self.lock.write(value);
            }
            CmuReg::Wdoglock => {
                self.wdog_lock.write(value);
            }
            CmuReg::Calcmd => {
                if bit(value, CALCMD_CALSTART) {
                    self.start_calibration();
                }
                if bit(value, CALCMD_CALSTOP) {
                    debug!("calibration stop");
                }
            }
            CmuReg::Sysclkctrl => {
                if self.lock.is_locked() {
                    error!("CMU is locked, BusFault!!");
                    return Ok(CmuEffect::BusFault);
                }
                self.regs[reg as usize] = value;
                return Ok(CmuEffect::SysclkSelected(self.sysclk()));
            }
            CmuReg::Wdog0clkctrl | CmuReg::Wdog1clkctrl => {
                if self.wdog_lock.is_locked() {
                    error!("CMU WDOGLOCK is locked, BusFault!!");
                    return Ok(CmuEffect::BusFault);
                }
                self.regs[reg as usize] = value;
            }
            _ => self.regs[reg as usize] = value,
        }
        Ok(CmuEffect::None)
    }
}

/// Serialisable view of the CMU
#[derive(Debug, Serialize)]
pub struct CmuSnapshot {
    pub variant: CmuVariant,
    pub locked: bool,
    pub wdog_locked: bool,
    pub muxes: Vec<(Mux, Clock)>,
    pub calibration_count: u32,
}

impl From<&Cmu> for CmuSnapshot {
    fn from(cmu: &Cmu) -> Self {
        Self {
            variant: cmu.variant(),
            locked: cmu.is_locked(),
            wdog_locked: cmu.is_wdog_locked(),
            muxes: cmu.mux_state(),
            calibration_count: cmu.calibration_count(),
        }
    }
}
