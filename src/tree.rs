//! Clock tree orchestrator
//!
//! Owns the CMU, every oscillator block and the virtual scheduler. Register
//! accesses are routed to the addressed block, CMU write effects are carried
//! out (bus faults, the HFXO clock-select hook), start-up expiries are
//! delivered, and oscillator demand is re-evaluated after every change.

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, Oscillator};
use crate::config::{ClockConfig, CmuVariant};
use crate::consumers::{ConsumerFlags, ConsumerId, Consumers};
use crate::oscillator::{Completion, HfxoRequester, OscillatorController, OscillatorKind};
use crate::peripherals::{Block, Cmu, CmuEffect, CmuSnapshot, Dpll, Hfrco, Hfxo, Lfxo, Socpll};
use crate::peripherals::EXCP_PREFETCH_ABORT;
use crate::registers::RegisterBackedPeripheral;
use crate::scheduler::{ClockId, EventId, Scheduler};

/// Receiver of CPU exceptions raised by the clock tree
pub trait CpuExceptionSink {
    fn raise_exception(&mut self, exception: u32);
}

/// Used until a CPU is attached
#[derive(Debug, Default)]
pub struct NoCpu;

impl CpuExceptionSink for NoCpu {
    fn raise_exception(&mut self, exception: u32) {
        warn!(exception, "no CPU attached, exception dropped");
    }
}

/// Callback run every time the HFXO becomes ready
pub type HfxoSubscriber = Box<dyn FnMut() + Send>;

/// Consumer `Enabled` flags as the request graph sees them. The DPLL's
/// flag is its own EN bit; SOCPLL reports its reference selection.
struct ConsumerView<'a> {
    flags: &'a ConsumerFlags,
    dpll: Option<&'a Dpll>,
    socpll: Option<&'a Socpll>,
}

impl Consumers for ConsumerView<'_> {
    fn is_enabled(&self, consumer: ConsumerId) -> bool {
        match consumer {
            ConsumerId::Dpll0 => self.dpll.map_or(false, Dpll::is_enabled),
            _ => self.flags.get(consumer),
        }
    }

    fn socpll_uses_hfxo(&self) -> bool {
        self.socpll.map_or(false, Socpll::is_using_hfxo)
    }
}

pub struct ClockTree {
    config: ClockConfig,
    /// Start-up and lock delays
    scheduler: Scheduler,
    cmu: Cmu,
    hfxo: Hfxo,
    lfxo: Lfxo,
    hfrco: Hfrco,
    hfrco_em23: Hfrco,
    /// Absent when the device has no DPLL
    dpll: Option<Dpll>,
    /// Variant 8 only
    socpll: Option<Socpll>,
    /// External peripherals' `Enabled` flags
    consumers: ConsumerFlags,
    cpu: Box<dyn CpuExceptionSink + Send>,
    hfxo_subscribers: Vec<HfxoSubscriber>,
}

impl ClockTree {
    /// Create a clock tree with no CPU attached
    pub fn new(config: ClockConfig) -> Self {
        Self::with_cpu(config, Box::new(NoCpu))
    }

    pub fn with_cpu(config: ClockConfig, cpu: Box<dyn CpuExceptionSink + Send>) -> Self {
        let socpll = match config.variant {
            CmuVariant::V8 => Some(Socpll::new(config.socpll_lock_ticks)),
            CmuVariant::V3 => None,
        };
        let dpll = config.dpll_present.then(|| Dpll::new(config.dpll_lock_ticks));

        info!(variant = %config.variant, dpll = config.dpll_present, "clock tree created");
        let mut tree = Self {
            scheduler: Scheduler::new(),
            cmu: Cmu::new(config.variant, config.dpll_n, config.dpll_m),
            hfxo: Hfxo::new(config.hfxo_startup_ticks),
            lfxo: Lfxo::new(config.lfxo_startup_ticks),
            hfrco: Hfrco::new(OscillatorKind::Hfrco, config.hfrco_startup_ticks),
            hfrco_em23: Hfrco::new(OscillatorKind::HfrcoEm23, config.hfrco_em23_startup_ticks),
            dpll,
            socpll,
            consumers: ConsumerFlags::new(),
            cpu,
            hfxo_subscribers: Vec::new(),
            config,
        };
        tree.sync_demand();
        tree
    }

    /// Replace the exception receiver
    pub fn attach_cpu(&mut self, cpu: Box<dyn CpuExceptionSink + Send>) {
        self.cpu = cpu;
    }

    /// Machine reset. Consumer flags belong to the peripherals and are kept,
    /// as are HFXO subscriptions.
    pub fn reset(&mut self) {
        info!("clock tree reset");
        self.scheduler.reset();
        self.cmu.reset();
        self.hfxo.reset(&mut self.scheduler);
        self.lfxo.reset(&mut self.scheduler);
        self.hfrco.reset(&mut self.scheduler);
        self.hfrco_em23.reset(&mut self.scheduler);
        if let Some(dpll) = self.dpll.as_mut() {
            dpll.reset(&mut self.scheduler);
        }
        if let Some(socpll) = self.socpll.as_mut() {
            socpll.reset(&mut self.scheduler);
        }
        self.sync_demand();
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn cmu(&self) -> &Cmu {
        &self.cmu
    }

    pub fn hfxo(&self) -> &Hfxo {
        &self.hfxo
    }

    pub fn lfxo(&self) -> &Lfxo {
        &self.lfxo
    }

    pub fn hfrco(&self) -> &Hfrco {
        &self.hfrco
    }

    pub fn hfrco_em23(&self) -> &Hfrco {
        &self.hfrco_em23
    }

    pub fn dpll(&self) -> Option<&Dpll> {
        self.dpll.as_ref()
    }

    pub fn socpll(&self) -> Option<&Socpll> {
        self.socpll.as_ref()
    }

    fn view(&self) -> ConsumerView<'_> {
        ConsumerView {
            flags: &self.consumers,
            dpll: self.dpll.as_ref(),
            socpll: self.socpll.as_ref(),
        }
    }

    // ========== Register access ==========

    /// Bus read at `offset` inside `block`'s window
    pub fn read(&self, block: Block, offset: u32) -> u32 {
        match block {
            Block::Cmu => self.cmu.read(offset),
            Block::Hfxo => self.hfxo.read(offset),
            Block::Lfxo => self.lfxo.read(offset),
            Block::Hfrco => self.hfrco.read(offset),
            Block::HfrcoEm23 => self.hfrco_em23.read(offset),
            Block::Dpll => self.dpll.as_ref().map_or_else(|| absent(block), |dpll| dpll.read(offset)),
            Block::Socpll => self
                .socpll
                .as_ref()
                .map_or_else(|| absent(block), |socpll| socpll.read(offset)),
        }
    }

    /// Bus write at `offset` inside `block`'s window
    pub fn write(&mut self, block: Block, offset: u32, value: u32) {
        let hfxo_was_ready = self.hfxo.osc().is_ready();
        let sched = &mut self.scheduler;
        match block {
            Block::Cmu => {
                let effect = self.cmu.write(offset, value, sched);
                self.apply_cmu_effect(effect);
            }
            Block::Hfxo => self.hfxo.write(offset, value, sched),
            Block::Lfxo => self.lfxo.write(offset, value, sched),
            Block::Hfrco => self.hfrco.write(offset, value, sched),
            Block::HfrcoEm23 => self.hfrco_em23.write(offset, value, sched),
            Block::Dpll => match self.dpll.as_mut() {
                Some(dpll) => dpll.write(offset, value, sched),
                None => {
                    absent(block);
                }
            },
            Block::Socpll => match self.socpll.as_mut() {
                Some(socpll) => socpll.write(offset, value, sched),
                None => {
                    absent(block);
                }
            },
        }
        self.sync_demand();
        self.notify_if_hfxo_became_ready(hfxo_was_ready);
    }

    fn apply_cmu_effect(&mut self, effect: CmuEffect) {
        match effect {
            CmuEffect::None => {}
            CmuEffect::BusFault => self.cpu.raise_exception(EXCP_PREFETCH_ABORT),
            CmuEffect::SysclkSelected(Clock::Hfxo) => {
                self.hfxo.osc_mut().on_clksel();
            }
            CmuEffect::SysclkSelected(clock) => debug!(?clock, "SYSCLK selected"),
        }
    }

    // ========== Simulated time ==========

    /// Advance simulated time and deliver every start-up expiry that is due
    pub fn advance(&mut self, ticks: u64, clock: ClockId) {
        self.scheduler.advance(ticks, clock);

        while let Some(event) = self.scheduler.next_pending_event() {
            let sched = &mut self.scheduler;
            let osc = match event {
                EventId::HfxoStartup => Some(self.hfxo.osc_mut()),
                EventId::LfxoStartup => Some(self.lfxo.osc_mut()),
                EventId::HfrcoStartup => Some(self.hfrco.osc_mut()),
                EventId::HfrcoEm23Startup => Some(self.hfrco_em23.osc_mut()),
                EventId::DpllLock => self.dpll.as_mut().map(Dpll::osc_mut),
                EventId::SocpllLock => self.socpll.as_mut().map(Socpll::osc_mut),
            };
            let Some(osc) = osc else {
                // Block not present on this device
                sched.clear(event);
                continue;
            };

            let hfxo_ready = match osc.on_timer_expired(sched) {
                Ok(completion) => {
                    event == EventId::HfxoStartup && completion == Some(Completion::Ready)
                }
                Err(err) => {
                    error!(osc = osc.kind().name(), "{err}");
                    false
                }
            };

            self.sync_demand();
            if hfxo_ready {
                self.notify_hfxo_enabled();
            }
        }
    }

    // ========== Demand ==========

    /// Push the CMU's current demand into every on-demand oscillator
    fn sync_demand(&mut self) {
        let hfxo = self.osc_requested(Oscillator::Hfxo);
        let lfxo = self.osc_requested(Oscillator::Lfxo);
        let hfrco = self.osc_requested(Oscillator::Hfrco);
        let hfrco_em23 = self.osc_requested(Oscillator::HfrcoEm23);
        let socpll = self.osc_socpll_requested(0);

        let sched = &mut self.scheduler;
        self.hfxo.osc_mut().update_demand(hfxo, sched);
        self.lfxo.osc_mut().update_demand(lfxo, sched);
        self.hfrco.osc_mut().update_demand(hfrco, sched);
        self.hfrco_em23.osc_mut().update_demand(hfrco_em23, sched);
        if let Some(pll) = self.socpll.as_mut() {
            pll.osc_mut().update_demand(socpll, sched);
        }
    }

    /// Set an external peripheral's `Enabled` flag. The DPLL0 entry is
    /// ignored; the DPLL block's EN bit stands in for it.
    pub fn set_consumer_enabled(&mut self, consumer: ConsumerId, enabled: bool) {
        self.consumers.set(consumer, enabled);
        self.sync_demand();
    }

    // ========== Queries ==========

    pub fn osc_requested(&self, osc: Oscillator) -> bool {
        self.cmu.osc_requested(osc, &self.view())
    }

    pub fn osc_enabled(&self, osc: Oscillator) -> bool {
        self.cmu.osc_enabled(osc)
    }

    pub fn osc_socpll_requested(&self, instance: u32) -> bool {
        self.cmu.osc_socpll_requested(instance, &self.view())
    }

    pub fn osc_socpll_enabled(&self, instance: u32) -> bool {
        self.cmu.osc_socpll_enabled(instance)
    }

    pub fn osc_perpll_requested(&self, instance: u32) -> bool {
        self.cmu.osc_perpll_requested(instance)
    }

    pub fn osc_perpll_enabled(&self, instance: u32) -> bool {
        self.cmu.osc_perpll_enabled(instance)
    }

    /// Interrupt line of `block`
    pub fn irq_pending(&self, block: Block) -> bool {
        match block {
            Block::Cmu => self.cmu.irq(),
            _ => self.controller(block).map_or(false, OscillatorController::irq),
        }
    }

    fn controller(&self, block: Block) -> Option<&OscillatorController> {
        match block {
            Block::Cmu => None,
            Block::Hfxo => Some(self.hfxo.osc()),
            Block::Lfxo => Some(self.lfxo.osc()),
            Block::Hfrco => Some(self.hfrco.osc()),
            Block::HfrcoEm23 => Some(self.hfrco_em23.osc()),
            Block::Dpll => self.dpll.as_ref().map(Dpll::osc),
            Block::Socpll => self.socpll.as_ref().map(Socpll::osc),
        }
    }

    // ========== Notifications ==========

    /// Hardware wakeup request for the HFXO. Returns whether it was accepted;
    /// a request while another wakeup is in flight is dropped.
    pub fn on_request(&mut self, requester: HfxoRequester) -> bool {
        let accepted = self.hfxo.osc_mut().on_request(requester.into(), &mut self.scheduler);
        self.sync_demand();
        accepted
    }

    /// HFXO selected as a clock somewhere other than SYSCLKCTRL
    pub fn on_clksel(&mut self) {
        let hfxo_was_ready = self.hfxo.osc().is_ready();
        self.hfxo.osc_mut().on_clksel();
        self.sync_demand();
        self.notify_if_hfxo_became_ready(hfxo_was_ready);
    }

    pub fn on_em2_wakeup(&mut self) {
        warn!("HFXO EM2 wakeup handshake is not modeled");
        self.notify_hfxo_enabled();
    }

    /// Register a callback for every time the HFXO becomes ready
    pub fn subscribe_hfxo_enabled<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.hfxo_subscribers.push(Box::new(callback));
    }

    fn notify_if_hfxo_became_ready(&mut self, was_ready: bool) {
        if !was_ready && self.hfxo.osc().is_ready() {
            self.notify_hfxo_enabled();
        }
    }

    fn notify_hfxo_enabled(&mut self) {
        debug!(subscribers = self.hfxo_subscribers.len(), "HFXO enabled");
        for subscriber in &mut self.hfxo_subscribers {
            subscriber();
        }
    }

    // ========== Snapshot ==========

    /// Serialisable view of the oscillator FSMs, the CMU selects and the
    /// requested/enabled table
    pub fn snapshot(&self) -> Value {
        let clock_requests: Vec<Value> = Oscillator::ALL
            .iter()
            .map(|&osc| {
                json!({
                    "oscillator": osc,
                    "requested": self.osc_requested(osc),
                    "enabled": self.osc_enabled(osc),
                })
            })
            .collect();

        json!({
            "variant": self.config.variant,
            "cmu": CmuSnapshot::from(&self.cmu),
            "hfxo": self.hfxo.osc(),
            "lfxo": self.lfxo.osc(),
            "hfrco": self.hfrco.osc(),
            "hfrco_em23": self.hfrco_em23.osc(),
            "dpll": self.dpll.as_ref().map(Dpll::osc),
            "socpll": self.socpll.as_ref().map(Socpll::osc),
            "clock_requests": clock_requests,
            "consumers": self.consumers,
        })
    }
}

impl Default for ClockTree {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

fn absent(block: Block) -> u32 {
    debug!(block = block.name(), "access to a block this device does not have");
    0
}
