//! Oscillator lifecycle state machine
//!
//! One [`OscillatorController`] per oscillator. The register blocks in
//! `peripherals` translate CTRL/CMD writes into calls on it; the clock tree
//! feeds it the CMU's demand and delivers its start-up timer expiry.
//!
//! ```text
//!   Idle ──force / demand / OnRequest──▶ Starting ──expiry (Force, Demand)──▶ Ready
//!    ▲ │                                    │                                  ▲
//!    │ └─demand, DISONDEMAND set─▶ Requested  └─expiry (PRS, SYSRTC)─▶ CoreBiasPending
//!    │                                                          │   OnClksel  │
//!    └──────────────── no longer wanted ◀───────────────────────┴─────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ClockError, ClockResult};
use crate::scheduler::{EventId, Scheduler};

/// Interrupt flag bits shared by the oscillator blocks (IF/IEN layout)
pub mod int_bits {
    /// Ready (LOCK on the DPLL)
    pub const RDY: u32 = 1 << 0;
    pub const COREBIASOPTRDY: u32 = 1 << 1;
    pub const PRSRDY: u32 = 1 << 2;
    pub const SYSRTCRDY: u32 = 1 << 4;
}

/// Which oscillator a controller drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorKind {
    Hfxo,
    Lfxo,
    Hfrco,
    HfrcoEm23,
    Dpll,
    Socpll,
}

impl OscillatorKind {
    /// Block name used in logs
    pub fn name(self) -> &'static str {
        match self {
            OscillatorKind::Hfxo => "HFXO0",
            OscillatorKind::Lfxo => "LFXO",
            OscillatorKind::Hfrco => "HFRCO0",
            OscillatorKind::HfrcoEm23 => "HFRCOEM23",
            OscillatorKind::Dpll => "DPLL0",
            OscillatorKind::Socpll => "SOCPLL0",
        }
    }

    /// Scheduler event carrying this oscillator's start-up delay
    pub fn event(self) -> EventId {
        match self {
            OscillatorKind::Hfxo => EventId::HfxoStartup,
            OscillatorKind::Lfxo => EventId::LfxoStartup,
            OscillatorKind::Hfrco => EventId::HfrcoStartup,
            OscillatorKind::HfrcoEm23 => EventId::HfrcoEm23Startup,
            OscillatorKind::Dpll => EventId::DpllLock,
            OscillatorKind::Socpll => EventId::SocpllLock,
        }
    }

    /// Only the HFXO models the PRS/SYSRTC early-wakeup protocol
    fn completes_hardware_wake(self) -> bool {
        matches!(self, OscillatorKind::Hfxo)
    }
}

/// What started the current wakeup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeUpSource {
    #[default]
    None,
    Prs,
    Force,
    Sysrtc,
    /// A consumer selected this oscillator through the CMU
    Demand,
}

/// Hardware blocks that can ask the HFXO to wake up early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HfxoRequester {
    Prs,
    Sysrtc,
}

impl From<HfxoRequester> for WakeUpSource {
    fn from(req: HfxoRequester) -> Self {
        match req {
            HfxoRequester::Prs => WakeUpSource::Prs,
            HfxoRequester::Sysrtc => WakeUpSource::Sysrtc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OscState {
    #[default]
    Idle,
    /// Demanded, but DISONDEMAND keeps it off
    Requested,
    /// Start-up timer running
    Starting,
    /// Hardware requester served, waiting for the clock select
    CoreBiasPending,
    Ready,
}

/// Result of a start-up timer expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Oscillator is fully ready
    Ready,
    /// Source-specific ready bit set; waiting for OnClksel
    SourceReady(WakeUpSource),
}

#[derive(Debug, Clone, Serialize)]
pub struct OscillatorController {
    kind: OscillatorKind,
    state: OscState,
    force_enabled: bool,
    on_demand_disabled: bool,
    /// CMU demand as of the last update
    requested: bool,
    /// Hardware requester holding the oscillator on
    hardware_request: Option<WakeUpSource>,
    enabled: bool,
    ready: bool,
    core_bias_ready: bool,
    fsm_locked: bool,
    wake_source: WakeUpSource,
    prs_ready: bool,
    sysrtc_ready: bool,
    /// Start-up delay in 32 kHz ticks
    startup_delay_ticks: u32,
    if_flags: u32,
    ien: u32,
    #[serde(skip)]
    reset_on_demand_disabled: bool,
}

impl OscillatorController {
    pub fn new(kind: OscillatorKind, startup_delay_ticks: u32, on_demand_disabled: bool) -> Self {
        Self {
            kind,
            state: OscState::Idle,
            force_enabled: false,
            on_demand_disabled,
            requested: false,
            hardware_request: None,
            enabled: false,
            ready: false,
            core_bias_ready: false,
            fsm_locked: false,
            wake_source: WakeUpSource::None,
            prs_ready: false,
            sysrtc_ready: false,
            startup_delay_ticks,
            if_flags: 0,
            ien: 0,
            reset_on_demand_disabled: on_demand_disabled,
        }
    }

    /// Back to the power-on state with the timer disabled
    pub fn reset(&mut self, sched: &mut Scheduler) {
        sched.clear(self.kind.event());
        *self = Self::new(self.kind, self.startup_delay_ticks, self.reset_on_demand_disabled);
    }

    /// FORCEEN write
    pub fn set_force_enable(&mut self, value: bool, sched: &mut Scheduler) {
        if self.force_enabled == value {
            return;
        }
        self.force_enabled = value;
        self.settle(sched);
    }

    /// CTRL write carrying both FORCEEN and DISONDEMAND. The FSM settles
    /// once against the combined value; clearing DISONDEMAND re-arms the
    /// FSM lock.
    pub fn set_ctrl(&mut self, force: bool, disable_on_demand: bool, sched: &mut Scheduler) {
        let dod_changed = self.on_demand_disabled != disable_on_demand;
        if self.force_enabled == force && !dod_changed {
            return;
        }
        if dod_changed && !disable_on_demand {
            self.fsm_locked = true;
        }
        self.force_enabled = force;
        self.on_demand_disabled = disable_on_demand;
        self.settle(sched);
    }

    /// New CMU demand for this oscillator. Once a hardware wakeup has
    /// completed, the demand going away also releases the requester.
    pub fn update_demand(&mut self, requested: bool, sched: &mut Scheduler) {
        let dropped = self.requested && !requested;
        self.requested = requested;
        if self.state == OscState::Ready && dropped {
            self.hardware_request = None;
        }
        self.settle(sched);
    }

    /// Hardware wakeup request. The first requester wins: while a wakeup
    /// is in progress, or the oscillator already runs, the call is a no-op.
    /// Returns whether the request was accepted.
    pub fn on_request(&mut self, source: WakeUpSource, sched: &mut Scheduler) -> bool {
        if !matches!(self.state, OscState::Idle | OscState::Requested) {
            debug!(
                osc = self.kind.name(),
                state = ?self.state,
                current = ?self.wake_source,
                ignored = ?source,
                "wakeup already in progress, request dropped"
            );
            return false;
        }
        self.hardware_request = Some(source);
        self.start(source, sched);
        true
    }

    /// Start-up timer expiry. The timer is one-shot and is disabled here.
    pub fn on_timer_expired(&mut self, sched: &mut Scheduler) -> ClockResult<Option<Completion>> {
        sched.clear(self.kind.event());
        if self.state != OscState::Starting {
            debug!(osc = self.kind.name(), state = ?self.state, "stale start-up expiry");
            return Ok(None);
        }
        debug!(osc = self.kind.name(), source = ?self.wake_source, "start-up delay expired");

        match self.wake_source {
            WakeUpSource::Force | WakeUpSource::Demand => {
                self.become_ready();
                Ok(Some(Completion::Ready))
            }
            source @ (WakeUpSource::Prs | WakeUpSource::Sysrtc)
                if self.kind.completes_hardware_wake() =>
            {
                if source == WakeUpSource::Prs {
                    self.prs_ready = true;
                    self.if_flags |= int_bits::PRSRDY;
                } else {
                    self.sysrtc_ready = true;
                    self.if_flags |= int_bits::SYSRTCRDY;
                }
                self.set_state(OscState::CoreBiasPending);
                Ok(Some(Completion::SourceReady(source)))
            }
            source => Err(ClockError::UnimplementedWakeSource(source)),
        }
    }

    /// The CMU selected this oscillator as a clock. Completes a pending
    /// hardware wakeup; returns true if that made the oscillator ready.
    pub fn on_clksel(&mut self) -> bool {
        if self.state != OscState::CoreBiasPending {
            debug!(osc = self.kind.name(), state = ?self.state, "clock select with no pending wakeup");
            return false;
        }
        self.become_ready();
        true
    }

    /// CMD.COREBIASOPT
    pub fn core_bias_opt(&mut self) {
        self.core_bias_ready = true;
        self.if_flags |= int_bits::COREBIASOPTRDY;
    }

    /// CMD.MANUALOVERRIDE: drops the FSM lock only after a core-bias
    /// optimisation, with the oscillator forced on and demand disabled.
    pub fn manual_override(&mut self) {
        if self.core_bias_ready && self.force_enabled && self.on_demand_disabled {
            self.fsm_locked = false;
        }
    }

    pub fn set_interrupt_flags(&mut self, value: u32) {
        self.if_flags = value;
    }

    pub fn set_interrupt_enable(&mut self, value: u32) {
        self.ien = value;
    }

    pub fn interrupt_flags(&self) -> u32 {
        self.if_flags
    }

    pub fn interrupt_enable(&self) -> u32 {
        self.ien
    }

    /// Interrupt line level
    pub fn irq(&self) -> bool {
        self.if_flags & self.ien != 0
    }

    pub fn kind(&self) -> OscillatorKind {
        self.kind
    }

    pub fn state(&self) -> OscState {
        self.state
    }

    pub fn force_enabled(&self) -> bool {
        self.force_enabled
    }

    pub fn on_demand_disabled(&self) -> bool {
        self.on_demand_disabled
    }

    pub fn requested(&self) -> bool {
        self.requested
    }

    pub fn hardware_request(&self) -> Option<WakeUpSource> {
        self.hardware_request
    }

    /// ENS
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// RDY
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn core_bias_ready(&self) -> bool {
        self.core_bias_ready
    }

    pub fn fsm_locked(&self) -> bool {
        self.fsm_locked
    }

    pub fn wake_source(&self) -> WakeUpSource {
        self.wake_source
    }

    pub fn prs_ready(&self) -> bool {
        self.prs_ready
    }

    pub fn sysrtc_ready(&self) -> bool {
        self.sysrtc_ready
    }

    pub fn startup_delay_ticks(&self) -> u32 {
        self.startup_delay_ticks
    }

    /// Whether something currently holds the oscillator on
    fn wanted(&self) -> bool {
        self.force_enabled
            || (!self.on_demand_disabled && self.requested)
            || self.hardware_request.is_some()
    }

    /// Reconcile the state with the current force/demand inputs
    fn settle(&mut self, sched: &mut Scheduler) {
        if self.wanted() {
            if matches!(self.state, OscState::Idle | OscState::Requested) {
                let source = if self.force_enabled {
                    WakeUpSource::Force
                } else {
                    WakeUpSource::Demand
                };
                self.start(source, sched);
            }
            return;
        }

        if !matches!(self.state, OscState::Idle | OscState::Requested) {
            self.power_down(sched);
        }
        let parked = if self.requested && self.on_demand_disabled {
            OscState::Requested
        } else {
            OscState::Idle
        };
        self.set_state(parked);
    }

    fn start(&mut self, source: WakeUpSource, sched: &mut Scheduler) {
        self.enabled = true;
        self.ready = false;
        self.core_bias_ready = false;
        self.prs_ready = false;
        self.sysrtc_ready = false;
        self.wake_source = source;
        sched.set(self.kind.event(), self.startup_delay_ticks as u64);
        info!(osc = self.kind.name(), ?source, delay = self.startup_delay_ticks, "starting");
        self.set_state(OscState::Starting);
    }

    fn power_down(&mut self, sched: &mut Scheduler) {
        sched.clear(self.kind.event());
        self.enabled = false;
        self.ready = false;
        self.prs_ready = false;
        self.sysrtc_ready = false;
        self.wake_source = WakeUpSource::None;
        self.hardware_request = None;
        self.set_state(OscState::Idle);
    }

    fn become_ready(&mut self) {
        self.ready = true;
        self.core_bias_ready = true;
        self.if_flags |= int_bits::RDY;
        self.wake_source = WakeUpSource::None;
        self.set_state(OscState::Ready);
    }

    fn set_state(&mut self, state: OscState) {
        if self.state != state {
            info!(osc = self.kind.name(), from = ?self.state, to = ?state, "state change");
            self.state = state;
        }
    }
}
