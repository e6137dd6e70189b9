//! Virtual timeline for oscillator start-up and PLL lock delays
//!
//! Time is a counter of 512 MHz base ticks that only moves when the host
//! calls [`Scheduler::advance`]. 512 MHz is a common multiple of the
//! 32.768 kHz start-up timer clock and a 1 MHz microsecond clock, so both
//! convert to base ticks without rounding.

use serde::Serialize;
use tracing::debug;

pub const SCHED_BASE_CLOCK_RATE: u64 = 512_000_000;

/// Units the host can advance time in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockId {
    /// Start-up timer clock
    Clock32K,
    /// Microseconds
    Clock1M,
}

impl ClockId {
    pub fn rate(self) -> u64 {
        match self {
            ClockId::Clock32K => 32_768,
            ClockId::Clock1M => 1_000_000,
        }
    }

    pub fn base_ticks_per_tick(self) -> u64 {
        SCHED_BASE_CLOCK_RATE / self.rate()
    }
}

/// One timer per oscillator block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventId {
    HfxoStartup,
    LfxoStartup,
    HfrcoStartup,
    HfrcoEm23Startup,
    DpllLock,
    SocpllLock,
}

impl EventId {
    pub const COUNT: usize = 6;

    /// Indexed by discriminant
    pub const ALL: [EventId; Self::COUNT] = [
        EventId::HfxoStartup,
        EventId::LfxoStartup,
        EventId::HfrcoStartup,
        EventId::HfrcoEm23Startup,
        EventId::DpllLock,
        EventId::SocpllLock,
    ];
}

/// Deadline bit marking a timer as disarmed
const DISARMED: u64 = 1 << 63;

/// One-shot timers for every [`EventId`], all counted in 32.768 kHz ticks.
///
/// A timer fires at most once per arming: the handler that consumes an
/// expiry disarms it, and arming again replaces any pending deadline.
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// Absolute deadline per event in base ticks; `DISARMED` bit when idle
    deadlines: [u64; EventId::COUNT],
    now: u64,
}

impl Scheduler {
    /// Timer domain of every oscillator delay
    const TIMER_CLOCK: ClockId = ClockId::Clock32K;

    pub fn new() -> Self {
        Self {
            deadlines: [DISARMED; EventId::COUNT],
            now: 0,
        }
    }

    /// Disarm everything and rewind to time zero
    pub fn reset(&mut self) {
        self.deadlines = [DISARMED; EventId::COUNT];
        self.now = 0;
    }

    /// Current time in base ticks
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move time forward by `ticks` of `clock`
    pub fn advance(&mut self, ticks: u64, clock: ClockId) {
        self.now = self
            .now
            .saturating_add(ticks.saturating_mul(clock.base_ticks_per_tick()));
    }

    /// Arm `event` to expire `ticks` timer ticks from now, replacing any
    /// earlier arming
    pub fn set(&mut self, event: EventId, ticks: u64) {
        let delay = ticks.saturating_mul(Self::TIMER_CLOCK.base_ticks_per_tick());
        let deadline = self.now.saturating_add(delay) & !DISARMED;
        if self.is_active(event) {
            debug!(?event, "pending expiry replaced");
        }
        self.deadlines[event as usize] = deadline;
        debug!(?event, ticks, deadline, "timer armed");
    }

    pub fn clear(&mut self, event: EventId) {
        if self.is_active(event) {
            debug!(?event, "timer disarmed");
        }
        self.deadlines[event as usize] |= DISARMED;
    }

    pub fn is_active(&self, event: EventId) -> bool {
        self.deadlines[event as usize] & DISARMED == 0
    }

    /// Whole timer ticks left before `event` expires; 0 if disarmed or due
    pub fn ticks_remaining(&self, event: EventId) -> u64 {
        if !self.is_active(event) {
            return 0;
        }
        self.deadlines[event as usize]
            .saturating_sub(self.now)
            .div_ceil(Self::TIMER_CLOCK.base_ticks_per_tick())
    }

    /// Armed and past its deadline
    pub fn has_fired(&self, event: EventId) -> bool {
        self.is_active(event) && self.deadlines[event as usize] <= self.now
    }

    /// Earliest due expiry still waiting for its handler
    pub fn next_pending_event(&self) -> Option<EventId> {
        EventId::ALL
            .into_iter()
            .filter(|&event| self.has_fired(event))
            .min_by_key(|&event| self.deadlines[event as usize])
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
