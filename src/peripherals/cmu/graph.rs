//! Oscillator request graph
//!
//! An oscillator is requested when at least one of its terms holds. Terms
//! and consumer groups are plain data, one [`GraphTable`] per CMU variant,
//! walked by [`requested`]. Nothing is cached: every query re-reads the
//! current select fields, CLKEN bits and consumer flags.

use crate::clock::{Clock, Oscillator};
use crate::consumers::{ConsumerId, Consumers};

use super::layout::Mux;

/// Live register state the evaluator reads
pub trait GraphInputs {
    /// Decoded value of a select field; `Disabled` if the variant lacks it
    fn select(&self, mux: Mux) -> Clock;

    /// CLKEN bit of a consumer; false if the variant has none
    fn clken(&self, consumer: ConsumerId) -> bool;

    /// CLKEN bit of an oscillator
    fn osc_clken(&self, osc: Oscillator) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// The mux selects the clock
    Select(Mux, Clock),
    /// The group mux selects the clock and the group has a live member
    Group(Mux, Clock),
    /// The consumer is enabled, clocked, and its mux selects the clock
    Consumer(ConsumerId, Mux, Clock),
    /// SOCPLL0 is enabled, requested, and running off the HFXO
    SocpllReference,
}

/// A consumer clocked from a group clock
#[derive(Debug)]
pub struct Member {
    pub consumer: ConsumerId,
    /// Own select field, for members that can bypass the group
    pub select: Option<(Mux, Clock)>,
}

#[derive(Debug)]
pub struct Group {
    pub mux: Mux,
    pub members: &'static [Member],
}

#[derive(Debug)]
pub struct GraphTable {
    pub groups: &'static [Group],
    pub requested: &'static [(Oscillator, &'static [Term])],
}

impl GraphTable {
    pub fn terms(&self, osc: Oscillator) -> &'static [Term] {
        self.requested
            .iter()
            .find(|(o, _)| *o == osc)
            .map(|(_, terms)| *terms)
            .unwrap_or(&[])
    }

    pub fn group(&self, mux: Mux) -> Option<&Group> {
        self.groups.iter().find(|group| group.mux == mux)
    }
}

/// Whether any member of the group driven by `mux` currently uses it
pub fn group_live(
    table: &GraphTable,
    mux: Mux,
    inputs: &dyn GraphInputs,
    consumers: &dyn Consumers,
) -> bool {
    let Some(group) = table.group(mux) else {
        return false;
    };
    group.members.iter().any(|member| {
        consumers.is_enabled(member.consumer)
            && inputs.clken(member.consumer)
            && member
                .select
                .map_or(true, |(mux, clock)| inputs.select(mux) == clock)
    })
}

pub fn term_holds(
    table: &GraphTable,
    term: &Term,
    inputs: &dyn GraphInputs,
    consumers: &dyn Consumers,
) -> bool {
    match *term {
        Term::Select(mux, clock) => inputs.select(mux) == clock,
        Term::Group(mux, clock) => {
            inputs.select(mux) == clock && group_live(table, mux, inputs, consumers)
        }
        Term::Consumer(consumer, mux, clock) => {
            consumers.is_enabled(consumer) && inputs.clken(consumer) && inputs.select(mux) == clock
        }
        Term::SocpllReference => {
            inputs.osc_clken(Oscillator::Socpll)
                && requested(table, Oscillator::Socpll, inputs, consumers)
                && consumers.socpll_uses_hfxo()
        }
    }
}

pub fn requested(
    table: &GraphTable,
    osc: Oscillator,
    inputs: &dyn GraphInputs,
    consumers: &dyn Consumers,
) -> bool {
    table
        .terms(osc)
        .iter()
        .any(|term| term_holds(table, term, inputs, consumers))
}

/// Export, calibration and any extra terms for one clock
macro_rules! terms {
    ($clock:expr; $($term:expr),* $(,)?) => {
        &[
            Term::Select(Mux::Clkout0, $clock),
            Term::Select(Mux::Clkout1, $clock),
            Term::Select(Mux::Clkout2, $clock),
            Term::Select(Mux::CalUp, $clock),
            Term::Select(Mux::CalDown, $clock),
            $($term),*
        ] as &[Term]
    };
}

const fn member(consumer: ConsumerId) -> Member {
    Member { consumer, select: None }
}

const fn selected(consumer: ConsumerId, mux: Mux, clock: Clock) -> Member {
    Member {
        consumer,
        select: Some((mux, clock)),
    }
}

use self::Term::{Consumer, Group as Grp, Select};
use crate::clock::Clock as C;
use crate::consumers::ConsumerId as Id;

pub static GRAPH_3: GraphTable = GraphTable {
    groups: &[
        Group {
            mux: Mux::Em01Grpa,
            members: &[
                selected(Id::Iadc0, Mux::Adc, C::Em01GrpaClk),
                selected(Id::Vdac0, Mux::Vdac0, C::Em01GrpaClk),
                selected(Id::Vdac1, Mux::Vdac1, C::Em01GrpaClk),
                member(Id::Timer0),
                member(Id::Timer1),
                member(Id::Timer2),
                member(Id::Timer3),
                member(Id::Timer4),
            ],
        },
        Group {
            mux: Mux::Em01Grpc,
            members: &[
                selected(Id::Eusart0, Mux::Eusart0, C::Em01GrpcClk),
                member(Id::Eusart1),
            ],
        },
        // VDAC0 is not a member: its slot is taken by VDAC1
        Group {
            mux: Mux::Em23Grpa,
            members: &[
                member(Id::Letimer0),
                selected(Id::Pcnt0, Mux::Pcnt0, C::Em23GrpaClk),
                selected(Id::Vdac1, Mux::Vdac1, C::Em23GrpaClk),
            ],
        },
        Group {
            mux: Mux::Em4Grpa,
            members: &[member(Id::Burtc)],
        },
    ],
    requested: &[
        (
            Oscillator::Lfrco,
            terms![C::Lfrco;
                Grp(Mux::Em23Grpa, C::Lfrco),
                Grp(Mux::Em4Grpa, C::Lfrco),
                Consumer(Id::Wdog0, Mux::Wdog0, C::Lfrco),
                Consumer(Id::Wdog1, Mux::Wdog1, C::Lfrco),
                Consumer(Id::Eusart0, Mux::Eusart0, C::Lfrco),
                Consumer(Id::Sysrtc0, Mux::Sysrtc0, C::Lfrco),
            ],
        ),
        (
            Oscillator::Hfrco,
            terms![C::HfrcoDpll;
                Select(Mux::Sysclk, C::HfrcoDpll),
                Grp(Mux::Em01Grpa, C::HfrcoDpll),
                Grp(Mux::Em01Grpc, C::HfrcoDpll),
            ],
        ),
        (
            Oscillator::HfrcoEm23,
            terms![C::HfrcoEm23;
                Select(Mux::Trace, C::HfrcoEm23),
                Grp(Mux::Em01Grpa, C::HfrcoEm23),
                Grp(Mux::Em01Grpc, C::HfrcoEm23),
                Consumer(Id::Iadc0, Mux::Adc, C::HfrcoEm23),
                Consumer(Id::Eusart0, Mux::Eusart0, C::HfrcoEm23),
                Consumer(Id::Vdac0, Mux::Vdac0, C::HfrcoEm23),
                Consumer(Id::Vdac1, Mux::Vdac1, C::HfrcoEm23),
            ],
        ),
        (
            Oscillator::Hfxo,
            terms![C::Hfxo;
                Select(Mux::Sysclk, C::Hfxo),
                Consumer(Id::Dpll0, Mux::DpllRef, C::Hfxo),
                Grp(Mux::Em01Grpa, C::Hfxo),
                Grp(Mux::Em01Grpc, C::Hfxo),
            ],
        ),
        (
            Oscillator::Lfxo,
            terms![C::Lfxo;
                Consumer(Id::Dpll0, Mux::DpllRef, C::Lfxo),
                Grp(Mux::Em23Grpa, C::Lfxo),
                Grp(Mux::Em4Grpa, C::Lfxo),
                Consumer(Id::Wdog0, Mux::Wdog0, C::Lfxo),
                Consumer(Id::Wdog1, Mux::Wdog1, C::Lfxo),
                Consumer(Id::Eusart0, Mux::Eusart0, C::Lfxo),
                Consumer(Id::Sysrtc0, Mux::Sysrtc0, C::Lfxo),
            ],
        ),
    ],
};

pub static GRAPH_8: GraphTable = GraphTable {
    groups: &[
        Group {
            mux: Mux::Em01Grpa,
            members: &[
                selected(Id::Adc0, Mux::Adc, C::Em01GrpaClk),
                member(Id::Timer0),
                member(Id::Timer1),
                member(Id::Timer2),
                member(Id::Timer3),
            ],
        },
        Group {
            mux: Mux::Em01Grpc,
            members: &[
                selected(Id::Eusart0, Mux::Eusart0, C::Em01GrpcClk),
                member(Id::Eusart1),
            ],
        },
        Group {
            mux: Mux::Em01Grpd,
            members: &[
                selected(Id::I2c0, Mux::I2c0, C::Em01GrpdClk),
                member(Id::I2c1),
            ],
        },
        Group {
            mux: Mux::Em23Grpa,
            members: &[
                member(Id::Letimer0),
                selected(Id::Pcnt0, Mux::Pcnt0, C::Em23GrpaClk),
            ],
        },
        Group {
            mux: Mux::Em4Grpa,
            members: &[member(Id::Burtc), member(Id::Etampdet)],
        },
    ],
    requested: &[
        (
            Oscillator::Lfrco,
            terms![C::Lfrco;
                Grp(Mux::Em23Grpa, C::Lfrco),
                Grp(Mux::Em4Grpa, C::Lfrco),
                Consumer(Id::Wdog0, Mux::Wdog0, C::Lfrco),
                Consumer(Id::Eusart0, Mux::Eusart0, C::Lfrco),
                Consumer(Id::Sysrtc0, Mux::Sysrtc0, C::Lfrco),
                Consumer(Id::I2c0, Mux::I2c0, C::Lfrco),
            ],
        ),
        (
            Oscillator::Hfrco,
            terms![C::HfrcoDpll;
                Select(Mux::Trace, C::HfrcoDpllRt),
                Select(Mux::Sysclk, C::HfrcoDpll),
                Grp(Mux::Em01Grpa, C::HfrcoDpll),
                Grp(Mux::Em01Grpa, C::HfrcoDpllRt),
                Grp(Mux::Em01Grpc, C::HfrcoDpll),
                Grp(Mux::Em01Grpc, C::HfrcoDpllRt),
                Grp(Mux::Em01Grpd, C::HfrcoDpll),
                // Matches HFXO, not HFRCODPLL
                Consumer(Id::Pixelrz0, Mux::Pixelrz, C::Hfxo),
            ],
        ),
        (
            Oscillator::HfrcoEm23,
            terms![C::HfrcoEm23;
                Select(Mux::Trace, C::HfrcoEm23),
                Grp(Mux::Em01Grpa, C::HfrcoEm23),
                Grp(Mux::Em01Grpc, C::HfrcoEm23),
                Grp(Mux::Em01Grpd, C::HfrcoEm23),
                Consumer(Id::Adc0, Mux::Adc, C::HfrcoEm23),
                Consumer(Id::Eusart0, Mux::Eusart0, C::HfrcoEm23),
                Consumer(Id::Pixelrz0, Mux::Pixelrz, C::Hfxo),
            ],
        ),
        (
            Oscillator::Hfxo,
            terms![C::Hfxo;
                Select(Mux::Sysclk, C::Hfxo),
                Consumer(Id::Dpll0, Mux::DpllRef, C::Hfxo),
                Term::SocpllReference,
                Grp(Mux::Em01Grpa, C::Hfxo),
                Grp(Mux::Em01Grpa, C::HfxoRt),
                Grp(Mux::Em01Grpc, C::Hfxo),
                Grp(Mux::Em01Grpc, C::HfxoRt),
                Grp(Mux::Em01Grpd, C::Hfxo),
                Consumer(Id::Pixelrz0, Mux::Pixelrz, C::Hfxo),
            ],
        ),
        (
            Oscillator::Lfxo,
            terms![C::Lfxo;
                Consumer(Id::Dpll0, Mux::DpllRef, C::Lfxo),
                Grp(Mux::Em23Grpa, C::Lfxo),
                Grp(Mux::Em4Grpa, C::Lfxo),
                Consumer(Id::Wdog0, Mux::Wdog0, C::Lfxo),
                Consumer(Id::Eusart0, Mux::Eusart0, C::Lfxo),
                Consumer(Id::Sysrtc0, Mux::Sysrtc0, C::Lfxo),
                // Matches LFRCO, not LFXO
                Consumer(Id::I2c0, Mux::I2c0, C::Lfrco),
            ],
        ),
        (
            Oscillator::Socpll,
            terms![C::Socpll;
                Select(Mux::Sysclk, C::Socpll),
            ],
        ),
    ],
};
