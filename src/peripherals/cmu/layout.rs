//! Per-variant CMU register layouts
//!
//! Register offsets, reset values, clock-select field positions and their
//! encodings, and the CLKEN bit of every consumer. The CMU code itself is
//! variant-agnostic and only ever goes through a [`CmuLayout`].

use serde::Serialize;

use super::graph::{self, GraphTable};
use crate::clock::{Clock, Oscillator};
use crate::config::CmuVariant;
use crate::consumers::ConsumerId;
use crate::registers::field;

/// CMU register storage slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CmuReg {
    Ipversion,
    Ctrl,
    Status,
    Lock,
    Wdoglock,
    If,
    Ien,
    Calcmd,
    Calctrl,
    Calcnt,
    Caltop,
    Clken0,
    Clken1,
    Sysclkctrl,
    Seclkctrl,
    Traceclkctrl,
    Exportclkctrl,
    Dpllrefclkctrl,
    Em01grpaclkctrl,
    Em01grpcclkctrl,
    Em01grpdclkctrl,
    Em23grpaclkctrl,
    Em4grpaclkctrl,
    Adcclkctrl,
    Wdog0clkctrl,
    Wdog1clkctrl,
    Eusart0clkctrl,
    Sysrtc0clkctrl,
    Vdac0clkctrl,
    Pcnt0clkctrl,
    Vdac1clkctrl,
    I2c0clkctrl,
    Pixelrzclkctrl,
    Clkenhv,
}

impl CmuReg {
    pub const COUNT: usize = 34;
}

/// Register storage indexed by [`CmuReg`]
pub type RegisterFile = [u32; CmuReg::COUNT];

/// A bit field inside one CMU register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub reg: CmuReg,
    pub shift: u32,
    pub width: u32,
}

impl Field {
    pub const fn new(reg: CmuReg, shift: u32, width: u32) -> Self {
        Self { reg, shift, width }
    }

    pub fn get(&self, regs: &RegisterFile) -> u32 {
        field(regs[self.reg as usize], self.shift, self.width)
    }
}

/// Clock-select multiplexers the request graph looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mux {
    Sysclk,
    CalUp,
    CalDown,
    Clkout0,
    Clkout1,
    Clkout2,
    Trace,
    DpllRef,
    Em01Grpa,
    Em01Grpc,
    Em01Grpd,
    Em23Grpa,
    Em4Grpa,
    Adc,
    Wdog0,
    Wdog1,
    Eusart0,
    Sysrtc0,
    Vdac0,
    Vdac1,
    Pcnt0,
    I2c0,
    Pixelrz,
}

#[derive(Debug)]
pub struct RegisterDef {
    pub reg: CmuReg,
    pub offset: u32,
    pub reset: u32,
}

/// A select field and its raw-value encoding
#[derive(Debug)]
pub struct MuxDef {
    pub mux: Mux,
    pub field: Field,
    /// Indexed by the raw field value
    pub decode: &'static [Clock],
}

impl MuxDef {
    /// Raw values past the end of the table have no meaning
    pub fn decode(&self, raw: u32) -> Clock {
        self.decode.get(raw as usize).copied().unwrap_or(Clock::Reserved)
    }
}

/// Location of an enable bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClkenBit {
    pub reg: CmuReg,
    pub bit: u32,
}

impl ClkenBit {
    const fn new(reg: CmuReg, bit: u32) -> Self {
        Self { reg, bit }
    }

    pub fn get(&self, regs: &RegisterFile) -> bool {
        regs[self.reg as usize] & (1 << self.bit) != 0
    }
}

#[derive(Debug)]
pub struct CmuLayout {
    pub variant: CmuVariant,
    pub registers: &'static [RegisterDef],
    pub muxes: &'static [MuxDef],
    /// CALTOP count field
    pub caltop: Field,
    pub consumer_clken: &'static [(ConsumerId, ClkenBit)],
    pub osc_clken: &'static [(Oscillator, ClkenBit)],
    pub graph: &'static GraphTable,
}

impl CmuLayout {
    pub fn for_variant(variant: CmuVariant) -> &'static CmuLayout {
        match variant {
            CmuVariant::V3 => &CMU_3,
            CmuVariant::V8 => &CMU_8,
        }
    }

    pub fn register_at(&self, offset: u32) -> Option<&RegisterDef> {
        self.registers.iter().find(|def| def.offset == offset)
    }

    pub fn has_register(&self, reg: CmuReg) -> bool {
        self.registers.iter().any(|def| def.reg == reg)
    }

    pub fn mux(&self, mux: Mux) -> Option<&MuxDef> {
        self.muxes.iter().find(|def| def.mux == mux)
    }

    pub fn consumer_clken(&self, consumer: ConsumerId) -> Option<ClkenBit> {
        self.consumer_clken
            .iter()
            .find(|(c, _)| *c == consumer)
            .map(|(_, bit)| *bit)
    }

    pub fn osc_clken(&self, osc: Oscillator) -> Option<ClkenBit> {
        self.osc_clken
            .iter()
            .find(|(o, _)| *o == osc)
            .map(|(_, bit)| *bit)
    }
}

const fn reg(reg: CmuReg, offset: u32, reset: u32) -> RegisterDef {
    RegisterDef { reg, offset, reset }
}

const fn mux(mux: Mux, reg: CmuReg, shift: u32, width: u32, decode: &'static [Clock]) -> MuxDef {
    MuxDef {
        mux,
        field: Field::new(reg, shift, width),
        decode,
    }
}

use crate::clock::Clock as C;
use self::CmuReg as R;

// Select-field encodings

const SYSCLK_3: &[Clock] = &[C::Reserved, C::Fsrco, C::HfrcoDpll, C::Hfxo, C::Clkin0];
const SYSCLK_8: &[Clock] = &[C::Reserved, C::Fsrco, C::HfrcoDpll, C::Hfxo, C::Clkin0, C::Socpll];

const UPSEL_3: &[Clock] = &[
    C::Disabled, C::Prs, C::Hfxo, C::Lfxo, C::HfrcoDpll, C::HfrcoEm23, C::Pfmosc,
    C::Biasosc, C::Fsrco, C::Lfrco, C::Ulfrco, C::Hfrcose, C::Temposc,
];
const DOWNSEL_3: &[Clock] = &[
    C::Disabled, C::Hclk, C::Prs, C::Hfxo, C::Lfxo, C::HfrcoDpll, C::HfrcoEm23, C::Pfmosc,
    C::Biasosc, C::Fsrco, C::Lfrco, C::Ulfrco, C::Hfrcose, C::Temposc,
];
/// Shared by UPSEL and DOWNSEL on variant 8
const CALSEL_8: &[Clock] = &[
    C::Disabled, C::Hclk, C::Prs, C::Hfxo, C::Lfxo, C::HfrcoDpll, C::HfrcoEm23, C::Fsrco,
    C::Lfrco, C::Ulfrco, C::HfrcoLpw, C::Socpll, C::Pfmosc, C::Biasosc, C::Hfrcose,
    C::Temposc, C::ClkoutHidden, C::ClktstLeddrv,
];

const CLKOUT_3: &[Clock] = &[
    C::Disabled, C::Hclk, C::HfExpClk, C::Ulfrco, C::Lfrco, C::Lfxo, C::HfrcoDpll, C::Hfxo,
    C::Fsrco, C::HfrcoEm23,
];
const CLKOUT_8: &[Clock] = &[
    C::Disabled, C::Hclk, C::HfExpClk, C::Ulfrco, C::Lfrco, C::Lfxo, C::HfrcoDpll, C::Hfxo,
    C::Fsrco, C::HfrcoEm23, C::Socpll, C::ClkExpQspi,
];

const TRACE: &[Clock] = &[C::Disabled, C::Sysclk, C::HfrcoEm23, C::HfrcoDpllRt];
const DPLLREF: &[Clock] = &[C::Disabled, C::Hfxo, C::Lfxo, C::Clkin0];
const EM01GRP: &[Clock] = &[
    C::Disabled, C::HfrcoDpll, C::Hfxo, C::Fsrco, C::HfrcoEm23, C::HfrcoDpllRt, C::HfxoRt,
];
const LF: &[Clock] = &[C::Disabled, C::Lfrco, C::Lfxo, C::Ulfrco];
const ADC: &[Clock] = &[C::Disabled, C::Em01GrpaClk, C::Fsrco, C::HfrcoEm23];
const WDOG: &[Clock] = &[C::Disabled, C::Lfrco, C::Lfxo, C::Ulfrco, C::HclkDiv1024];
const EUSART0: &[Clock] = &[C::Disabled, C::Em01GrpcClk, C::HfrcoEm23, C::Lfrco, C::Lfxo];
const VDAC: &[Clock] = &[C::Disabled, C::Em01GrpaClk, C::Em23GrpaClk, C::Fsrco, C::HfrcoEm23];
const PCNT0: &[Clock] = &[C::Disabled, C::Em23GrpaClk, C::Pcnts0];
const I2C0: &[Clock] = &[C::Disabled, C::Em01GrpdClk, C::HfrcoEm23, C::Lfrco, C::Lfxo];

pub static CMU_3: CmuLayout = CmuLayout {
    variant: CmuVariant::V3,
    registers: &[
        reg(R::Ipversion, 0x000, 3),
        reg(R::Ctrl, 0x004, 0),
        reg(R::Status, 0x008, 0),
        reg(R::Lock, 0x010, 0x93F7),
        reg(R::Wdoglock, 0x014, 0x5257),
        reg(R::If, 0x020, 0),
        reg(R::Ien, 0x024, 0),
        reg(R::Calcmd, 0x050, 0),
        reg(R::Calctrl, 0x054, 0),
        reg(R::Calcnt, 0x058, 0),
        reg(R::Clken0, 0x064, 0),
        reg(R::Clken1, 0x068, 0),
        reg(R::Sysclkctrl, 0x070, 1),
        reg(R::Seclkctrl, 0x074, 1),
        reg(R::Traceclkctrl, 0x080, 1),
        reg(R::Exportclkctrl, 0x090, 0),
        reg(R::Dpllrefclkctrl, 0x100, 0),
        reg(R::Em01grpaclkctrl, 0x120, 1),
        reg(R::Em01grpcclkctrl, 0x128, 1),
        reg(R::Em23grpaclkctrl, 0x140, 1),
        reg(R::Em4grpaclkctrl, 0x160, 1),
        reg(R::Adcclkctrl, 0x180, 1),
        reg(R::Wdog0clkctrl, 0x200, 1),
        reg(R::Wdog1clkctrl, 0x208, 1),
        reg(R::Eusart0clkctrl, 0x220, 1),
        reg(R::Sysrtc0clkctrl, 0x240, 1),
        reg(R::Vdac0clkctrl, 0x260, 1),
        reg(R::Pcnt0clkctrl, 0x270, 1),
        reg(R::Vdac1clkctrl, 0x294, 1),
    ],
    muxes: &[
        mux(Mux::Sysclk, R::Sysclkctrl, 0, 3, SYSCLK_3),
        mux(Mux::CalUp, R::Calctrl, 24, 4, UPSEL_3),
        mux(Mux::CalDown, R::Calctrl, 28, 4, DOWNSEL_3),
        mux(Mux::Clkout0, R::Exportclkctrl, 0, 4, CLKOUT_3),
        mux(Mux::Clkout1, R::Exportclkctrl, 8, 4, CLKOUT_3),
        mux(Mux::Clkout2, R::Exportclkctrl, 16, 4, CLKOUT_3),
        mux(Mux::Trace, R::Traceclkctrl, 0, 2, TRACE),
        mux(Mux::DpllRef, R::Dpllrefclkctrl, 0, 2, DPLLREF),
        mux(Mux::Em01Grpa, R::Em01grpaclkctrl, 0, 3, EM01GRP),
        mux(Mux::Em01Grpc, R::Em01grpcclkctrl, 0, 3, EM01GRP),
        mux(Mux::Em23Grpa, R::Em23grpaclkctrl, 0, 2, LF),
        mux(Mux::Em4Grpa, R::Em4grpaclkctrl, 0, 2, LF),
        mux(Mux::Adc, R::Adcclkctrl, 0, 2, ADC),
        mux(Mux::Wdog0, R::Wdog0clkctrl, 0, 3, WDOG),
        mux(Mux::Wdog1, R::Wdog1clkctrl, 0, 3, WDOG),
        mux(Mux::Eusart0, R::Eusart0clkctrl, 0, 3, EUSART0),
        mux(Mux::Sysrtc0, R::Sysrtc0clkctrl, 0, 2, LF),
        mux(Mux::Vdac0, R::Vdac0clkctrl, 0, 3, VDAC),
        mux(Mux::Pcnt0, R::Pcnt0clkctrl, 0, 2, PCNT0),
        mux(Mux::Vdac1, R::Vdac1clkctrl, 0, 3, VDAC),
    ],
    caltop: Field::new(R::Calctrl, 0, 20),
    consumer_clken: &[
        (ConsumerId::Timer0, ClkenBit::new(R::Clken0, 4)),
        (ConsumerId::Timer1, ClkenBit::new(R::Clken0, 5)),
        (ConsumerId::Timer2, ClkenBit::new(R::Clken0, 6)),
        (ConsumerId::Timer3, ClkenBit::new(R::Clken0, 7)),
        (ConsumerId::Timer4, ClkenBit::new(R::Clken0, 8)),
        (ConsumerId::Iadc0, ClkenBit::new(R::Clken0, 10)),
        (ConsumerId::Letimer0, ClkenBit::new(R::Clken0, 12)),
        (ConsumerId::Wdog0, ClkenBit::new(R::Clken0, 13)),
        (ConsumerId::I2c0, ClkenBit::new(R::Clken0, 14)),
        (ConsumerId::I2c1, ClkenBit::new(R::Clken0, 15)),
        (ConsumerId::Dpll0, ClkenBit::new(R::Clken0, 17)),
        (ConsumerId::Burtc, ClkenBit::new(R::Clken0, 29)),
        (ConsumerId::Sysrtc0, ClkenBit::new(R::Clken0, 30)),
        (ConsumerId::Wdog1, ClkenBit::new(R::Clken1, 17)),
        (ConsumerId::Vdac0, ClkenBit::new(R::Clken1, 20)),
        (ConsumerId::Pcnt0, ClkenBit::new(R::Clken1, 21)),
        (ConsumerId::Eusart0, ClkenBit::new(R::Clken1, 22)),
        (ConsumerId::Eusart1, ClkenBit::new(R::Clken1, 23)),
        (ConsumerId::Vdac1, ClkenBit::new(R::Clken1, 29)),
    ],
    osc_clken: &[
        (Oscillator::Dpll, ClkenBit::new(R::Clken0, 17)),
        (Oscillator::Hfrco, ClkenBit::new(R::Clken0, 18)),
        (Oscillator::HfrcoEm23, ClkenBit::new(R::Clken0, 19)),
        (Oscillator::Hfxo, ClkenBit::new(R::Clken0, 20)),
        (Oscillator::Lfrco, ClkenBit::new(R::Clken0, 22)),
        (Oscillator::Lfxo, ClkenBit::new(R::Clken0, 23)),
    ],
    graph: &graph::GRAPH_3,
};

pub static CMU_8: CmuLayout = CmuLayout {
    variant: CmuVariant::V8,
    registers: &[
        reg(R::Ipversion, 0x000, 8),
        reg(R::Ctrl, 0x004, 0),
        reg(R::Status, 0x008, 0),
        reg(R::Lock, 0x010, 0x93F7),
        reg(R::Wdoglock, 0x014, 0x5257),
        reg(R::If, 0x020, 0),
        reg(R::Ien, 0x024, 0),
        reg(R::Calcmd, 0x050, 0),
        reg(R::Calctrl, 0x054, 0),
        reg(R::Calcnt, 0x058, 0),
        reg(R::Caltop, 0x05C, 0),
        reg(R::Clken0, 0x064, 0),
        reg(R::Clken1, 0x068, 0x1000_0000),
        reg(R::Sysclkctrl, 0x070, 1),
        reg(R::Traceclkctrl, 0x080, 1),
        reg(R::Exportclkctrl, 0x090, 0),
        reg(R::Dpllrefclkctrl, 0x100, 0),
        reg(R::Em01grpaclkctrl, 0x120, 1),
        reg(R::Em01grpcclkctrl, 0x128, 1),
        reg(R::Em23grpaclkctrl, 0x140, 1),
        reg(R::Em4grpaclkctrl, 0x160, 1),
        reg(R::Adcclkctrl, 0x180, 1),
        reg(R::Wdog0clkctrl, 0x200, 1),
        reg(R::Eusart0clkctrl, 0x220, 1),
        reg(R::Sysrtc0clkctrl, 0x240, 1),
        reg(R::Pcnt0clkctrl, 0x270, 1),
        reg(R::Em01grpdclkctrl, 0x2A8, 1),
        reg(R::I2c0clkctrl, 0x2AC, 1),
        reg(R::Pixelrzclkctrl, 0x2B0, 0x109),
        reg(R::Clkenhv, 0x2B4, 0x10),
    ],
    muxes: &[
        mux(Mux::Sysclk, R::Sysclkctrl, 0, 3, SYSCLK_8),
        mux(Mux::CalUp, R::Calctrl, 8, 5, CALSEL_8),
        mux(Mux::CalDown, R::Calctrl, 16, 5, CALSEL_8),
        mux(Mux::Clkout0, R::Exportclkctrl, 0, 4, CLKOUT_8),
        mux(Mux::Clkout1, R::Exportclkctrl, 4, 4, CLKOUT_8),
        mux(Mux::Clkout2, R::Exportclkctrl, 8, 4, CLKOUT_8),
        mux(Mux::Trace, R::Traceclkctrl, 0, 2, TRACE),
        mux(Mux::DpllRef, R::Dpllrefclkctrl, 0, 2, DPLLREF),
        mux(Mux::Em01Grpa, R::Em01grpaclkctrl, 0, 3, EM01GRP),
        mux(Mux::Em01Grpc, R::Em01grpcclkctrl, 0, 3, EM01GRP),
        mux(Mux::Em01Grpd, R::Em01grpdclkctrl, 0, 3, EM01GRP),
        mux(Mux::Em23Grpa, R::Em23grpaclkctrl, 0, 2, LF),
        mux(Mux::Em4Grpa, R::Em4grpaclkctrl, 0, 2, LF),
        mux(Mux::Adc, R::Adcclkctrl, 0, 2, ADC),
        mux(Mux::Wdog0, R::Wdog0clkctrl, 0, 3, WDOG),
        mux(Mux::Eusart0, R::Eusart0clkctrl, 0, 3, EUSART0),
        mux(Mux::Sysrtc0, R::Sysrtc0clkctrl, 0, 2, LF),
        mux(Mux::Pcnt0, R::Pcnt0clkctrl, 0, 2, PCNT0),
        mux(Mux::I2c0, R::I2c0clkctrl, 0, 3, I2C0),
        mux(Mux::Pixelrz, R::Pixelrzclkctrl, 8, 3, EM01GRP),
    ],
    caltop: Field::new(R::Caltop, 0, 24),
    consumer_clken: &[
        (ConsumerId::Timer0, ClkenBit::new(R::Clken0, 4)),
        (ConsumerId::Timer1, ClkenBit::new(R::Clken0, 5)),
        (ConsumerId::Timer2, ClkenBit::new(R::Clken0, 6)),
        (ConsumerId::Timer3, ClkenBit::new(R::Clken0, 7)),
        (ConsumerId::Adc0, ClkenBit::new(R::Clken0, 10)),
        (ConsumerId::Letimer0, ClkenBit::new(R::Clken0, 12)),
        (ConsumerId::Wdog0, ClkenBit::new(R::Clken0, 13)),
        (ConsumerId::I2c0, ClkenBit::new(R::Clken0, 14)),
        (ConsumerId::I2c1, ClkenBit::new(R::Clken0, 15)),
        (ConsumerId::Dpll0, ClkenBit::new(R::Clken0, 17)),
        (ConsumerId::Burtc, ClkenBit::new(R::Clken0, 29)),
        (ConsumerId::Etampdet, ClkenBit::new(R::Clken1, 2)),
        (ConsumerId::Wdog1, ClkenBit::new(R::Clken1, 17)),
        (ConsumerId::Pcnt0, ClkenBit::new(R::Clken1, 21)),
        (ConsumerId::Eusart0, ClkenBit::new(R::Clken1, 22)),
        (ConsumerId::Eusart1, ClkenBit::new(R::Clken1, 23)),
        (ConsumerId::Pixelrz0, ClkenBit::new(R::Clken1, 29)),
        (ConsumerId::Sysrtc0, ClkenBit::new(R::Clkenhv, 0)),
    ],
    osc_clken: &[
        (Oscillator::Dpll, ClkenBit::new(R::Clken0, 17)),
        (Oscillator::Hfrco, ClkenBit::new(R::Clken0, 18)),
        (Oscillator::HfrcoEm23, ClkenBit::new(R::Clken0, 19)),
        (Oscillator::Hfxo, ClkenBit::new(R::Clken0, 20)),
        (Oscillator::Lfrco, ClkenBit::new(R::Clken0, 22)),
        (Oscillator::Lfxo, ClkenBit::new(R::Clken0, 23)),
        (Oscillator::Socpll, ClkenBit::new(R::Clken1, 3)),
    ],
    graph: &graph::GRAPH_8,
};
