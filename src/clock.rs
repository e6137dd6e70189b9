//! Clock source and oscillator identities
//!
//! CMU select fields encode their sources differently per register and per
//! device variant. Everything past register decode works on [`Clock`].

use serde::Serialize;

/// A clock a CMU mux can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clock {
    Disabled,
    Hclk,
    HclkDiv1024,
    Sysclk,
    Prs,
    Hfxo,
    /// HFXO retimed
    HfxoRt,
    Lfxo,
    HfrcoDpll,
    /// HFRCODPLL retimed
    HfrcoDpllRt,
    HfrcoEm23,
    HfrcoLpw,
    Fsrco,
    Lfrco,
    Ulfrco,
    Clkin0,
    Socpll,
    Pfmosc,
    Biasosc,
    Hfrcose,
    Temposc,
    HfExpClk,
    ClkExpQspi,
    ClkoutHidden,
    ClktstLeddrv,
    Em01GrpaClk,
    Em01GrpcClk,
    Em01GrpdClk,
    Em23GrpaClk,
    Pcnts0,
    /// Encoding with no meaning for the field
    Reserved,
}

/// An oscillator whose demand and enable state the CMU reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Oscillator {
    Lfrco,
    Hfrco,
    HfrcoEm23,
    Hfxo,
    Lfxo,
    Dpll,
    Socpll,
    Perpll,
}

impl Oscillator {
    pub const ALL: [Oscillator; 8] = [
        Oscillator::Lfrco,
        Oscillator::Hfrco,
        Oscillator::HfrcoEm23,
        Oscillator::Hfxo,
        Oscillator::Lfxo,
        Oscillator::Dpll,
        Oscillator::Socpll,
        Oscillator::Perpll,
    ];
}
