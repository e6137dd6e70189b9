//! Series 2 clock block emulation
//!
//! This module contains the memory-mapped clock blocks:
//! - Clock Management Unit (CMU), variant 3 or 8
//! - HFXO0 high-frequency crystal oscillator
//! - LFXO low-frequency crystal oscillator
//! - HFRCO0 / HFRCOEM23 RC oscillators
//! - DPLL0 digital PLL
//! - SOCPLL0 system PLL (variant 8)
//!
//! Every block occupies a 0x4000-byte window; the platform decides where.
//! Offsets handed to a block are relative to its window base.

pub mod cmu;
pub mod dpll;
pub mod hfrco;
pub mod hfxo;
pub mod lfxo;
pub mod socpll;

pub use cmu::{Cmu, CmuEffect, CmuSnapshot, EXCP_PREFETCH_ABORT};
pub use dpll::Dpll;
pub use hfrco::Hfrco;
pub use hfxo::Hfxo;
pub use lfxo::Lfxo;
pub use socpll::{RefClkSel, Socpll};

use serde::Serialize;

/// Clock block selector used by the clock tree's register entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Cmu,
    Hfxo,
    Lfxo,
    Hfrco,
    HfrcoEm23,
    Dpll,
    Socpll,
}

impl Block {
    pub const ALL: [Block; 7] = [
        Block::Cmu,
        Block::Hfxo,
        Block::Lfxo,
        Block::Hfrco,
        Block::HfrcoEm23,
        Block::Dpll,
        Block::Socpll,
    ];

    /// Name used in log lines
    pub fn name(self) -> &'static str {
        match self {
            Block::Cmu => "CMU",
            Block::Hfxo => "HFXO0",
            Block::Lfxo => "LFXO",
            Block::Hfrco => "HFRCO0",
            Block::HfrcoEm23 => "HFRCOEM23",
            Block::Dpll => "DPLL0",
            Block::Socpll => "SOCPLL0",
        }
    }
}
