//! CMU calibration counter
//!
//! Counts how many cycles of the "up" clock fit in `top` cycles of the
//! "down" clock, using fixed nominal frequencies per source.

use tracing::warn;

use crate::clock::Clock;

/// Saturation value of CALCNT
pub const CALCNT_MAX: u64 = 0xFFFFF;

/// Nominal HFXO frequency in Hz
pub const HFXO_FREQ: u64 = 39_000_000;

/// Frequency of `clock` as a calibration up-source; `None` if not modeled
pub fn up_frequency(clock: Clock) -> Option<u64> {
    match clock {
        Clock::Disabled => Some(0),
        Clock::Prs => Some(32_768),
        Clock::Hfxo => Some(HFXO_FREQ),
        Clock::Lfxo => Some(32_768),
        Clock::HfrcoDpll => Some(1_000_000),
        Clock::HfrcoEm23 => Some(19_000_000),
        Clock::Fsrco => Some(20_000_000),
        Clock::Lfrco => Some(32_768),
        Clock::Ulfrco => Some(1_000),
        _ => None,
    }
}

/// Frequency of `clock` as a calibration down-source; `None` if not modeled.
///
/// HFXO is scaled by the DPLL ratio `n / m`, computed in single precision
/// and truncated.
pub fn down_frequency(clock: Clock, dpll_n: u64, dpll_m: u64) -> Option<u64> {
    match clock {
        Clock::Disabled => Some(0),
        Clock::Hclk => Some(1_000_000),
        Clock::Prs => Some(HFXO_FREQ),
        Clock::Hfxo => {
            if dpll_m == 0 {
                return Some(0);
            }
            Some((HFXO_FREQ as f32 * (dpll_n as f32 / dpll_m as f32)) as u64)
        }
        Clock::Lfxo => Some(32_768),
        Clock::HfrcoDpll => Some(1_000_000),
        Clock::HfrcoEm23 => Some(19_000_000),
        Clock::Fsrco => Some(20_000_000),
        Clock::Lfrco => Some(32_768),
        Clock::Ulfrco => Some(1_000),
        _ => None,
    }
}

/// Uncapped count; 0 when either source is unmodeled or the down clock is stopped
pub fn raw_count(top: u32, up: Clock, down: Clock, dpll_n: u64, dpll_m: u64) -> u64 {
    let Some(up_hz) = up_frequency(up) else {
        warn!(?up, "calibration up source has no modeled frequency");
        return 0;
    };
    let Some(down_hz) = down_frequency(down, dpll_n, dpll_m) else {
        warn!(?down, "calibration down source has no modeled frequency");
        return 0;
    };
    if down_hz == 0 {
        return 0;
    }
    (top as u64).saturating_mul(up_hz) / down_hz
}

/// CALCNT value: `min(top * f(up) / f(down), 0xFFFFF)`
pub fn calibrate(top: u32, up: Clock, down: Clock, dpll_n: u64, dpll_m: u64) -> u32 {
    raw_count(top, up, down, dpll_n, dpll_m).min(CALCNT_MAX) as u32
}
