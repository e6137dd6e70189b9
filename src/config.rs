//! Clock tree configuration
//!
//! Everything here is fixed at construction: which CMU register layout the
//! device uses, the oscillator start-up delays and the DPLL ratio fed to the
//! calibration counter. Hosts usually load it from JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClockError, ClockResult};

/// CMU register layout revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CmuVariant {
    #[default]
    #[serde(rename = "3")]
    V3,
    #[serde(rename = "8")]
    V8,
}

impl CmuVariant {
    /// Value of the CMU IPVERSION register
    pub fn ip_version(self) -> u32 {
        match self {
            CmuVariant::V3 => 3,
            CmuVariant::V8 => 8,
        }
    }
}

impl fmt::Display for CmuVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ip_version())
    }
}

impl FromStr for CmuVariant {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "3" | "v3" | "cmu_3" => Ok(CmuVariant::V3),
            "8" | "v8" | "cmu_8" => Ok(CmuVariant::V8),
            _ => Err(ClockError::InvalidConfig(format!(
                "unknown CMU variant '{s}'. Supported: 3, 8"
            ))),
        }
    }
}

/// Construction parameters for a [`ClockTree`](crate::tree::ClockTree).
///
/// Start-up delays are in ticks of the 32.768 kHz timer clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub variant: CmuVariant,
    pub hfxo_startup_ticks: u32,
    pub lfxo_startup_ticks: u32,
    pub hfrco_startup_ticks: u32,
    pub hfrco_em23_startup_ticks: u32,
    pub dpll_lock_ticks: u32,
    /// Only used on variant 8
    pub socpll_lock_ticks: u32,
    /// DPLL ratio numerator applied to HFXO as a calibration down source
    pub dpll_n: u64,
    pub dpll_m: u64,
    /// Whether the device has a DPLL block
    pub dpll_present: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            variant: CmuVariant::V3,
            hfxo_startup_ticks: 32,
            lfxo_startup_ticks: 328,
            hfrco_startup_ticks: 1,
            hfrco_em23_startup_ticks: 1,
            dpll_lock_ticks: 4,
            socpll_lock_ticks: 4,
            dpll_n: 1,
            dpll_m: 1,
            dpll_present: true,
        }
    }
}

impl ClockConfig {
    /// Default configuration for `variant`
    pub fn for_variant(variant: CmuVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ClockResult<Self> {
        serde_json::from_str(json).map_err(|err| ClockError::InvalidConfig(err.to_string()))
    }
}
