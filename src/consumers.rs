//! Downstream clock consumers
//!
//! The peripherals fed by the CMU are simulated elsewhere. All the clock
//! tree needs from them is whether each one is enabled, so they appear here
//! as a flag per [`ConsumerId`].

use serde::Serialize;

/// A peripheral whose clock demand the CMU evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerId {
    Timer0,
    Timer1,
    Timer2,
    Timer3,
    Timer4,
    Iadc0,
    Adc0,
    Vdac0,
    Vdac1,
    Eusart0,
    Eusart1,
    Letimer0,
    Pcnt0,
    Burtc,
    Etampdet,
    Wdog0,
    Wdog1,
    Sysrtc0,
    I2c0,
    I2c1,
    Pixelrz0,
    /// The DPLL as a consumer of its reference clock
    Dpll0,
}

impl ConsumerId {
    pub const COUNT: usize = 22;

    pub const ALL: [ConsumerId; Self::COUNT] = [
        ConsumerId::Timer0,
        ConsumerId::Timer1,
        ConsumerId::Timer2,
        ConsumerId::Timer3,
        ConsumerId::Timer4,
        ConsumerId::Iadc0,
        ConsumerId::Adc0,
        ConsumerId::Vdac0,
        ConsumerId::Vdac1,
        ConsumerId::Eusart0,
        ConsumerId::Eusart1,
        ConsumerId::Letimer0,
        ConsumerId::Pcnt0,
        ConsumerId::Burtc,
        ConsumerId::Etampdet,
        ConsumerId::Wdog0,
        ConsumerId::Wdog1,
        ConsumerId::Sysrtc0,
        ConsumerId::I2c0,
        ConsumerId::I2c1,
        ConsumerId::Pixelrz0,
        ConsumerId::Dpll0,
    ];
}

/// What the request graph needs to know about blocks outside the CMU
pub trait Consumers {
    /// The consumer's own `Enabled` flag
    fn is_enabled(&self, consumer: ConsumerId) -> bool;

    /// Whether SOCPLL0 takes its reference from the HFXO
    fn socpll_uses_hfxo(&self) -> bool {
        false
    }
}

/// Host-settable `Enabled` flags, all set by default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerFlags {
    flags: [bool; ConsumerId::COUNT],
}

impl ConsumerFlags {
    pub fn new() -> Self {
        Self {
            flags: [true; ConsumerId::COUNT],
        }
    }

    pub fn set(&mut self, consumer: ConsumerId, enabled: bool) {
        self.flags[consumer as usize] = enabled;
    }

    pub fn get(&self, consumer: ConsumerId) -> bool {
        self.flags[consumer as usize]
    }
}

impl Default for ConsumerFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumers for ConsumerFlags {
    fn is_enabled(&self, consumer: ConsumerId) -> bool {
        self.get(consumer)
    }
}

impl Serialize for ConsumerFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(ConsumerId::COUNT))?;
        for consumer in ConsumerId::ALL {
            map.serialize_entry(&consumer, &self.get(consumer))?;
        }
        map.end()
    }
}
