//! Series 2 Clock Tree Emulation Core
//!
//! This crate models, in simulated time, how the oscillators of a Series 2
//! microcontroller are brought from demand to readiness by the Clock
//! Management Unit. No wall clock is involved; time only moves when the
//! host calls [`ClockTree::advance`].
//!
//! # Architecture
//!
//! The core is organized into several modules:
//! - `scheduler`: virtual timeline for start-up and lock delays
//! - `oscillator`: the start-up state machine shared by every oscillator
//! - `peripherals`: the CMU and oscillator register blocks
//! - `tree`: orchestrator routing accesses and re-evaluating demand
//!
//! # Block Window (0x4000 bytes)
//!
//! | Offset          | Access              |
//! |-----------------|---------------------|
//! | 0x0000 - 0x0FFF | Plain register      |
//! | 0x1000 - 0x1FFF | Set alias           |
//! | 0x2000 - 0x2FFF | Clear alias         |
//! | 0x3000 - 0x3FFF | Toggle alias        |

pub mod calibration;
pub mod clock;
pub mod config;
pub mod consumers;
pub mod error;
pub mod lock;
pub mod oscillator;
pub mod peripherals;
pub mod registers;
pub mod scheduler;
mod tree;

#[cfg(test)]
mod tree_integration_test;

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

pub use clock::{Clock, Oscillator};
pub use config::{ClockConfig, CmuVariant};
pub use consumers::{ConsumerFlags, ConsumerId, Consumers};
pub use error::{ClockError, ClockResult};
pub use oscillator::{HfxoRequester, OscState, WakeUpSource};
pub use peripherals::Block;
pub use scheduler::ClockId;
pub use tree::{ClockTree, CpuExceptionSink, HfxoSubscriber, NoCpu};

/// Thread-safe wrapper for the clock tree.
/// Every host entry point goes through this mutex, so register accesses,
/// time advances and notifications from different threads never interleave.
pub struct SyncClockTree {
    inner: Mutex<ClockTree>,
}

impl SyncClockTree {
    pub fn new(config: ClockConfig) -> Self {
        Self::from_tree(ClockTree::new(config))
    }

    pub fn from_tree(tree: ClockTree) -> Self {
        Self {
            inner: Mutex::new(tree),
        }
    }

    /// A panic while the lock was held leaves the tree usable
    fn lock(&self) -> MutexGuard<'_, ClockTree> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the tree
    pub fn with<R>(&self, f: impl FnOnce(&mut ClockTree) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn read(&self, block: Block, offset: u32) -> u32 {
        self.lock().read(block, offset)
    }

    pub fn write(&self, block: Block, offset: u32, value: u32) {
        self.lock().write(block, offset, value);
    }

    pub fn advance(&self, ticks: u64, clock: ClockId) {
        self.lock().advance(ticks, clock);
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn osc_requested(&self, osc: Oscillator) -> bool {
        self.lock().osc_requested(osc)
    }

    pub fn osc_enabled(&self, osc: Oscillator) -> bool {
        self.lock().osc_enabled(osc)
    }

    pub fn on_request(&self, requester: HfxoRequester) -> bool {
        self.lock().on_request(requester)
    }

    pub fn on_clksel(&self) {
        self.lock().on_clksel();
    }

    pub fn on_em2_wakeup(&self) {
        self.lock().on_em2_wakeup();
    }

    pub fn set_consumer_enabled(&self, consumer: ConsumerId, enabled: bool) {
        self.lock().set_consumer_enabled(consumer, enabled);
    }

    pub fn snapshot(&self) -> Value {
        self.lock().snapshot()
    }

    pub fn into_inner(self) -> ClockTree {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SyncClockTree {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_shared_across_threads() {
        let tree = Arc::new(SyncClockTree::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let tree = Arc::clone(&tree);
                thread::spawn(move || {
                    // CLKEN0 SET alias, one TIMER bit per thread
                    tree.write(Block::Cmu, 0x1064, 1 << (4 + i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tree.read(Block::Cmu, 0x64), 0xF << 4);
        assert!(tree.osc_requested(Oscillator::Hfrco));
    }

    #[test]
    fn test_poisoned_lock_recovers() {
        let tree = Arc::new(SyncClockTree::default());
        let poison = Arc::clone(&tree);
        let result = thread::spawn(move || {
            poison.with(|_| panic!("host callback failed"));
        })
        .join();
        assert!(result.is_err());

        tree.write(Block::Cmu, 0x70, 2);
        assert_eq!(tree.with(|tree| tree.cmu().sysclk()), Clock::HfrcoDpll);
    }

    #[test]
    fn test_into_inner() {
        let tree = SyncClockTree::new(ClockConfig::for_variant(CmuVariant::V8));
        assert!(tree.on_request(HfxoRequester::Prs));
        let tree = tree.into_inner();
        assert_eq!(tree.hfxo().osc().state(), OscState::Starting);
    }
}
