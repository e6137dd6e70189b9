//! Integration tests for the clock tree
//! Drives full scenarios through ClockTree register writes, hardware
//! requests and simulated time

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::clock::{Clock, Oscillator};
    use crate::config::{ClockConfig, CmuVariant};
    use crate::consumers::ConsumerId;
    use crate::oscillator::{HfxoRequester, OscState};
    use crate::peripherals::Block;
    use crate::scheduler::{ClockId, EventId};
    use crate::tree::{ClockTree, CpuExceptionSink};

    /// CMU registers
    const CMU_LOCK: u32 = 0x10;
    const CMU_IF: u32 = 0x20;
    const CMU_IEN: u32 = 0x24;
    const CMU_CALCMD: u32 = 0x50;
    const CMU_CALCTRL: u32 = 0x54;
    const CMU_CLKEN0: u32 = 0x64;
    const CMU_CLKEN1: u32 = 0x68;
    const CMU_SYSCLKCTRL: u32 = 0x70;
    const CMU_DPLLREFCLKCTRL: u32 = 0x100;
    const CMU_EM23GRPACLKCTRL: u32 = 0x140;
    const CMU_VDAC0CLKCTRL: u32 = 0x260;
    const CMU_VDAC1CLKCTRL: u32 = 0x294;
    const CMU_I2C0CLKCTRL: u32 = 0x2AC;

    /// HFXO registers
    const HFXO_CTRL: u32 = 0x28;
    const HFXO_CMD: u32 = 0x50;
    const HFXO_STATUS: u32 = 0x58;
    const HFXO_LOCK: u32 = 0x80;

    const SOCPLL_CTRL: u32 = 0x04;
    const SOCPLL_STATUS: u32 = 0x18;

    const SET: u32 = 0x1000;
    const CLR: u32 = 0x2000;

    const HFXO_TICKS: u64 = 32;

    /// Records every exception the clock tree raises
    #[derive(Clone, Default)]
    struct RecordingCpu {
        exceptions: Arc<Mutex<Vec<u32>>>,
    }

    impl CpuExceptionSink for RecordingCpu {
        fn raise_exception(&mut self, exception: u32) {
            self.exceptions.lock().unwrap().push(exception);
        }
    }

    fn tree(variant: CmuVariant) -> ClockTree {
        ClockTree::new(ClockConfig::for_variant(variant))
    }

    /// Subscribe a counter to HFXO readiness
    fn count_hfxo_enabled(tree: &mut ClockTree) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        tree.subscribe_hfxo_enabled(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    fn hfxo_status_bit(tree: &ClockTree, bit: u32) -> bool {
        tree.read(Block::Hfxo, HFXO_STATUS) & (1 << bit) != 0
    }

    #[test]
    fn test_locked_sysclkctrl_raises_prefetch_abort() {
        let cpu = RecordingCpu::default();
        let exceptions = Arc::clone(&cpu.exceptions);
        let mut tree = ClockTree::with_cpu(ClockConfig::default(), Box::new(cpu));

        tree.write(Block::Cmu, CMU_LOCK, 0);
        tree.write(Block::Cmu, CMU_SYSCLKCTRL, 3);

        assert_eq!(*exceptions.lock().unwrap(), vec![3]);
        assert_eq!(tree.cmu().sysclk(), Clock::Fsrco);
        assert!(!tree.osc_requested(Oscillator::Hfxo));

        // Unlocked again, the same write goes through without a fault
        tree.write(Block::Cmu, CMU_LOCK, 0x93F7);
        tree.write(Block::Cmu, CMU_SYSCLKCTRL, 3);
        assert_eq!(exceptions.lock().unwrap().len(), 1);
        assert_eq!(tree.cmu().sysclk(), Clock::Hfxo);
    }

    #[test]
    fn test_prs_wakeup_completes_on_sysclk_select() {
        let mut tree = tree(CmuVariant::V3);
        let enabled = count_hfxo_enabled(&mut tree);

        assert!(tree.on_request(HfxoRequester::Prs));
        // First requester wins
        assert!(!tree.on_request(HfxoRequester::Sysrtc));
        assert!(hfxo_status_bit(&tree, 20));
        assert!(!hfxo_status_bit(&tree, 22));
        assert!(hfxo_status_bit(&tree, 16));

        tree.advance(HFXO_TICKS - 1, ClockId::Clock32K);
        assert!(!hfxo_status_bit(&tree, 2));
        tree.advance(1, ClockId::Clock32K);
        assert!(hfxo_status_bit(&tree, 2));
        assert!(!hfxo_status_bit(&tree, 0));
        assert_eq!(tree.hfxo().osc().state(), OscState::CoreBiasPending);
        assert_eq!(enabled.load(Ordering::SeqCst), 0);

        tree.write(Block::Cmu, CMU_SYSCLKCTRL, 3);
        assert!(hfxo_status_bit(&tree, 0));
        assert_eq!(enabled.load(Ordering::SeqCst), 1);

        // Moving SYSCLK away releases the oscillator; DISONDEMAND is set
        tree.write(Block::Cmu, CMU_SYSCLKCTRL, 1);
        assert!(!tree.hfxo().osc().is_enabled());
        assert_eq!(tree.hfxo().osc().state(), OscState::Idle);
    }

    #[test]
    fn test_sysrtc_wakeup_sets_sysrtc_ready() {
        let mut tree = tree(CmuVariant::V3);
        assert!(tree.on_request(HfxoRequester::Sysrtc));
        assert!(hfxo_status_bit(&tree, 22));
        tree.advance(HFXO_TICKS, ClockId::Clock32K);
        assert!(hfxo_status_bit(&tree, 4));
        assert!(!hfxo_status_bit(&tree, 2));

        // Selected by a clock the CMU does not model; the requester keeps it on
        tree.on_clksel();
        assert!(tree.hfxo().osc().is_ready());
        tree.write(Block::Cmu, CMU_CLKEN0, 0);
        assert!(tree.hfxo().osc().is_enabled());
    }

    #[test]
    fn test_dpll_reference_demands_hfxo() {
        let mut tree = tree(CmuVariant::V3);
        let enabled = count_hfxo_enabled(&mut tree);

        tree.write(Block::Cmu, SET + CMU_CLKEN0, 1 << 17);
        tree.write(Block::Cmu, CMU_DPLLREFCLKCTRL, 1);
        assert!(!tree.osc_requested(Oscillator::Hfxo));

        tree.write(Block::Dpll, 0x4, 1);
        assert!(tree.osc_requested(Oscillator::Hfxo));
        assert!(!tree.osc_requested(Oscillator::Lfxo));
        // Enabled is the CLKEN bit, not the demand
        assert!(!tree.osc_enabled(Oscillator::Hfxo));
        assert!(tree.osc_enabled(Oscillator::Dpll));

        // DISONDEMAND holds it off; the demand shows as HWREQ
        assert!(hfxo_status_bit(&tree, 17));
        assert!(!hfxo_status_bit(&tree, 16));
        assert_eq!(tree.hfxo().osc().state(), OscState::Requested);

        tree.write(Block::Hfxo, HFXO_CTRL, 0);
        assert!(hfxo_status_bit(&tree, 16));
        assert!(hfxo_status_bit(&tree, 30));
        assert!(tree.scheduler().is_active(EventId::HfxoStartup));

        tree.advance(HFXO_TICKS, ClockId::Clock32K);
        assert!(tree.hfxo().osc().is_ready());
        assert!(tree.dpll().is_some_and(|dpll| dpll.osc().is_ready()));
        assert_eq!(enabled.load(Ordering::SeqCst), 1);

        // Dropping the DPLL drops the demand
        tree.write(Block::Dpll, 0x4, 0);
        assert!(!tree.osc_requested(Oscillator::Hfxo));
        assert!(!tree.hfxo().osc().is_enabled());
    }

    #[test]
    fn test_dpll_reference_ignores_missing_dpll() {
        let mut config = ClockConfig::default();
        config.dpll_present = false;
        let mut tree = ClockTree::new(config);

        tree.write(Block::Cmu, SET + CMU_CLKEN0, 1 << 17);
        tree.write(Block::Cmu, CMU_DPLLREFCLKCTRL, 1);
        tree.write(Block::Dpll, 0x4, 1);
        assert!(!tree.osc_requested(Oscillator::Hfxo));
    }

    #[test]
    fn test_oscillator_lock_drops_ctrl_write() {
        let mut tree = tree(CmuVariant::V3);
        tree.write(Block::Hfxo, HFXO_LOCK, 0);
        tree.write(Block::Hfxo, HFXO_CTRL, 1);
        assert!(!tree.hfxo().osc().force_enabled());
        assert!(hfxo_status_bit(&tree, 31));

        tree.write(Block::Hfxo, HFXO_LOCK, 0x580E);
        tree.write(Block::Hfxo, HFXO_CTRL, 0x3);
        assert!(tree.hfxo().osc().force_enabled());
    }

    #[test]
    fn test_ctrl_zero_keeps_sysclk_hfxo_ready() {
        let mut tree = tree(CmuVariant::V3);
        tree.write(Block::Cmu, CMU_SYSCLKCTRL, 3);
        tree.write(Block::Hfxo, HFXO_CTRL, 0x3);
        tree.advance(HFXO_TICKS, ClockId::Clock32K);
        assert_eq!(tree.hfxo().osc().state(), OscState::Ready);

        tree.write(Block::Hfxo, HFXO_CTRL, 0);
        assert_eq!(tree.hfxo().osc().state(), OscState::Ready);
        assert!(hfxo_status_bit(&tree, 0));
        assert!(hfxo_status_bit(&tree, 16));
        assert!(!tree.scheduler().is_active(EventId::HfxoStartup));
    }

    #[test]
    fn test_core_bias_handshake_through_registers() {
        let mut tree = tree(CmuVariant::V3);
        // Clearing DISONDEMAND arms the FSM lock
        tree.write(Block::Hfxo, HFXO_CTRL, 0);
        tree.write(Block::Hfxo, HFXO_CTRL, 0x3);
        assert!(hfxo_status_bit(&tree, 30));

        tree.write(Block::Hfxo, HFXO_CMD, 1 << 1);
        assert!(hfxo_status_bit(&tree, 30));

        tree.write(Block::Hfxo, HFXO_CMD, 1 << 0);
        assert!(hfxo_status_bit(&tree, 1));
        tree.write(Block::Hfxo, HFXO_CMD, 1 << 1);
        assert!(!hfxo_status_bit(&tree, 30));
    }

    #[test]
    fn test_vdac0_does_not_wake_em23_group() {
        let mut tree = tree(CmuVariant::V3);
        tree.write(Block::Cmu, CMU_EM23GRPACLKCTRL, 2);
        tree.write(Block::Cmu, CMU_VDAC0CLKCTRL, 2);
        tree.write(Block::Cmu, SET + CMU_CLKEN1, 1 << 20);
        assert!(!tree.osc_requested(Oscillator::Lfxo));

        tree.write(Block::Cmu, CMU_VDAC1CLKCTRL, 2);
        tree.write(Block::Cmu, SET + CMU_CLKEN1, 1 << 29);
        assert!(tree.osc_requested(Oscillator::Lfxo));
        // LFXO resets with DISONDEMAND set
        assert_eq!(tree.lfxo().osc().state(), OscState::Requested);

        tree.set_consumer_enabled(ConsumerId::Vdac1, false);
        assert!(!tree.osc_requested(Oscillator::Lfxo));
        assert_eq!(tree.lfxo().osc().state(), OscState::Idle);
    }

    #[test]
    fn test_variant8_i2c0_lfxo_term_matches_lfrco() {
        let mut tree = tree(CmuVariant::V8);
        tree.write(Block::Cmu, CMU_I2C0CLKCTRL, 3);
        tree.write(Block::Cmu, SET + CMU_CLKEN0, 1 << 14);
        assert!(tree.osc_requested(Oscillator::Lfrco));
        assert!(tree.osc_requested(Oscillator::Lfxo));

        tree.write(Block::Cmu, CMU_I2C0CLKCTRL, 4);
        assert!(!tree.osc_requested(Oscillator::Lfxo));
        assert!(!tree.osc_requested(Oscillator::Lfrco));
    }

    #[test]
    fn test_variant8_socpll_on_demand_and_hfxo_reference() {
        let mut tree = tree(CmuVariant::V8);
        tree.write(Block::Cmu, CMU_SYSCLKCTRL, 5);
        assert_eq!(tree.cmu().sysclk(), Clock::Socpll);
        assert!(tree.osc_socpll_requested(0));
        assert!(!tree.osc_socpll_requested(1));
        assert!(!tree.osc_perpll_requested(0));

        // SOCPLL leaves reset with DISONDEMAND clear and starts on demand
        assert!(tree.socpll().is_some_and(|pll| pll.osc().is_enabled()));
        tree.advance(4, ClockId::Clock32K);
        assert_eq!(tree.read(Block::Socpll, SOCPLL_STATUS), 0x103);

        // Its HFXO reference only counts once CLKEN1.SOCPLL0 is set
        assert!(!tree.osc_requested(Oscillator::Hfxo));
        tree.write(Block::Cmu, SET + CMU_CLKEN1, 1 << 3);
        assert!(tree.osc_socpll_enabled(0));
        assert!(tree.osc_requested(Oscillator::Hfxo));

        // REFCLKSEL = HFRCO
        tree.write(Block::Socpll, SET + SOCPLL_CTRL, 1 << 4);
        assert!(!tree.osc_requested(Oscillator::Hfxo));
        tree.write(Block::Socpll, CLR + SOCPLL_CTRL, 1 << 4);
        assert!(tree.osc_requested(Oscillator::Hfxo));

        tree.write(Block::Cmu, CMU_SYSCLKCTRL, 1);
        assert!(!tree.osc_requested(Oscillator::Hfxo));
        assert!(tree.socpll().is_some_and(|pll| !pll.osc().is_enabled()));
    }

    #[test]
    fn test_demand_start_and_release_on_group_consumer() {
        let mut tree = tree(CmuVariant::V3);
        // TIMER0 on EM01GRPA, which resets to HFRCODPLL
        tree.write(Block::Hfrco, 0x4, 0);
        tree.write(Block::Cmu, SET + CMU_CLKEN0, 1 << 4);
        assert!(tree.osc_requested(Oscillator::Hfrco));
        assert_eq!(tree.hfrco().osc().state(), OscState::Starting);

        tree.advance(1, ClockId::Clock32K);
        assert!(tree.hfrco().osc().is_ready());
        assert!(!tree.irq_pending(Block::Hfrco));

        tree.set_consumer_enabled(ConsumerId::Timer0, false);
        assert!(!tree.hfrco().osc().is_enabled());
    }

    #[test]
    fn test_calibration_run_raises_cmu_irq() {
        let mut tree = tree(CmuVariant::V3);
        tree.write(Block::Cmu, CMU_IEN, 1);
        tree.write(Block::Cmu, CMU_CALCTRL, 100 | 9 << 24 | 5 << 28);
        assert_eq!(tree.read(Block::Cmu, 0x58), 3);
        assert!(!tree.irq_pending(Block::Cmu));

        tree.write(Block::Cmu, CMU_CALCMD, 1);
        assert_eq!(tree.read(Block::Cmu, CMU_IF), 1);
        assert!(tree.irq_pending(Block::Cmu));

        // Calibration selectors count as demand
        assert!(tree.osc_requested(Oscillator::Lfrco));
        assert!(tree.osc_requested(Oscillator::Hfrco));
    }

    #[test]
    fn test_reset_keeps_consumer_flags() {
        let mut tree = tree(CmuVariant::V3);
        let enabled = count_hfxo_enabled(&mut tree);

        tree.set_consumer_enabled(ConsumerId::Timer0, false);
        tree.write(Block::Hfrco, 0x4, 1);
        tree.write(Block::Hfxo, HFXO_CTRL, 0x3);
        tree.write(Block::Cmu, CMU_LOCK, 0);
        assert!(tree.cmu().is_locked());

        tree.reset();
        assert!(!tree.cmu().is_locked());
        assert_eq!(tree.cmu().sysclk(), Clock::Fsrco);
        assert_eq!(tree.hfrco().osc().state(), OscState::Idle);
        assert_eq!(tree.hfxo().osc().state(), OscState::Idle);
        for event in EventId::ALL {
            assert!(!tree.scheduler().is_active(event), "{event:?}");
        }

        // TIMER0 flag survived the reset
        tree.write(Block::Cmu, SET + CMU_CLKEN0, 1 << 4);
        assert!(!tree.osc_requested(Oscillator::Hfrco));

        // Subscriptions stay too
        tree.write(Block::Hfxo, HFXO_CTRL, 0x3);
        tree.advance(HFXO_TICKS, ClockId::Clock32K);
        assert_eq!(enabled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_em2_wakeup_notifies_subscribers() {
        let mut tree = tree(CmuVariant::V3);
        let enabled = count_hfxo_enabled(&mut tree);
        tree.on_em2_wakeup();
        assert_eq!(enabled.load(Ordering::SeqCst), 1);
        assert!(!tree.hfxo().osc().is_enabled());
    }
}
