use core::sync::atomic::{AtomicU32, Ordering};

use embassy_futures::select::{select, Either};
use futures_executor::block_on;

use super::mock::{MockRegisters, MockVref};
use super::pins::InternalSource;
use super::regs::{cfg1, cfg2, pga, sc1, sc2, sc3, Reg};
use super::*;
use crate::board::{TEENSY_3_0, TEENSY_3_2};
use crate::interrupt::{self, InterruptController};

type Module<'a> = AdcModule<&'a MockRegisters, &'a MockVref>;

fn module<'a>(index: ModuleIndex, regs: &'a MockRegisters, vref: &'a MockVref) -> Module<'a> {
    let adc = AdcModule::new(index, regs, vref, &TEENSY_3_2).unwrap();
    block_on(adc.wait_for_calibration());
    adc
}

fn config(regs: &MockRegisters) -> [u32; 7] {
    [
        regs.peek(Reg::Sc1a) & 0x7F,
        regs.peek(Reg::Cfg1),
        regs.peek(Reg::Cfg2),
        regs.peek(Reg::Sc2) & sc2::WRITABLE,
        regs.peek(Reg::Sc3) & sc3::CONFIG,
        regs.peek(Reg::Cv1),
        regs.peek(Reg::Cv2),
    ]
}

#[test]
fn first_calibration_switches_to_medium_speeds() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = AdcModule::new(ModuleIndex::Adc0, &regs, &vref, &TEENSY_3_2).unwrap();

    assert!(adc.is_calibrating());
    assert_eq!(regs.calibrations_started(), 1);
    assert_eq!(adc.averaging(), 32);
    assert_eq!(adc.conversion_speed(), ConversionSpeed::VeryLow);

    block_on(adc.wait_for_calibration());

    assert!(!adc.is_calibrating());
    assert_eq!(regs.peek(Reg::Pg), 0x8108);
    assert_eq!(regs.peek(Reg::Mg), 0x810D);
    assert_eq!(adc.averaging(), 4);
    assert_eq!(regs.peek(Reg::Sc3) & (sc3::AVGE | sc3::AVGS), sc3::AVGE);
    assert_eq!(adc.conversion_speed(), ConversionSpeed::Med);
    assert_eq!(adc.sampling_speed(), SamplingSpeed::Med);
    assert_eq!(adc.resolution(), 10);
    assert_eq!(adc.reference(), Reference::Default);
    assert!(adc.fail_flags().is_empty());

    // Nothing left to finish.
    adc.finish_calibration();
    assert_eq!(adc.averaging(), 4);
}

#[test]
fn failed_calibration_is_recorded() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    regs.fail_calibration(true);
    let adc = module(ModuleIndex::Adc0, &regs, &vref);

    assert!(adc.fail_flags().contains(AdcError::CALIB));
    regs.set_sample(5, 12);
    assert_eq!(block_on(adc.analog_read(14)), Ok(12));
}

#[test]
fn read_after_construction() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = AdcModule::new(ModuleIndex::Adc0, &regs, &vref, &TEENSY_3_2).unwrap();
    regs.set_sample(5, 700);

    // The first read finishes the boot calibration on its way.
    let value = block_on(adc.analog_read(14)).unwrap();
    assert_eq!(value, 700);
    assert!(value as u32 <= adc.max_value());
    assert!(!adc.is_calibrating());
    assert_eq!(regs.calibrations_started(), 1);
    assert_eq!(adc.pending_measurements(), 0);
    assert!(adc.fail_flags().is_empty());

    assert_eq!(block_on(adc.analog_read(24)), Err(Error::WrongPin));
    assert!(adc.fail_flags().contains(AdcError::WRONG_PIN));
    assert_eq!(adc.pending_measurements(), 0);

    adc.reset_error();
    assert!(adc.fail_flags().is_empty());

    regs.set_sample(26, 400);
    assert_eq!(block_on(adc.read_internal(InternalSource::TempSensor)), Ok(400));
}

#[test]
fn unchanged_settings_do_not_touch_registers() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);

    block_on(async {
        adc.set_averaging(8).await;
        let writes = regs.write_count();
        adc.set_averaging(9).await;
        assert_eq!(regs.write_count(), writes);

        adc.set_resolution(16).await;
        let writes = regs.write_count();
        adc.set_resolution(15).await;
        adc.set_sampling_speed(SamplingSpeed::Med).await;
        assert_eq!(regs.write_count(), writes);

        adc.enable_compare(100, true).await;
        let writes = regs.write_count();
        adc.enable_compare(100, true).await;
        assert_eq!(regs.write_count(), writes);

        adc.set_conversion_speed(ConversionSpeed::High).await;
        assert_eq!(regs.calibrations_started(), 2);
        assert!(!adc.is_calibrating());
        let writes = regs.write_count();
        adc.set_conversion_speed(ConversionSpeed::High).await;
        assert_eq!(regs.write_count(), writes);
        assert_eq!(regs.calibrations_started(), 2);
    });
}

#[test]
fn settings_reach_registers() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);

    block_on(async {
        adc.set_resolution(13).await;
        assert_eq!(adc.resolution(), 12);
        assert_eq!(adc.max_value(), 4095);
        assert_eq!(regs.peek(Reg::Cfg1) & cfg1::MODE, 1 << 2);

        adc.set_averaging(32).await;
        assert_eq!(regs.peek(Reg::Sc3) & (sc3::AVGE | sc3::AVGS), sc3::AVGE | 3);
        adc.set_averaging(2).await;
        assert_eq!(adc.averaging(), 0);
        assert_eq!(regs.peek(Reg::Sc3) & sc3::AVGE, 0);

        adc.set_conversion_speed(ConversionSpeed::High).await;
        assert_eq!(regs.peek(Reg::Cfg1) & (cfg1::ADIV | cfg1::ADICLK | cfg1::ADLPC), 2 << 5);
        assert_eq!(regs.peek(Reg::Cfg2) & (cfg2::ADHSC | cfg2::ADACKEN), cfg2::ADHSC);

        adc.set_sampling_speed(SamplingSpeed::VeryHigh).await;
        assert_eq!(regs.peek(Reg::Cfg1) & cfg1::ADLSMP, 0);
        adc.set_sampling_speed(SamplingSpeed::Low).await;
        assert_eq!(regs.peek(Reg::Cfg1) & cfg1::ADLSMP, cfg1::ADLSMP);
        assert_eq!(regs.peek(Reg::Cfg2) & cfg2::ADLSTS, 1);
    });

    adc.set_hardware_trigger(true);
    adc.enable_dma();
    assert_eq!(regs.peek(Reg::Sc2) & (sc2::ADTRG | sc2::DMAEN), sc2::ADTRG | sc2::DMAEN);
    assert!(adc.is_dma_enabled());
    adc.disable_dma();
    adc.set_hardware_trigger(false);
    assert_eq!(regs.peek(Reg::Sc2) & (sc2::ADTRG | sc2::DMAEN), 0);
}

#[test]
fn reference_switch_recalibrates() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);
    assert_eq!(vref.stops(), 1);

    block_on(adc.set_reference(Reference::Alternate));
    assert_eq!(vref.starts(), 1);
    assert_eq!(regs.peek(Reg::Sc2) & sc2::REFSEL, 1);
    assert!(adc.is_calibrating());
    assert_eq!(regs.calibrations_started(), 2);

    block_on(adc.set_reference(Reference::Alternate));
    assert_eq!(vref.starts(), 1);
    assert_eq!(regs.calibrations_started(), 2);
    assert!(!adc.is_calibrating());

    block_on(adc.set_reference(Reference::Default));
    assert_eq!(vref.stops(), 2);
    assert_eq!(regs.peek(Reg::Sc2) & sc2::REFSEL, 0);
}

#[test]
fn reference_switch_does_not_wait_for_vref() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);
    vref.set_stable(false);

    match block_on(select(adc.set_reference(Reference::Alternate), core::future::ready(()))) {
        Either::First(()) => {}
        Either::Second(()) => panic!("reference switch waited for the voltage reference"),
    }
    assert_eq!(vref.starts(), 1);
    assert_eq!(adc.reference(), Reference::Alternate);
    assert!(adc.is_calibrating());
}

#[test]
fn range_compare_registers() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);
    let mask = sc2::ACFE | sc2::ACFGT | sc2::ACREN;

    block_on(adc.enable_compare_range(10, 20, false, true));
    assert_eq!(regs.peek(Reg::Cv1), 20);
    assert_eq!(regs.peek(Reg::Cv2), 10);
    assert_eq!(regs.peek(Reg::Sc2) & mask, mask);

    block_on(adc.enable_compare_range(10, 20, true, false));
    assert_eq!(regs.peek(Reg::Cv1), 20);
    assert_eq!(regs.peek(Reg::Cv2), 10);
    assert_eq!(regs.peek(Reg::Sc2) & mask, sc2::ACFE | sc2::ACREN);

    block_on(adc.disable_compare());
    assert_eq!(regs.peek(Reg::Sc2) & mask, 0);
    assert_eq!(adc.compare(), Compare::Disabled);
}

#[test]
fn failed_compare_reports_error() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);

    block_on(adc.enable_compare(1000, true));
    regs.set_sample(5, 500);
    assert_eq!(block_on(adc.analog_read(14)), Err(Error::Comparison));
    assert!(adc.fail_flags().contains(AdcError::COMPARISON));
    assert_eq!(adc.pending_measurements(), 0);

    regs.set_sample(5, 1500);
    assert_eq!(block_on(adc.analog_read(14)), Ok(1500));

    block_on(adc.enable_compare_range(100, 200, true, true));
    assert_eq!(block_on(adc.analog_read(14)), Err(Error::Comparison));
    regs.set_sample(5, 200);
    assert_eq!(block_on(adc.analog_read(14)), Ok(200));
}

#[test]
fn differential_results_are_signed() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);
    regs.set_sample(0, 0xFFF0);

    block_on(async {
        adc.set_resolution(12).await;
        assert_eq!(adc.analog_read_differential(34, 35).await, Ok(-16));
        assert!(adc.is_differential());

        adc.set_resolution(16).await;
        assert_eq!(adc.analog_read_differential(34, 35).await, Ok(-32));
        assert_eq!(adc.max_value(), 65535);

        assert_eq!(adc.analog_read_differential(34, 36).await, Err(Error::WrongPin));
        assert_eq!(adc.analog_read_differential(14, 15).await, Err(Error::WrongPin));
    });
}

#[test]
fn pga_routes_amplified_pair() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);
    regs.set_sample(2, 100);

    block_on(async {
        assert_eq!(adc.enable_pga(3).await, Ok(()));
        assert_eq!(adc.pga_gain(), 4);
        assert_eq!(regs.peek(Reg::Pga), pga::PGAEN | (2 << 16));

        assert!(adc.check_differential_pins(34, 35));
        assert!(!adc.check_differential_pins(36, 37));
        assert_eq!(adc.analog_read_differential(34, 35).await, Ok(100));
        assert_eq!(regs.peek(Reg::Sc1a) & (sc1::DIFF | sc1::ADCH), sc1::DIFF | 2);

        adc.disable_pga().await;
        assert!(!adc.is_pga_enabled());
        assert_eq!(regs.peek(Reg::Pga), 0);
        assert!(adc.check_differential_pins(36, 37));
    });
}

#[test]
fn pga_missing_on_teensy_3_0() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = AdcModule::new(ModuleIndex::Adc0, &regs, &vref, &TEENSY_3_0).unwrap();

    assert_eq!(block_on(adc.enable_pga(8)), Err(Error::Unsupported));
    assert!(adc.fail_flags().contains(AdcError::OTHER));
    assert!(!adc.is_pga_enabled());

    let regs1 = MockRegisters::new();
    assert!(AdcModule::new(ModuleIndex::Adc1, &regs1, &vref, &TEENSY_3_0).is_err());
}

#[test]
fn preempted_conversion_is_resumed() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);
    regs.set_conversion_ticks(50);

    block_on(adc.start_single_read(16)).unwrap();
    assert_eq!(adc.pending_measurements(), 1);
    let before = config(&regs);

    regs.set_sample(9, 321);
    assert_eq!(block_on(adc.analog_read(17)), Ok(321));

    assert_eq!(config(&regs), before);
    assert!(adc.is_converting());
    assert_eq!(adc.pending_measurements(), 1);
    assert_eq!(regs.conversions_started(), 3);

    regs.set_sample(8, 77);
    regs.complete_conversion();
    assert!(adc.is_complete());
    assert_eq!(adc.read_single(), 77);
    assert_eq!(adc.pending_measurements(), 0);
}

#[test]
fn dropped_read_resumes_preempted_conversion() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);
    regs.set_conversion_ticks(50);

    block_on(adc.start_single_read(16)).unwrap();
    let before = config(&regs);

    match block_on(select(adc.analog_read(17), core::future::ready(()))) {
        Either::First(_) => panic!("read completed in a single poll"),
        Either::Second(()) => {}
    }

    assert_eq!(config(&regs), before);
    assert_eq!(adc.pending_measurements(), 1);
}

#[test]
fn pending_count_saturates() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);

    for _ in 0..300 {
        block_on(adc.start_single_read(16)).unwrap();
    }
    assert_eq!(adc.pending_measurements(), u8::MAX);
}

#[test]
fn continuous_value_holds_until_next_sample() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);

    block_on(adc.start_continuous(14)).unwrap();
    assert!(adc.is_continuous());
    assert_eq!(adc.pending_measurements(), 1);

    regs.set_sample(5, 100);
    regs.complete_conversion();
    assert_eq!(adc.analog_read_continuous(), 100);
    assert_eq!(adc.analog_read_continuous(), 100);

    regs.set_sample(5, 200);
    assert_eq!(adc.analog_read_continuous(), 100);
    regs.complete_conversion();
    assert_eq!(adc.analog_read_continuous(), 200);
    assert!(adc.is_converting());

    adc.stop_continuous();
    assert!(!adc.is_converting());
    assert!(!adc.is_continuous());
    assert_eq!(adc.pending_measurements(), 0);

    // Stopping with nothing pending leaves the count at zero instead of
    // decrementing it, unlike the Teensy library's inverted guard.
    adc.stop_continuous();
    assert_eq!(adc.pending_measurements(), 0);
}

#[test]
fn differential_continuous() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);

    block_on(adc.start_continuous_differential(36, 37)).unwrap();
    regs.set_sample(3, (-40i16) as u16);
    regs.complete_conversion();
    assert_eq!(adc.analog_read_continuous(), -40);
    adc.stop_continuous();

    assert_eq!(block_on(adc.start_continuous(13)), Err(Error::WrongPin));
    assert_eq!(adc.pending_measurements(), 0);
}

static CONVERSIONS: AtomicU32 = AtomicU32::new(0);

fn on_conversion() {
    CONVERSIONS.fetch_add(1, Ordering::Relaxed);
}

#[derive(Default)]
struct Controller {
    enabled: Option<(u16, u8)>,
}

impl InterruptController for Controller {
    fn enable(&mut self, irq: u16, priority: u8) {
        self.enabled = Some((irq, priority));
    }

    fn disable(&mut self, irq: u16) {
        assert_eq!(self.enabled.map(|(n, _)| n), Some(irq));
        self.enabled = None;
    }
}

#[test]
fn interrupt_callbacks() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc = module(ModuleIndex::Adc0, &regs, &vref);
    let mut ctrl = Controller::default();

    adc.enable_interrupts(&mut ctrl, on_conversion, 3);
    assert_eq!(ctrl.enabled, Some((57, 3)));
    assert!(adc.interrupts_enabled());
    assert!(!adc.is_converting());

    interrupt::on_interrupt(ModuleIndex::Adc0);
    assert_eq!(CONVERSIONS.load(Ordering::Relaxed), 1);

    regs.set_sample(5, 9);
    assert_eq!(block_on(adc.analog_read(14)), Ok(9));
    assert!(adc.interrupts_enabled());

    adc.disable_interrupts(&mut ctrl);
    assert_eq!(ctrl.enabled, None);
    assert!(!adc.interrupts_enabled());
    interrupt::on_interrupt(ModuleIndex::Adc0);
    assert_eq!(CONVERSIONS.load(Ordering::Relaxed), 1);
}

// Both modules

#[test]
fn coordinator_rejects_mismatched_modules() {
    let regs0 = MockRegisters::new();
    let regs1 = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = module(ModuleIndex::Adc0, &regs0, &vref);
    let adc1 = module(ModuleIndex::Adc1, &regs1, &vref);

    assert!(Adc::new(&adc1, Some(&adc0)).is_err());
    assert!(Adc::new(&adc0, Some(&adc0)).is_err());
    assert!(Adc::new(&adc0, Some(&adc1)).is_ok());
}

#[test]
fn routing_balances_shared_pins() {
    let regs0 = MockRegisters::new();
    let regs1 = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = module(ModuleIndex::Adc0, &regs0, &vref);
    let adc1 = module(ModuleIndex::Adc1, &regs1, &vref);
    let adc = Adc::new(&adc0, Some(&adc1)).unwrap();

    // Equal load goes to module 1.
    assert_eq!(adc.select_module(16, AdcSelect::Any), Ok(ModuleIndex::Adc1));

    block_on(adc0.start_single_read(14)).unwrap();
    assert_eq!(adc.select_module(16, AdcSelect::Any), Ok(ModuleIndex::Adc1));

    block_on(adc1.start_single_read(16)).unwrap();
    block_on(adc1.start_single_read(17)).unwrap();
    assert_eq!(adc.select_module(16, AdcSelect::Any), Ok(ModuleIndex::Adc0));

    assert_eq!(adc.select_module(14, AdcSelect::Any), Ok(ModuleIndex::Adc0));
    assert_eq!(adc.select_module(26, AdcSelect::Any), Ok(ModuleIndex::Adc1));
    assert_eq!(adc.select_module(14, AdcSelect::Adc1), Ok(ModuleIndex::Adc1));

    assert_eq!(adc.select_module(24, AdcSelect::Any), Err(Error::WrongPin));
    assert!(adc0.fail_flags().contains(AdcError::WRONG_PIN));

    // A forced module still checks the pin.
    assert_eq!(block_on(adc.analog_read(14, AdcSelect::Adc1)), Err(Error::WrongPin));
    assert!(adc1.fail_flags().contains(AdcError::WRONG_PIN));
}

#[test]
fn routed_operations() {
    let regs0 = MockRegisters::new();
    let regs1 = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = module(ModuleIndex::Adc0, &regs0, &vref);
    let adc1 = module(ModuleIndex::Adc1, &regs1, &vref);
    let adc = Adc::new(&adc0, Some(&adc1)).unwrap();

    regs1.set_sample(5, 55);
    assert_eq!(block_on(adc.analog_read(26, AdcSelect::Any)), Ok(55));

    // Both modules can measure 36 - 37, the tie goes to module 1.
    regs0.set_sample(3, 5);
    regs1.set_sample(0, 6);
    assert_eq!(block_on(adc.analog_read_differential(36, 37, AdcSelect::Any)), Ok(6));
    assert_eq!(block_on(adc.analog_read_differential(36, 37, AdcSelect::Adc0)), Ok(5));

    let index = block_on(adc.start_single_read(14, AdcSelect::Any)).unwrap();
    assert_eq!(index, ModuleIndex::Adc0);
    regs0.set_sample(5, 66);
    regs0.complete_conversion();
    assert_eq!(adc.read_single(index), Ok(66));

    let index = block_on(adc.start_continuous(26, AdcSelect::Any)).unwrap();
    regs1.complete_conversion();
    assert_eq!(adc.analog_read_continuous(index), Ok(55));
    assert_eq!(adc.stop_continuous(index), Ok(()));
    assert_eq!(adc1.pending_measurements(), 0);
}

#[test]
fn synchronized_read_reports_each_module() {
    let regs0 = MockRegisters::new();
    let regs1 = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = module(ModuleIndex::Adc0, &regs0, &vref);
    let adc1 = module(ModuleIndex::Adc1, &regs1, &vref);
    let adc = Adc::new(&adc0, Some(&adc1)).unwrap();

    block_on(adc0.enable_compare(1000, true));
    regs0.set_sample(5, 500);
    regs1.set_sample(8, 2000);

    let result = block_on(adc.analog_synchronized_read(14, 16));
    assert_eq!(result.result_adc0, Err(Error::Comparison));
    assert_eq!(result.result_adc1, Ok(2000));
    assert_eq!(result.raw(), (ERROR_VALUE, 2000));
    assert!(!result.is_ok());
    assert!(adc0.fail_flags().contains(AdcError::COMPARISON));
    assert!(adc1.fail_flags().is_empty());
    assert_eq!(adc0.pending_measurements(), 0);
    assert_eq!(adc1.pending_measurements(), 0);

    block_on(adc0.disable_compare());
    let result = block_on(adc.analog_synchronized_read(14, 16));
    assert_eq!(result.raw(), (500, 2000));
}

#[test]
fn synchronized_read_needs_both_pins() {
    let regs0 = MockRegisters::new();
    let regs1 = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = module(ModuleIndex::Adc0, &regs0, &vref);
    let adc1 = module(ModuleIndex::Adc1, &regs1, &vref);
    let adc = Adc::new(&adc0, Some(&adc1)).unwrap();

    let result = block_on(adc.analog_synchronized_read(24, 16));
    assert_eq!(result.result_adc0, Err(Error::WrongPin));
    assert_eq!(result.result_adc1, Err(Error::Synch));
    assert!(adc1.fail_flags().contains(AdcError::SYNCH));
    assert_eq!(regs1.conversions_started(), 0);

    assert_eq!(block_on(adc.start_synchronized_single_read(24, 16)), Err(Error::WrongPin));
}

#[test]
fn synchronized_read_on_single_converter_board() {
    let regs = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = AdcModule::new(ModuleIndex::Adc0, &regs, &vref, &TEENSY_3_0).unwrap();
    let adc = Adc::new(&adc0, None).unwrap();

    let result = block_on(adc.analog_synchronized_read(14, 16));
    assert_eq!(result.result_adc1, Err(Error::WrongAdc));
    assert!(adc0.fail_flags().contains(AdcError::WRONG_ADC | AdcError::SYNCH));
    assert_eq!(adc.select_module(14, AdcSelect::Adc1), Err(Error::WrongAdc));
    assert_eq!(adc.read_synchronized_continuous().result_adc1, Err(Error::WrongAdc));
}

#[test]
fn synchronized_single_and_differential() {
    let regs0 = MockRegisters::new();
    let regs1 = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = module(ModuleIndex::Adc0, &regs0, &vref);
    let adc1 = module(ModuleIndex::Adc1, &regs1, &vref);
    let adc = Adc::new(&adc0, Some(&adc1)).unwrap();

    regs0.set_sample(5, 11);
    regs1.set_sample(8, 22);
    block_on(adc.start_synchronized_single_read(14, 16)).unwrap();
    assert_eq!(adc0.pending_measurements(), 1);
    assert_eq!(adc1.pending_measurements(), 1);
    regs0.complete_conversion();
    regs1.complete_conversion();
    assert_eq!(adc.read_synchronized_single().raw(), (11, 22));
    assert_eq!(adc0.pending_measurements(), 0);
    assert_eq!(adc1.pending_measurements(), 0);

    regs0.set_sample(0, (-3i16) as u16);
    regs1.set_sample(3, 7);
    let result = block_on(adc.analog_synchronized_read_differential(34, 35, 34, 35));
    assert_eq!(result.raw(), (-3, 7));

    block_on(adc.start_synchronized_single_differential(34, 35, 34, 35)).unwrap();
    regs0.complete_conversion();
    regs1.complete_conversion();
    assert_eq!(adc.read_synchronized_single().raw(), (-3, 7));
}

#[test]
fn synchronized_read_resumes_both_modules() {
    let regs0 = MockRegisters::new();
    let regs1 = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = module(ModuleIndex::Adc0, &regs0, &vref);
    let adc1 = module(ModuleIndex::Adc1, &regs1, &vref);
    let adc = Adc::new(&adc0, Some(&adc1)).unwrap();
    regs1.set_conversion_ticks(50);

    block_on(adc0.start_continuous(14)).unwrap();
    block_on(adc1.start_single_read(17)).unwrap();
    let before = (config(&regs0), config(&regs1));
    let pending = (adc0.pending_measurements(), adc1.pending_measurements());

    regs0.set_sample(14, 111);
    regs1.set_sample(8, 222);
    let result = block_on(adc.analog_synchronized_read(15, 16));
    assert_eq!(result.raw(), (111, 222));

    assert_eq!((config(&regs0), config(&regs1)), before);
    assert_eq!((adc0.pending_measurements(), adc1.pending_measurements()), pending);
    assert!(adc0.is_continuous());

    regs0.set_sample(5, 7);
    regs0.complete_conversion();
    assert_eq!(adc0.analog_read_continuous(), 7);

    regs1.set_sample(9, 99);
    regs1.complete_conversion();
    assert!(adc1.is_complete());
    assert_eq!(adc1.read_single(), 99);
}

#[test]
fn synchronized_continuous() {
    let regs0 = MockRegisters::new();
    let regs1 = MockRegisters::new();
    let vref = MockVref::new();
    let adc0 = module(ModuleIndex::Adc0, &regs0, &vref);
    let adc1 = module(ModuleIndex::Adc1, &regs1, &vref);
    let adc = Adc::new(&adc0, Some(&adc1)).unwrap();

    block_on(adc.start_synchronized_continuous(14, 16)).unwrap();
    assert!(adc0.is_continuous() && adc1.is_continuous());
    // Armed once, then restarted together.
    assert_eq!(regs0.conversions_started(), 2);
    assert_eq!(regs1.conversions_started(), 2);
    assert_eq!(regs0.peek(Reg::Sc1a) & sc1::ADCH, 5);
    assert_eq!(regs1.peek(Reg::Sc1a) & sc1::ADCH, 8);

    regs0.set_sample(5, 1);
    regs1.set_sample(8, 2);
    regs0.complete_conversion();
    regs1.complete_conversion();
    assert_eq!(adc.read_synchronized_continuous().raw(), (1, 2));

    adc.stop_synchronized_continuous();
    assert!(!adc0.is_converting() && !adc1.is_converting());
    assert_eq!(adc0.pending_measurements(), 0);
    assert_eq!(adc1.pending_measurements(), 0);

    block_on(adc.start_synchronized_continuous_differential(34, 35, 36, 37)).unwrap();
    assert!(adc0.is_differential() && adc1.is_differential());
    adc.stop_synchronized_continuous();
}
