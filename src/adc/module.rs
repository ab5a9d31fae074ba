use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use embassy_futures::yield_now;
use embassy_hal_internal::drop::OnDrop;
use embassy_sync::blocking_mutex::CriticalSectionMutex;

use super::pins::{InternalSource, PGA_CHANNEL, PIN_INVALID};
use super::regs::{cfg1, cfg2, pga, sc1, sc2, sc3, IrqGuard, Reg, RegisterAccess, DATA_MASK, GAIN_SENTINEL};
use super::settings::{
    Averaging, ClockConfig, Compare, CompareRegisters, ConversionSpeed, Gain, Reference, Resolution, SamplingSpeed,
};
use super::{AdcError, Error, ModuleIndex};
use crate::board::{Board, ModuleDescriptor};
use crate::interrupt::{self, Callback, Event, InterruptController};
use crate::vref::{NoVref, VoltageReference, VrefMode, DEFAULT_TRIM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Settings {
    resolution: Resolution,
    reference: Reference,
    conversion_speed: ConversionSpeed,
    sampling_speed: SamplingSpeed,
    averaging: Averaging,
    compare: Compare,
    gain: Option<Gain>,
}

impl Settings {
    /// Power-on configuration, slow enough for a reliable first calibration.
    const BOOT: Settings = Settings {
        resolution: Resolution::Bits10,
        reference: Reference::Default,
        conversion_speed: ConversionSpeed::VeryLow,
        sampling_speed: SamplingSpeed::VeryLow,
        averaging: Averaging::Avg32,
        compare: Compare::Disabled,
        gain: None,
    };
}

/// Configuration registers of a module, captured so an in-flight conversion
/// can be resumed after it was preempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot {
    sc1a: u32,
    cfg1: u32,
    cfg2: u32,
    sc2: u32,
    sc3: u32,
    cv1: u32,
    cv2: u32,
}

impl Snapshot {
    fn capture(regs: &impl RegisterAccess) -> Self {
        Self {
            sc1a: regs.read(Reg::Sc1a),
            cfg1: regs.read(Reg::Cfg1),
            cfg2: regs.read(Reg::Cfg2),
            sc2: regs.read(Reg::Sc2),
            sc3: regs.read(Reg::Sc3),
            cv1: regs.read(Reg::Cv1),
            cv2: regs.read(Reg::Cv2),
        }
    }

    /// Writes the configuration back. `SC1A` goes last since writing it
    /// restarts the conversion.
    fn restore(&self, regs: &impl RegisterAccess) {
        regs.write(Reg::Cfg1, self.cfg1);
        regs.write(Reg::Cfg2, self.cfg2);
        regs.write(Reg::Cv1, self.cv1);
        regs.write(Reg::Cv2, self.cv2);
        regs.write(Reg::Sc2, self.sc2 & sc2::WRITABLE);
        regs.write(Reg::Sc3, self.sc3 & sc3::CONFIG);
        regs.write(Reg::Sc1a, self.sc1a & !sc1::COCO);
    }
}

/// Measurement input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Input {
    Single(u8),
    Differential(u8, u8),
}

/// Validated input, ready to be written to the channel select register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Armed {
    pub sc1a: u32,
    /// `Some(true)` for the "a" side of the channel multiplexer, `None` to leave it alone.
    pub mux_a: Option<bool>,
    pub differential: bool,
}

/// One converter module.
///
/// All operations take `&self`; the module is meant to live in a `static`
/// and be shared between tasks and interrupt handlers.
pub struct AdcModule<R: RegisterAccess, V: VoltageReference = NoVref> {
    index: ModuleIndex,
    regs: R,
    vref: V,
    board: &'static Board,
    desc: &'static ModuleDescriptor,
    calibrating: AtomicBool,
    init_calibration: AtomicBool,
    pending: AtomicU8,
    fail_flags: AtomicU16,
    settings: CriticalSectionMutex<Cell<Settings>>,
    saved: CriticalSectionMutex<Cell<Option<Snapshot>>>,
}

impl<R: RegisterAccess, V: VoltageReference> AdcModule<R, V> {
    /// Configures the module for a slow, accurate first calibration and starts it.
    ///
    /// The calibration finishes on the first operation that needs the module,
    /// or explicitly with [`wait_for_calibration`](Self::wait_for_calibration),
    /// and then switches to medium speeds with 4 sample averaging.
    pub fn new(index: ModuleIndex, regs: R, vref: V, board: &'static Board) -> Result<Self, Error> {
        let Some(desc) = board.module(index) else {
            warn!("{} has no adc{}", board.name, index.to_index());
            return Err(Error::WrongAdc);
        };

        let this = Self {
            index,
            regs,
            vref,
            board,
            desc,
            calibrating: AtomicBool::new(false),
            init_calibration: AtomicBool::new(true),
            pending: AtomicU8::new(0),
            fail_flags: AtomicU16::new(0),
            settings: CriticalSectionMutex::new(Cell::new(Settings::BOOT)),
            saved: CriticalSectionMutex::new(Cell::new(None)),
        };

        let boot = Settings::BOOT;
        this.apply_resolution(boot.resolution);
        this.apply_reference(boot.reference);
        this.apply_conversion_speed(boot.conversion_speed);
        this.apply_sampling_speed(boot.sampling_speed);
        this.apply_averaging(boot.averaging);
        this.calibrate();

        debug!("adc{} initialized on {}", index.to_index(), board.name);
        Ok(this)
    }

    pub fn index(&self) -> ModuleIndex {
        self.index
    }

    pub fn board(&self) -> &'static Board {
        self.board
    }

    fn settings(&self) -> Settings {
        self.settings.lock(|s| s.get())
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) {
        self.settings.lock(|s| {
            let mut v = s.get();
            f(&mut v);
            s.set(v);
        })
    }

    pub(crate) fn record(&self, flags: AdcError) {
        self.fail_flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// Sticky failure flags recorded since the last [`reset_error`](Self::reset_error).
    pub fn fail_flags(&self) -> AdcError {
        AdcError::from_bits_truncate(self.fail_flags.load(Ordering::Acquire))
    }

    pub fn reset_error(&self) {
        self.fail_flags.store(0, Ordering::Release);
    }

    /// Number of started measurements whose result has not been taken yet.
    pub fn pending_measurements(&self) -> u8 {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn acquire(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1));
    }

    pub(crate) fn release(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    // Calibration

    /// Starts a calibration without waiting for it.
    pub fn calibrate(&self) {
        let _cs = IrqGuard::new();
        self.calibrating.store(true, Ordering::Release);
        // CALF is write-one-to-clear.
        self.regs.set_bits(Reg::Sc3, sc3::CALF | sc3::CAL);
        trace!("adc{} calibration started", self.index.to_index());
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating.load(Ordering::Acquire)
    }

    /// Waits for a running calibration to end, then applies its results.
    pub async fn wait_for_calibration(&self) {
        if !self.is_calibrating() {
            return;
        }
        while self.regs.read(Reg::Sc3) & sc3::CAL != 0 {
            yield_now().await;
        }
        self.finish_calibration();
    }

    /// Loads the gain registers from a finished calibration.
    ///
    /// Does nothing while the calibration is still running or when none was started.
    pub fn finish_calibration(&self) {
        let first = {
            let _cs = IrqGuard::new();
            if !self.is_calibrating() {
                return;
            }
            let status = self.regs.read(Reg::Sc3);
            if status & sc3::CAL != 0 {
                return;
            }

            let plus = self.calibration_gain(&Reg::PLUS_CAL);
            let minus = self.calibration_gain(&Reg::MINUS_CAL);
            self.regs.write(Reg::Pg, plus as u32);
            self.regs.write(Reg::Mg, minus as u32);

            if status & sc3::CALF != 0 {
                self.record(AdcError::CALIB);
                warn!("adc{} calibration failed", self.index.to_index());
            } else {
                trace!("adc{} calibrated, pg {} mg {}", self.index.to_index(), plus, minus);
            }

            self.calibrating.store(false, Ordering::Release);
            self.init_calibration.swap(false, Ordering::AcqRel)
        };

        if first {
            self.apply_conversion_speed(ConversionSpeed::Med);
            self.apply_sampling_speed(SamplingSpeed::Med);
            self.apply_averaging(Averaging::Avg4);
            self.update(|s| {
                s.conversion_speed = ConversionSpeed::Med;
                s.sampling_speed = SamplingSpeed::Med;
                s.averaging = Averaging::Avg4;
            });
        }
    }

    fn calibration_gain(&self, regs: &[Reg]) -> u16 {
        let sum = regs
            .iter()
            .fold(0u16, |acc, &reg| acc.wrapping_add(self.regs.read(reg) as u16));
        (sum / 2) | GAIN_SENTINEL
    }

    // Settings

    fn apply_reference(&self, reference: Reference) {
        match reference {
            Reference::Alternate => self.vref.start(VrefMode::HighPower, DEFAULT_TRIM),
            Reference::Default => self.vref.stop(),
        }
        self.regs.write_field(Reg::Sc2, sc2::REFSEL, reference.refsel());
    }

    /// Selects the voltage reference and starts a calibration for it.
    ///
    /// The external reference is only switched on; waiting for it to settle
    /// is left to the application.
    pub async fn set_reference(&self, reference: Reference) {
        self.wait_for_calibration().await;
        if self.settings().reference == reference {
            return;
        }
        self.apply_reference(reference);
        self.update(|s| s.reference = reference);
        self.calibrate();
    }

    pub fn reference(&self) -> Reference {
        self.settings().reference
    }

    fn apply_resolution(&self, resolution: Resolution) {
        self.regs.write_field(Reg::Cfg1, cfg1::MODE, resolution.mode());
    }

    /// Sets the result width, rounded to 8, 10, 12 or 16 bits.
    pub async fn set_resolution(&self, bits: u8) {
        let resolution = Resolution::from_bits(bits);
        self.wait_for_calibration().await;
        if self.settings().resolution == resolution {
            return;
        }
        self.apply_resolution(resolution);
        self.update(|s| s.resolution = resolution);
    }

    pub fn resolution(&self) -> u8 {
        self.settings().resolution.bits()
    }

    /// Largest value a conversion can return at the current resolution.
    pub fn max_value(&self) -> u32 {
        self.settings().resolution.max_value()
    }

    fn apply_conversion_speed(&self, speed: ConversionSpeed) {
        let clock = speed.clock_config(self.board.bus_clock_hz, self.board.max_adc_clock_hz);
        let _cs = IrqGuard::new();
        let c1 = self.regs.read(Reg::Cfg1) & !ClockConfig::CFG1_MASK;
        self.regs.write(Reg::Cfg1, c1 | clock.cfg1());
        let c2 = self.regs.read(Reg::Cfg2) & !ClockConfig::CFG2_MASK;
        self.regs.write(Reg::Cfg2, c2 | clock.cfg2());
    }

    /// Changes the converter clock and recalibrates for it.
    pub async fn set_conversion_speed(&self, speed: ConversionSpeed) {
        self.wait_for_calibration().await;
        if self.settings().conversion_speed == speed {
            return;
        }
        self.apply_conversion_speed(speed);
        self.update(|s| s.conversion_speed = speed);
        self.calibrate();
        self.wait_for_calibration().await;
    }

    pub fn conversion_speed(&self) -> ConversionSpeed {
        self.settings().conversion_speed
    }

    fn apply_sampling_speed(&self, speed: SamplingSpeed) {
        let (long, adlsts) = speed.encoding();
        let _cs = IrqGuard::new();
        self.regs.change_bits(Reg::Cfg1, cfg1::ADLSMP, long);
        self.regs.write_field(Reg::Cfg2, cfg2::ADLSTS, adlsts);
    }

    pub async fn set_sampling_speed(&self, speed: SamplingSpeed) {
        self.wait_for_calibration().await;
        if self.settings().sampling_speed == speed {
            return;
        }
        self.apply_sampling_speed(speed);
        self.update(|s| s.sampling_speed = speed);
    }

    pub fn sampling_speed(&self) -> SamplingSpeed {
        self.settings().sampling_speed
    }

    fn apply_averaging(&self, averaging: Averaging) {
        self.regs.write_field(Reg::Sc3, sc3::AVGE | sc3::AVGS, averaging.sc3());
    }

    /// Sets hardware averaging, rounded down to 4, 8, 16 or 32 samples.
    /// Fewer than 4 disables it.
    pub async fn set_averaging(&self, count: u8) {
        let averaging = Averaging::from_count(count);
        self.wait_for_calibration().await;
        if self.settings().averaging == averaging {
            return;
        }
        self.apply_averaging(averaging);
        self.update(|s| s.averaging = averaging);
    }

    pub fn averaging(&self) -> u8 {
        self.settings().averaging.count()
    }

    fn apply_compare(&self, compare: Compare) {
        let _cs = IrqGuard::new();
        let status = self.regs.read(Reg::Sc2) & !CompareRegisters::SC2_MASK;
        match compare.registers() {
            Some(r) => {
                self.regs.write(Reg::Cv1, r.cv1);
                self.regs.write(Reg::Cv2, r.cv2);
                self.regs.write(Reg::Sc2, status | r.sc2);
            }
            None => self.regs.write(Reg::Sc2, status),
        }
    }

    async fn set_compare(&self, compare: Compare) {
        self.wait_for_calibration().await;
        if self.settings().compare == compare {
            return;
        }
        self.apply_compare(compare);
        self.update(|s| s.compare = compare);
    }

    /// Only completes conversions `>= value` when `greater_than`, `< value` otherwise.
    pub async fn enable_compare(&self, value: i16, greater_than: bool) {
        self.set_compare(Compare::Single { value, greater_than }).await
    }

    /// Only completes conversions inside (or outside) `lower..upper`.
    pub async fn enable_compare_range(&self, lower: i16, upper: i16, inside: bool, inclusive: bool) {
        self.set_compare(Compare::Range {
            lower,
            upper,
            inside,
            inclusive,
        })
        .await
    }

    pub async fn disable_compare(&self) {
        self.set_compare(Compare::Disabled).await
    }

    pub fn compare(&self) -> Compare {
        self.settings().compare
    }

    fn apply_gain(&self, gain: Option<Gain>) {
        let value = gain.map_or(0, |g| pga::PGAEN | ((g.to_bit_shift() as u32) << 16));
        let _cs = IrqGuard::new();
        let old = self.regs.read(Reg::Pga) & !(pga::PGAEN | pga::PGAG);
        self.regs.write(Reg::Pga, old | value);
    }

    /// Routes the amplified differential pair through the gain amplifier.
    /// The gain is rounded up to a power of two, at most 64.
    pub async fn enable_pga(&self, gain: u8) -> Result<(), Error> {
        if !self.desc.has_pga {
            self.record(AdcError::OTHER);
            warn!("adc{} has no gain amplifier", self.index.to_index());
            return Err(Error::Unsupported);
        }
        let gain = Some(Gain::from_gain(gain));
        self.wait_for_calibration().await;
        if self.settings().gain == gain {
            return Ok(());
        }
        self.apply_gain(gain);
        self.update(|s| s.gain = gain);
        Ok(())
    }

    pub async fn disable_pga(&self) {
        if !self.desc.has_pga {
            return;
        }
        self.wait_for_calibration().await;
        if self.settings().gain.is_none() {
            return;
        }
        self.apply_gain(None);
        self.update(|s| s.gain = None);
    }

    pub fn is_pga_enabled(&self) -> bool {
        self.settings().gain.is_some()
    }

    /// Current amplifier gain, 1 when disabled.
    pub fn pga_gain(&self) -> u8 {
        self.settings().gain.map_or(1, |g| g.gain())
    }

    // Peripheral wiring

    pub fn enable_dma(&self) {
        self.regs.set_bits(Reg::Sc2, sc2::DMAEN);
    }

    pub fn disable_dma(&self) {
        self.regs.clear_bits(Reg::Sc2, sc2::DMAEN);
    }

    pub fn is_dma_enabled(&self) -> bool {
        self.regs.read(Reg::Sc2) & sc2::DMAEN != 0
    }

    /// Starts conversions from the hardware trigger instead of channel writes.
    pub fn set_hardware_trigger(&self, hardware: bool) {
        self.regs.change_bits(Reg::Sc2, sc2::ADTRG, hardware);
    }

    /// Enables the conversion complete interrupt and routes it to `callback`.
    ///
    /// Rewriting the channel select register restarts a running conversion;
    /// on an idle module the channel is parked.
    pub fn enable_interrupts(&self, ctrl: &mut impl InterruptController, callback: Callback, priority: u8) {
        interrupt::register(Event::Conversion, self.index, Some(callback));
        self.change_interrupt_enable(true);
        ctrl.enable(self.desc.irq, priority);
        debug!("adc{} interrupts enabled, priority {}", self.index.to_index(), priority);
    }

    pub fn disable_interrupts(&self, ctrl: &mut impl InterruptController) {
        ctrl.disable(self.desc.irq);
        self.change_interrupt_enable(false);
        interrupt::register(Event::Conversion, self.index, None);
    }

    fn change_interrupt_enable(&self, enable: bool) {
        let _cs = IrqGuard::new();
        if self.is_converting() {
            self.regs.change_bits(Reg::Sc1a, sc1::AIEN, enable);
        } else {
            let aien = if enable { sc1::AIEN } else { 0 };
            self.regs.write(Reg::Sc1a, aien | PIN_INVALID as u32);
        }
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.regs.read(Reg::Sc1a) & sc1::AIEN != 0
    }

    // Status

    pub fn is_converting(&self) -> bool {
        self.regs.read(Reg::Sc2) & sc2::ADACT != 0
    }

    pub fn is_complete(&self) -> bool {
        self.regs.read(Reg::Sc1a) & sc1::COCO != 0
    }

    pub fn is_differential(&self) -> bool {
        self.regs.read(Reg::Sc1a) & sc1::DIFF != 0
    }

    pub fn is_continuous(&self) -> bool {
        self.regs.read(Reg::Sc3) & sc3::ADCO != 0
    }

    // Pins

    /// Whether the module can measure `pin` single-ended.
    pub fn check_pin(&self, pin: u8) -> bool {
        self.desc.pins.channel(pin).is_some()
    }

    /// Whether the module can measure `pin_p - pin_n`. With the gain amplifier
    /// enabled only its pair qualifies.
    pub fn check_differential_pins(&self, pin_p: u8, pin_n: u8) -> bool {
        self.diff_channel(pin_p, pin_n).is_some()
    }

    fn diff_channel(&self, pin_p: u8, pin_n: u8) -> Option<u8> {
        let pair = self.desc.pins.diff_pair(pin_p, pin_n)?;
        match self.is_pga_enabled() {
            false => Some(pair.channel),
            true if pair.pga => Some(PGA_CHANNEL),
            true => None,
        }
    }

    pub(crate) fn validate(&self, input: Input) -> Result<Armed, Error> {
        let armed = match input {
            Input::Single(pin) => self.desc.pins.channel(pin).map(|c| Armed {
                sc1a: c.code as u32,
                mux_a: Some(c.mux_a),
                differential: false,
            }),
            Input::Differential(pin_p, pin_n) => self.diff_channel(pin_p, pin_n).map(|code| Armed {
                sc1a: code as u32 | sc1::DIFF,
                mux_a: None,
                differential: true,
            }),
        };
        armed.ok_or_else(|| {
            self.record(AdcError::WRONG_PIN);
            warn!("adc{} cannot measure {:?}", self.index.to_index(), input);
            Error::WrongPin
        })
    }

    // Conversions

    /// Captures the configuration if a conversion is running, so it can be resumed later.
    pub(crate) fn save_if_busy(&self) -> Option<Snapshot> {
        let _cs = IrqGuard::new();
        self.is_converting().then(|| Snapshot::capture(&self.regs))
    }

    pub(crate) fn restore(&self, snapshot: Snapshot) {
        let _cs = IrqGuard::new();
        snapshot.restore(&self.regs);
        trace!("adc{} resumed preempted conversion", self.index.to_index());
    }

    /// Writes the channel select register, keeping the interrupt enable bit.
    pub(crate) fn write_channel(&self, sc1a: u32) {
        let _cs = IrqGuard::new();
        let aien = self.regs.read(Reg::Sc1a) & sc1::AIEN;
        self.regs.write(Reg::Sc1a, sc1a | aien);
    }

    pub(crate) fn channel_select(&self) -> u32 {
        self.regs.read(Reg::Sc1a) & !sc1::COCO
    }

    /// Starts a conversion of an already validated input.
    pub(crate) fn arm(&self, armed: &Armed, continuous: bool) {
        if let Some(mux_a) = armed.mux_a {
            self.regs.change_bits(Reg::Cfg2, cfg2::MUXSEL, !mux_a);
        }
        self.regs.change_bits(Reg::Sc3, sc3::ADCO, continuous);
        self.write_channel(armed.sc1a);
    }

    fn read_result(&self, differential: bool) -> i32 {
        let raw = self.regs.read(Reg::Ra) & DATA_MASK;
        if differential {
            let value = raw as u16 as i16 as i32;
            if self.settings().resolution == Resolution::Bits16 {
                value * 2
            } else {
                value
            }
        } else {
            raw as i32
        }
    }

    /// Takes the result of a finished conversion. A conversion that ended
    /// without completing failed the compare function.
    pub(crate) fn take_result(&self, differential: bool) -> Result<i32, Error> {
        if self.is_complete() {
            Ok(self.read_result(differential))
        } else {
            self.record(AdcError::COMPARISON);
            trace!("adc{} conversion failed the compare function", self.index.to_index());
            Err(Error::Comparison)
        }
    }

    /// Runs one conversion to completion, preempting and then resuming any
    /// conversion in flight.
    pub(crate) async fn convert(&self, armed: Armed) -> Result<i32, Error> {
        self.acquire();
        let saved = Cell::new(None);
        let _done = OnDrop::new(|| {
            if let Some(snapshot) = saved.take() {
                self.restore(snapshot);
            }
            self.release();
        });

        self.wait_for_calibration().await;
        saved.set(self.save_if_busy());
        self.arm(&armed, false);
        while self.is_converting() {
            yield_now().await;
        }

        let _cs = IrqGuard::new();
        let result = self.take_result(armed.differential);
        if let Some(snapshot) = saved.take() {
            self.restore(snapshot);
        }
        result
    }

    /// Measures `pin`.
    pub async fn analog_read(&self, pin: u8) -> Result<i32, Error> {
        let armed = self.validate(Input::Single(pin))?;
        self.convert(armed).await
    }

    /// Measures `pin_p - pin_n`, as a signed value.
    pub async fn analog_read_differential(&self, pin_p: u8, pin_n: u8) -> Result<i32, Error> {
        let armed = self.validate(Input::Differential(pin_p, pin_n))?;
        self.convert(armed).await
    }

    pub async fn read_internal(&self, source: InternalSource) -> Result<i32, Error> {
        self.analog_read(source.pin()).await
    }

    /// Keeps the configuration of a running conversion until the next [`read_single`](Self::read_single).
    pub(crate) fn stash(&self) {
        let snapshot = self.save_if_busy();
        self.saved.lock(|s| s.set(snapshot));
    }

    pub(crate) async fn start(&self, armed: Armed, continuous: bool) {
        self.wait_for_calibration().await;
        if !continuous {
            self.stash();
        }
        self.acquire();
        self.arm(&armed, continuous);
    }

    /// Starts a conversion of `pin` and returns at once; collect the value
    /// with [`read_single`](Self::read_single) once [`is_complete`](Self::is_complete).
    pub async fn start_single_read(&self, pin: u8) -> Result<(), Error> {
        let armed = self.validate(Input::Single(pin))?;
        self.start(armed, false).await;
        Ok(())
    }

    pub async fn start_single_differential(&self, pin_p: u8, pin_n: u8) -> Result<(), Error> {
        let armed = self.validate(Input::Differential(pin_p, pin_n))?;
        self.start(armed, false).await;
        Ok(())
    }

    /// Result of the conversion started by `start_single_*`. Resumes the
    /// conversion that start preempted, if any.
    pub fn read_single(&self) -> i32 {
        let value = {
            let _cs = IrqGuard::new();
            let value = self.read_result(self.is_differential());
            if let Some(snapshot) = self.saved.lock(|s| s.take()) {
                self.restore(snapshot);
            }
            value
        };
        self.release();
        value
    }

    /// Converts `pin` over and over until [`stop_continuous`](Self::stop_continuous).
    pub async fn start_continuous(&self, pin: u8) -> Result<(), Error> {
        let armed = self.validate(Input::Single(pin))?;
        self.start(armed, true).await;
        Ok(())
    }

    pub async fn start_continuous_differential(&self, pin_p: u8, pin_n: u8) -> Result<(), Error> {
        let armed = self.validate(Input::Differential(pin_p, pin_n))?;
        self.start(armed, true).await;
        Ok(())
    }

    /// Latest continuous result. Repeats the same value until the next conversion completes.
    pub fn analog_read_continuous(&self) -> i32 {
        self.read_result(self.is_differential())
    }

    /// Stops continuous conversions. The pending count never goes below zero,
    /// so stopping an idle module is harmless.
    pub fn stop_continuous(&self) {
        {
            let _cs = IrqGuard::new();
            self.write_channel(PIN_INVALID as u32);
            self.regs.clear_bits(Reg::Sc3, sc3::ADCO);
        }
        self.release();
    }
}
