//! Simulated converter register bank.
//!
//! Time advances one tick per read of `SC2` or `SC3` (the registers the driver
//! polls) or per explicit [`MockRegisters::step`]. Calibrations and
//! conversions take a configurable number of ticks. Conversion values come
//! from a per-channel sample table and go through the compare function like
//! on hardware: a failing value ends the conversion without setting `COCO`.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::CriticalSectionMutex;

use super::regs::{sc1, sc2, sc3, Reg, RegisterAccess, DATA_MASK};
use crate::vref::{VoltageReference, VrefMode};

/// Calibration results loaded at the end of every calibration, plus side then minus side.
pub const CALIBRATION_PLUS: [u32; 6] = [0x20, 0x100, 0x80, 0x40, 0x20, 0x10];
pub const CALIBRATION_MINUS: [u32; 6] = [0x22, 0x104, 0x82, 0x41, 0x20, 0x11];

struct State {
    regs: [u32; Reg::COUNT],
    samples: [u16; 32],
    calibration_ticks: u32,
    conversion_ticks: u32,
    calibration_left: u32,
    conversion_left: u32,
    fail_calibration: bool,
    writes: u32,
    calibrations: u32,
    conversions: u32,
}

impl State {
    fn new() -> Self {
        let mut regs = [0; Reg::COUNT];
        regs[Reg::Sc1a.index()] = sc1::ADCH;
        Self {
            regs,
            samples: [0; 32],
            calibration_ticks: 3,
            conversion_ticks: 2,
            calibration_left: 0,
            conversion_left: 0,
            fail_calibration: false,
            writes: 0,
            calibrations: 0,
            conversions: 0,
        }
    }

    fn get(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    fn set(&mut self, reg: Reg, value: u32) {
        self.regs[reg.index()] = value;
    }

    fn tick(&mut self) {
        if self.calibration_left > 0 {
            self.calibration_left -= 1;
            if self.calibration_left == 0 {
                self.end_calibration();
            }
        }

        if self.get(Reg::Sc2) & sc2::ADACT != 0 {
            self.conversion_left = self.conversion_left.saturating_sub(1);
            if self.conversion_left == 0 {
                self.end_conversion();
            }
        }
    }

    fn end_calibration(&mut self) {
        for (reg, value) in Reg::PLUS_CAL.iter().zip(CALIBRATION_PLUS) {
            self.set(*reg, value);
        }
        for (reg, value) in Reg::MINUS_CAL.iter().zip(CALIBRATION_MINUS) {
            self.set(*reg, value);
        }
        let mut status = self.get(Reg::Sc3) & !sc3::CAL;
        if self.fail_calibration {
            status |= sc3::CALF;
        }
        self.set(Reg::Sc3, status);
    }

    fn compare_passes(&self, value: i32, differential: bool) -> bool {
        let status = self.get(Reg::Sc2);
        if status & sc2::ACFE == 0 {
            return true;
        }
        let decode = |raw: u32| {
            if differential {
                raw as u16 as i16 as i32
            } else {
                (raw & DATA_MASK) as i32
            }
        };
        let cv1 = decode(self.get(Reg::Cv1));
        let cv2 = decode(self.get(Reg::Cv2));
        let greater = status & sc2::ACFGT != 0;

        if status & sc2::ACREN == 0 {
            return if greater { value >= cv1 } else { value < cv1 };
        }
        match (greater, cv1 <= cv2) {
            (false, true) => value < cv1 || value > cv2,
            (false, false) => value > cv2 && value < cv1,
            (true, true) => value >= cv1 && value <= cv2,
            (true, false) => value >= cv1 || value <= cv2,
        }
    }

    fn end_conversion(&mut self) {
        let select = self.get(Reg::Sc1a);
        let differential = select & sc1::DIFF != 0;
        let raw = self.samples[(select & sc1::ADCH) as usize];
        let value = if differential { raw as i16 as i32 } else { raw as i32 };

        if self.compare_passes(value, differential) {
            self.set(Reg::Ra, raw as u32);
            self.set(Reg::Sc1a, select | sc1::COCO);
        }

        if self.get(Reg::Sc3) & sc3::ADCO != 0 {
            self.conversion_left = self.conversion_ticks;
        } else {
            let status = self.get(Reg::Sc2) & !sc2::ADACT;
            self.set(Reg::Sc2, status);
        }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        self.writes += 1;
        match reg {
            Reg::Sc1a => {
                // Writing the channel select aborts the running conversion.
                self.set(Reg::Sc1a, value & !sc1::COCO);
                let status = self.get(Reg::Sc2);
                if value & sc1::ADCH == sc1::ADCH {
                    self.set(Reg::Sc2, status & !sc2::ADACT);
                    self.conversion_left = 0;
                } else {
                    self.set(Reg::Sc2, status | sc2::ADACT);
                    self.conversion_left = self.conversion_ticks;
                    self.conversions += 1;
                }
            }
            Reg::Sc2 => {
                let active = self.get(Reg::Sc2) & sc2::ADACT;
                self.set(Reg::Sc2, (value & sc2::WRITABLE) | active);
            }
            Reg::Sc3 => {
                let old = self.get(Reg::Sc3);
                let mut failed = old & sc3::CALF;
                if value & sc3::CALF != 0 {
                    failed = 0;
                }
                if value & sc3::CAL != 0 {
                    failed = 0;
                    self.calibration_left = self.calibration_ticks;
                    self.calibrations += 1;
                } else if old & sc3::CAL != 0 {
                    self.calibration_left = 0;
                }
                self.set(Reg::Sc3, (value & !sc3::CALF) | failed);
            }
            Reg::Ra | Reg::Rb => {}
            _ => self.set(reg, value),
        }
    }

    fn read(&mut self, reg: Reg) -> u32 {
        match reg {
            Reg::Sc2 | Reg::Sc3 => self.tick(),
            Reg::Ra => {
                let select = self.get(Reg::Sc1a) & !sc1::COCO;
                self.set(Reg::Sc1a, select);
            }
            _ => {}
        }
        self.get(reg)
    }
}

/// Simulated register bank of one converter module.
pub struct MockRegisters {
    state: CriticalSectionMutex<RefCell<State>>,
}

impl Default for MockRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRegisters {
    pub fn new() -> Self {
        Self {
            state: CriticalSectionMutex::new(RefCell::new(State::new())),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        self.state.lock(|s| f(&mut s.borrow_mut()))
    }

    /// Sets the value converted on `channel`. Differential values are two's complement.
    pub fn set_sample(&self, channel: u8, value: u16) {
        self.with(|s| s.samples[(channel & 0x1F) as usize] = value)
    }

    pub fn set_calibration_ticks(&self, ticks: u32) {
        self.with(|s| s.calibration_ticks = ticks.max(1))
    }

    pub fn set_conversion_ticks(&self, ticks: u32) {
        self.with(|s| s.conversion_ticks = ticks.max(1))
    }

    /// Makes subsequent calibrations end with the failure flag set.
    pub fn fail_calibration(&self, fail: bool) {
        self.with(|s| s.fail_calibration = fail)
    }

    /// Advances time by one tick.
    pub fn step(&self) {
        self.with(|s| s.tick())
    }

    /// Advances time until the running conversion completes, or by one
    /// conversion period in continuous mode.
    pub fn complete_conversion(&self) {
        self.with(|s| {
            if s.get(Reg::Sc2) & sc2::ADACT != 0 {
                s.conversion_left = 1;
                s.tick();
            }
        })
    }

    /// Register value, without side effects.
    pub fn peek(&self, reg: Reg) -> u32 {
        self.with(|s| s.get(reg))
    }

    /// Overwrites a register, without side effects.
    pub fn poke(&self, reg: Reg, value: u32) {
        self.with(|s| s.set(reg, value))
    }

    /// Register writes performed by the driver.
    pub fn write_count(&self) -> u32 {
        self.with(|s| s.writes)
    }

    pub fn calibrations_started(&self) -> u32 {
        self.with(|s| s.calibrations)
    }

    pub fn conversions_started(&self) -> u32 {
        self.with(|s| s.conversions)
    }
}

impl RegisterAccess for MockRegisters {
    fn read(&self, reg: Reg) -> u32 {
        self.with(|s| s.read(reg))
    }

    fn write(&self, reg: Reg, value: u32) {
        self.with(|s| s.write(reg, value))
    }
}

/// Voltage reference that counts its start and stop requests.
pub struct MockVref {
    on: AtomicBool,
    stable: AtomicBool,
    starts: AtomicU32,
    stops: AtomicU32,
}

impl Default for MockVref {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVref {
    pub const fn new() -> Self {
        Self {
            on: AtomicBool::new(false),
            stable: AtomicBool::new(true),
            starts: AtomicU32::new(0),
            stops: AtomicU32::new(0),
        }
    }

    /// Makes the reference report itself settled or not.
    pub fn set_stable(&self, stable: bool) {
        self.stable.store(stable, Ordering::Relaxed);
    }

    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::Relaxed)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::Relaxed)
    }
}

impl VoltageReference for MockVref {
    fn start(&self, _mode: VrefMode, _trim: u8) {
        self.on.store(true, Ordering::Relaxed);
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    fn stop(&self) {
        self.on.store(false, Ordering::Relaxed);
        self.stops.fetch_add(1, Ordering::Relaxed);
    }

    fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }

    fn is_stable(&self) -> bool {
        self.stable.load(Ordering::Relaxed)
    }

    fn set_trim(&self, _trim: u8) {}
}
