//! Board descriptions.
//!
//! The board decides how many converter modules exist, where their registers
//! live, how pins are routed and which clocks feed them.

use crate::adc::pins::{
    PinTable, TEENSY_30_ADC0_DIFF, TEENSY_31_ADC0_DIFF, TEENSY_31_ADC1_CHANNELS, TEENSY_31_ADC1_DIFF,
    TEENSY_3X_ADC0_CHANNELS,
};
use crate::adc::ModuleIndex;

/// One converter module of a board.
#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    /// Base address of the register bank.
    pub base: usize,
    /// Conversion complete interrupt number.
    pub irq: u16,
    pub pins: PinTable,
    pub has_pga: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Board {
    pub name: &'static str,
    pub modules: &'static [ModuleDescriptor],
    /// Base address of the voltage reference module, if any.
    pub vref_base: Option<usize>,
    /// Bus clock feeding the converters.
    pub bus_clock_hz: u32,
    /// Highest converter clock within the electrical specification.
    pub max_adc_clock_hz: u32,
}

impl Board {
    pub fn module(&self, index: ModuleIndex) -> Option<&ModuleDescriptor> {
        self.modules.get(index.to_index())
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

pub const ADC0_BASE: usize = 0x4003_B000;
pub const ADC1_BASE: usize = 0x400B_B000;
pub const VREF_BASE: usize = 0x4007_4000;

const BUS_CLOCK_HZ: u32 = 48_000_000;
const MAX_ADC_CLOCK_HZ: u32 = 18_000_000;

static TEENSY_30_MODULES: [ModuleDescriptor; 1] = [ModuleDescriptor {
    base: ADC0_BASE,
    irq: 31,
    pins: PinTable {
        channels: &TEENSY_3X_ADC0_CHANNELS,
        diff_pairs: &TEENSY_30_ADC0_DIFF,
    },
    has_pga: false,
}];

static TEENSY_31_MODULES: [ModuleDescriptor; 2] = [
    ModuleDescriptor {
        base: ADC0_BASE,
        irq: 57,
        pins: PinTable {
            channels: &TEENSY_3X_ADC0_CHANNELS,
            diff_pairs: &TEENSY_31_ADC0_DIFF,
        },
        has_pga: true,
    },
    ModuleDescriptor {
        base: ADC1_BASE,
        irq: 58,
        pins: PinTable {
            channels: &TEENSY_31_ADC1_CHANNELS,
            diff_pairs: &TEENSY_31_ADC1_DIFF,
        },
        has_pga: true,
    },
];

/// Teensy 3.0 (MK20DX128), single converter without gain amplifier.
pub static TEENSY_3_0: Board = Board {
    name: "Teensy 3.0",
    modules: &TEENSY_30_MODULES,
    vref_base: Some(VREF_BASE),
    bus_clock_hz: BUS_CLOCK_HZ,
    max_adc_clock_hz: MAX_ADC_CLOCK_HZ,
};

/// Teensy 3.1 (MK20DX256), two converters.
pub static TEENSY_3_1: Board = Board {
    name: "Teensy 3.1",
    modules: &TEENSY_31_MODULES,
    vref_base: Some(VREF_BASE),
    bus_clock_hz: BUS_CLOCK_HZ,
    max_adc_clock_hz: MAX_ADC_CLOCK_HZ,
};

/// Teensy 3.2, electrically identical to the 3.1.
pub static TEENSY_3_2: Board = Board {
    name: "Teensy 3.2",
    modules: &TEENSY_31_MODULES,
    vref_base: Some(VREF_BASE),
    bus_clock_hz: BUS_CLOCK_HZ,
    max_adc_clock_hz: MAX_ADC_CLOCK_HZ,
};
