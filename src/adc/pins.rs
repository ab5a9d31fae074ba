//! Pin to channel routing tables.
//!
//! Each converter module has its own table, indexed by board pin number.
//! Entries hold the `ADCH` channel code in the low five bits, plus flags for
//! the `MUXSEL` setting and differential capability.

/// Channel code of a pin that cannot be measured by the module.
/// Writing it to `ADCH` stops the converter.
pub const PIN_INVALID: u8 = 0x1F;

/// The channel is on the "a" input of the channel multiplexer.
pub const PIN_MUX_A: u8 = 0x80;

/// The pin is the positive input of a differential pair.
pub const PIN_DIFF: u8 = 0x40;

const CHANNEL_MASK: u8 = 0x1F;

/// `ADCH` of the amplified differential input.
pub const PGA_CHANNEL: u8 = 0x02;

const X: u8 = PIN_INVALID;
const A: u8 = PIN_MUX_A;
const D: u8 = PIN_DIFF;

/// Resolved single-ended or differential input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel {
    pub code: u8,
    pub mux_a: bool,
}

/// Differential pin pair of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffPair {
    pub pin_p: u8,
    pub pin_n: u8,
    pub channel: u8,
    /// Whether the pair is wired through the programmable gain amplifier.
    pub pga: bool,
}

/// Routing table of one converter module.
#[derive(Debug, Clone, Copy)]
pub struct PinTable {
    pub channels: &'static [u8],
    pub diff_pairs: &'static [DiffPair],
}

impl PinTable {
    fn entry(&self, pin: u8) -> Option<u8> {
        self.channels.get(pin as usize).copied()
    }

    /// Single-ended channel of `pin`, `None` if the module cannot measure it.
    pub fn channel(&self, pin: u8) -> Option<Channel> {
        let entry = self.entry(pin)?;
        let code = entry & CHANNEL_MASK;
        (code != PIN_INVALID).then_some(Channel {
            code,
            mux_a: entry & PIN_MUX_A != 0,
        })
    }

    /// Whether `pin` is the positive input of a differential pair.
    pub fn is_differential(&self, pin: u8) -> bool {
        self.entry(pin).map_or(false, |e| e & PIN_DIFF != 0)
    }

    /// Differential pair made of `pin_p` and `pin_n`.
    pub fn diff_pair(&self, pin_p: u8, pin_n: u8) -> Option<&DiffPair> {
        if !self.is_differential(pin_p) {
            return None;
        }
        self.diff_pairs
            .iter()
            .find(|p| p.pin_p == pin_p && p.pin_n == pin_n && p.channel != PIN_INVALID)
    }
}

/// Internal signals wired to dedicated channels on both modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InternalSource {
    TempSensor,
    VrefOut,
    Bandgap,
    VrefH,
    VrefL,
}

impl InternalSource {
    /// Pin number the source is routed through.
    pub const fn pin(self) -> u8 {
        match self {
            InternalSource::TempSensor => 38,
            InternalSource::VrefOut => 39,
            InternalSource::Bandgap => 41,
            InternalSource::VrefH => 42,
            InternalSource::VrefL => 43,
        }
    }
}

/// Teensy 3.x converter 0: digital pins 0-13, A0-A9 (14-23), unused 24-33,
/// A10-A13 (34-37), internal sources (38-43).
pub static TEENSY_3X_ADC0_CHANNELS: [u8; 44] = [
    5, 14, 8, 9, 13, 12, 6, 7, 15, 4, 0, 19, 3, X, //
    5, 14, 8, 9, 13, 12, 6, 7, 15, 4, //
    X, X, X, X, X, X, X, X, X, X, //
    0 | D, 19 | D, 3 | D, 21 | D, //
    26, 22, 23, 27, 29, 30,
];

/// Teensy 3.1/3.2 converter 1, same pin numbering as converter 0.
pub static TEENSY_31_ADC1_CHANNELS: [u8; 44] = [
    X, X, 8, 9, X, X, X, X, X, X, X, X, X, X, //
    X, X, 8, 9, X, X, X, X, X, X, //
    X, X, 5 | A, 5, 4, 6, 7, 4 | A, X, X, //
    3 | D, X | D, 0 | D, 19 | D, //
    26, 18, X, 27, 29, 30,
];

pub static TEENSY_30_ADC0_DIFF: [DiffPair; 2] = [
    DiffPair {
        pin_p: 34,
        pin_n: 35,
        channel: 0,
        pga: false,
    },
    DiffPair {
        pin_p: 36,
        pin_n: 37,
        channel: 3,
        pga: false,
    },
];

pub static TEENSY_31_ADC0_DIFF: [DiffPair; 2] = [
    DiffPair {
        pin_p: 34,
        pin_n: 35,
        channel: 0,
        pga: true,
    },
    DiffPair {
        pin_p: 36,
        pin_n: 37,
        channel: 3,
        pga: false,
    },
];

pub static TEENSY_31_ADC1_DIFF: [DiffPair; 2] = [
    DiffPair {
        pin_p: 34,
        pin_n: 35,
        channel: 3,
        pga: false,
    },
    DiffPair {
        pin_p: 36,
        pin_n: 37,
        channel: 0,
        pga: true,
    },
];
