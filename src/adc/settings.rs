//! Converter configuration values and their register encodings.

use super::regs::{cfg1, cfg2, sc2, sc3, DATA_MASK};

/// Result width of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Bits8,
    Bits10,
    Bits12,
    Bits16,
}

impl Resolution {
    /// Rounds a requested bit count to the nearest width the converter supports.
    pub const fn from_bits(bits: u8) -> Self {
        match bits {
            0..=9 => Resolution::Bits8,
            10..=11 => Resolution::Bits10,
            12..=13 => Resolution::Bits12,
            _ => Resolution::Bits16,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Resolution::Bits8 => 8,
            Resolution::Bits10 => 10,
            Resolution::Bits12 => 12,
            Resolution::Bits16 => 16,
        }
    }

    /// Largest value a conversion can produce.
    pub const fn max_value(self) -> u32 {
        (1 << self.bits()) - 1
    }

    /// `CFG1.MODE` field value.
    pub(crate) const fn mode(self) -> u32 {
        match self {
            Resolution::Bits8 => 0,
            Resolution::Bits12 => 1,
            Resolution::Bits10 => 2,
            Resolution::Bits16 => 3,
        }
    }
}

/// Voltage reference of the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// Supply rail (3.3 V) or the external reference pin.
    Default,
    /// Internal 1.2 V band-gap reference.
    Alternate,
}

impl Reference {
    pub(crate) const fn refsel(self) -> u32 {
        match self {
            Reference::Default => 0,
            Reference::Alternate => 1,
        }
    }
}

/// Converter clock setting.
///
/// The bus-clock derived speeds are resolved against the board clocks by
/// [`ConversionSpeed::clock_config`]; the `Adack*` speeds run from the
/// converter's own asynchronous clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionSpeed {
    /// Slowest divider keeping the clock at or above 1 MHz.
    VeryLow,
    /// Slowest divider keeping the clock at or above 2 MHz.
    Low,
    /// One divider step below `High16Bits` when there is room for it.
    Med,
    /// Fastest divider keeping the clock at or below 12 MHz, the 16 bit limit.
    High16Bits,
    /// Fastest divider within the board's maximum converter clock.
    High,
    /// Fastest divider within twice the maximum converter clock, out of specification.
    VeryHigh,
    Adack2_4,
    Adack4_0,
    Adack5_2,
    Adack6_2,
}

const MIN_CLOCK_VERY_LOW: u32 = 1_000_000;
const MIN_CLOCK_LOW: u32 = 2_000_000;
const MAX_CLOCK_16_BITS: u32 = 12_000_000;

/// Bus clock dividers, from `/1` to `/16`, as (`ADIV`, `ADICLK`) pairs.
const DIVIDERS: [(u32, u32, u32); 5] = [(1, 0, 0), (2, 1, 0), (4, 2, 0), (8, 3, 0), (16, 3, 1)];

/// Clock fields of `CFG1` and `CFG2` for one conversion speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClockConfig {
    pub adiv: u32,
    pub adiclk: u32,
    pub adlpc: bool,
    pub adhsc: bool,
    pub adacken: bool,
}

impl ClockConfig {
    pub(crate) const CFG1_MASK: u32 = cfg1::ADIV | cfg1::ADICLK | cfg1::ADLPC;
    pub(crate) const CFG2_MASK: u32 = cfg2::ADHSC | cfg2::ADACKEN;

    pub(crate) fn cfg1(&self) -> u32 {
        let mut v = (self.adiv << 5) | self.adiclk;
        if self.adlpc {
            v |= cfg1::ADLPC;
        }
        v
    }

    pub(crate) fn cfg2(&self) -> u32 {
        let mut v = 0;
        if self.adhsc {
            v |= cfg2::ADHSC;
        }
        if self.adacken {
            v |= cfg2::ADACKEN;
        }
        v
    }
}

fn slowest_at_least(bus_hz: u32, min_hz: u32) -> usize {
    (0..DIVIDERS.len())
        .rev()
        .find(|&i| bus_hz / DIVIDERS[i].0 >= min_hz)
        .unwrap_or(0)
}

fn fastest_at_most(bus_hz: u32, max_hz: u32) -> usize {
    (0..DIVIDERS.len())
        .find(|&i| bus_hz / DIVIDERS[i].0 <= max_hz)
        .unwrap_or(DIVIDERS.len() - 1)
}

impl ConversionSpeed {
    /// Index into the bus clock divider table, `None` for the asynchronous clock speeds.
    fn divider(self, bus_hz: u32, max_hz: u32) -> Option<usize> {
        let idx = match self {
            ConversionSpeed::VeryLow => slowest_at_least(bus_hz, MIN_CLOCK_VERY_LOW),
            ConversionSpeed::Low => slowest_at_least(bus_hz, MIN_CLOCK_LOW),
            ConversionSpeed::Med => {
                let low = slowest_at_least(bus_hz, MIN_CLOCK_LOW);
                let high = fastest_at_most(bus_hz, MAX_CLOCK_16_BITS);
                if low > high + 1 {
                    high + 1
                } else {
                    high
                }
            }
            ConversionSpeed::High16Bits => fastest_at_most(bus_hz, MAX_CLOCK_16_BITS),
            ConversionSpeed::High => fastest_at_most(bus_hz, max_hz),
            ConversionSpeed::VeryHigh => fastest_at_most(bus_hz, max_hz.saturating_mul(2)),
            _ => return None,
        };
        Some(idx)
    }

    /// Resolves the speed against the bus clock and the maximum converter clock.
    pub(crate) fn clock_config(self, bus_hz: u32, max_hz: u32) -> ClockConfig {
        if let Some(idx) = self.divider(bus_hz, max_hz) {
            let (_, adiv, adiclk) = DIVIDERS[idx];
            let (adlpc, adhsc) = match self {
                ConversionSpeed::VeryLow | ConversionSpeed::Low => (true, false),
                ConversionSpeed::Med => (false, false),
                _ => (false, true),
            };
            return ClockConfig {
                adiv,
                adiclk,
                adlpc,
                adhsc,
                adacken: false,
            };
        }

        let (adlpc, adhsc) = match self {
            ConversionSpeed::Adack2_4 => (true, false),
            ConversionSpeed::Adack4_0 => (true, true),
            ConversionSpeed::Adack5_2 => (false, false),
            _ => (false, true),
        };
        ClockConfig {
            adiv: 0,
            adiclk: 3,
            adlpc,
            adhsc,
            adacken: true,
        }
    }

    /// Converter clock frequency for this speed, `None` for the asynchronous clock.
    pub fn frequency(self, bus_hz: u32, max_hz: u32) -> Option<u32> {
        self.divider(bus_hz, max_hz).map(|idx| bus_hz / DIVIDERS[idx].0)
    }
}

/// Sample time setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplingSpeed {
    /// Long sample, +20 converter cycles.
    VeryLow,
    /// Long sample, +12 converter cycles.
    Low,
    /// Long sample, +6 converter cycles.
    Med,
    /// Long sample, +2 converter cycles.
    High,
    /// Short sample.
    VeryHigh,
}

impl SamplingSpeed {
    /// (`ADLSMP`, `ADLSTS`) pair.
    pub(crate) const fn encoding(self) -> (bool, u32) {
        match self {
            SamplingSpeed::VeryLow => (true, 0),
            SamplingSpeed::Low => (true, 1),
            SamplingSpeed::Med => (true, 2),
            SamplingSpeed::High => (true, 3),
            SamplingSpeed::VeryHigh => (false, 0),
        }
    }
}

/// Hardware averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Averaging {
    Disabled,
    Avg4,
    Avg8,
    Avg16,
    Avg32,
}

impl Averaging {
    /// Rounds a requested sample count down to a supported one; below 4 disables averaging.
    pub const fn from_count(count: u8) -> Self {
        match count {
            0..=3 => Averaging::Disabled,
            4..=7 => Averaging::Avg4,
            8..=15 => Averaging::Avg8,
            16..=31 => Averaging::Avg16,
            _ => Averaging::Avg32,
        }
    }

    pub const fn count(self) -> u8 {
        match self {
            Averaging::Disabled => 0,
            Averaging::Avg4 => 4,
            Averaging::Avg8 => 8,
            Averaging::Avg16 => 16,
            Averaging::Avg32 => 32,
        }
    }

    /// `SC3.AVGE` and `SC3.AVGS` bits.
    pub(crate) const fn sc3(self) -> u32 {
        match self {
            Averaging::Disabled => 0,
            Averaging::Avg4 => sc3::AVGE,
            Averaging::Avg8 => sc3::AVGE | 1,
            Averaging::Avg16 => sc3::AVGE | 2,
            Averaging::Avg32 => sc3::AVGE | 3,
        }
    }
}

/// Programmable gain amplifier setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    X1,
    X2,
    X4,
    X8,
    X16,
    X32,
    X64,
}

impl Gain {
    /// Rounds a requested gain up to the next supported power of two.
    pub const fn from_gain(gain: u8) -> Self {
        match gain {
            0..=1 => Gain::X1,
            2 => Gain::X2,
            3..=4 => Gain::X4,
            5..=8 => Gain::X8,
            9..=16 => Gain::X16,
            17..=32 => Gain::X32,
            _ => Gain::X64,
        }
    }

    pub const fn gain(self) -> u8 {
        1 << self.to_bit_shift()
    }

    /// `PGA.PGAG` field value.
    pub const fn to_bit_shift(self) -> u8 {
        match self {
            Gain::X1 => 0,
            Gain::X2 => 1,
            Gain::X4 => 2,
            Gain::X8 => 3,
            Gain::X16 => 4,
            Gain::X32 => 5,
            Gain::X64 => 6,
        }
    }
}

/// Hardware compare function applied to every conversion.
///
/// A conversion whose value fails the compare never completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Compare {
    Disabled,
    /// Accept values `>= value` when `greater_than`, `< value` otherwise.
    Single { value: i16, greater_than: bool },
    /// Accept values inside (or outside) `lower..upper`, bounds included when `inclusive`.
    Range {
        lower: i16,
        upper: i16,
        inside: bool,
        inclusive: bool,
    },
}

/// Register values realising a [`Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CompareRegisters {
    pub cv1: u32,
    pub cv2: u32,
    pub sc2: u32,
}

impl CompareRegisters {
    pub(crate) const SC2_MASK: u32 = sc2::ACFE | sc2::ACFGT | sc2::ACREN;
}

fn cv(value: i16) -> u32 {
    value as u32 & DATA_MASK
}

impl Compare {
    pub(crate) fn registers(self) -> Option<CompareRegisters> {
        match self {
            Compare::Disabled => None,
            Compare::Single { value, greater_than } => Some(CompareRegisters {
                cv1: cv(value),
                cv2: 0,
                sc2: sc2::ACFE | if greater_than { sc2::ACFGT } else { 0 },
            }),
            Compare::Range {
                lower,
                upper,
                inside,
                inclusive,
            } => {
                // The hardware selects inside/outside from the order of CV1 and CV2,
                // and inclusive/exclusive from ACFGT.
                let (cv1, cv2) = if inside == inclusive { (lower, upper) } else { (upper, lower) };
                let mut sc2 = sc2::ACFE | sc2::ACREN;
                if inclusive {
                    sc2 |= sc2::ACFGT;
                }
                Some(CompareRegisters {
                    cv1: cv(cv1),
                    cv2: cv(cv2),
                    sc2,
                })
            }
        }
    }
}
