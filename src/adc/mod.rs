//! Analog to digital converters.

mod dual;
mod module;
pub mod pins;
pub mod regs;
mod settings;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod test;

pub use dual::{Adc, AdcSelect, SyncResult};
pub use module::AdcModule;
pub use settings::{Averaging, Compare, ConversionSpeed, Gain, Reference, Resolution, SamplingSpeed};

/// Highest number of converter modules on any supported board.
pub const MODULE_COUNT: usize = 2;

/// Raw value reported in place of a failed conversion.
pub const ERROR_VALUE: i32 = -70000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleIndex {
    Adc0,
    Adc1,
}

impl ModuleIndex {
    pub const fn to_index(self) -> usize {
        match self {
            ModuleIndex::Adc0 => 0,
            ModuleIndex::Adc1 => 1,
        }
    }
}

bitflags::bitflags! {
    /// Sticky failure flags of a module, cleared by [`AdcModule::reset_error`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AdcError: u16 {
        const OTHER = 1 << 0;
        /// Calibration failed.
        const CALIB = 1 << 1;
        /// The pin cannot be measured by the module.
        const WRONG_PIN = 1 << 2;
        /// The conversion value failed the compare function.
        const COMPARISON = 1 << 7;
        /// The module does not exist on this board.
        const WRONG_ADC = 1 << 8;
        /// A synchronized measurement could not be started.
        const SYNCH = 1 << 9;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AdcError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "AdcError({=u16:#x})", self.bits())
    }
}

impl AdcError {
    /// Human readable name of the most significant flag set.
    pub fn name(&self) -> &'static str {
        if self.is_empty() {
            "none"
        } else if self.contains(AdcError::SYNCH) {
            "synchronization"
        } else if self.contains(AdcError::WRONG_ADC) {
            "wrong adc"
        } else if self.contains(AdcError::COMPARISON) {
            "comparison"
        } else if self.contains(AdcError::WRONG_PIN) {
            "wrong pin"
        } else if self.contains(AdcError::CALIB) {
            "calibration"
        } else {
            "other"
        }
    }
}

/// Error of a single operation. The matching [`AdcError`] flag is also
/// recorded on the module involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    WrongPin,
    Comparison,
    WrongAdc,
    Synch,
    /// The board lacks the hardware for the operation.
    Unsupported,
}

impl Error {
    pub const fn flag(self) -> AdcError {
        match self {
            Error::WrongPin => AdcError::WRONG_PIN,
            Error::Comparison => AdcError::COMPARISON,
            Error::WrongAdc => AdcError::WRONG_ADC,
            Error::Synch => AdcError::SYNCH,
            Error::Unsupported => AdcError::OTHER,
        }
    }
}

/// Collapses a conversion result to the raw integer convention, with
/// [`ERROR_VALUE`] standing for any failure.
pub fn into_raw(result: Result<i32, Error>) -> i32 {
    result.unwrap_or(ERROR_VALUE)
}
