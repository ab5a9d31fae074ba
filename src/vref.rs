//! Internal voltage reference.
//!
//! The alternate converter reference is the 1.2 V output of the VREF module,
//! which must be running while it is selected.

use embassy_futures::yield_now;
use vcell::VolatileCell;

/// Output buffer mode of the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VrefMode {
    BandgapOnly = 0,
    HighPower = 1,
    LowPower = 2,
}

/// Factory trim of the Teensy boards.
pub const DEFAULT_TRIM: u8 = 0x20;

pub trait VoltageReference {
    /// Powers up the reference with the given output mode and trim.
    fn start(&self, mode: VrefMode, trim: u8);

    fn stop(&self);

    fn is_on(&self) -> bool;

    fn is_stable(&self) -> bool;

    /// Adjusts the output voltage, in steps of about 0.5 mV.
    fn set_trim(&self, trim: u8);

    /// Waits until a started reference has settled.
    async fn wait_until_stable(&self) {
        while self.is_on() && !self.is_stable() {
            yield_now().await;
        }
    }
}

impl<T: VoltageReference + ?Sized> VoltageReference for &T {
    fn start(&self, mode: VrefMode, trim: u8) {
        T::start(self, mode, trim)
    }

    fn stop(&self) {
        T::stop(self)
    }

    fn is_on(&self) -> bool {
        T::is_on(self)
    }

    fn is_stable(&self) -> bool {
        T::is_stable(self)
    }

    fn set_trim(&self, trim: u8) {
        T::set_trim(self, trim)
    }
}

/// Placeholder for boards without a reference module. Always reports stable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVref;

impl VoltageReference for NoVref {
    fn start(&self, _mode: VrefMode, _trim: u8) {}

    fn stop(&self) {}

    fn is_on(&self) -> bool {
        false
    }

    fn is_stable(&self) -> bool {
        true
    }

    fn set_trim(&self, _trim: u8) {}
}

mod bits {
    pub const TRM_CHOPEN: u8 = 0x40;
    pub const TRM_TRIM: u8 = 0x3F;

    pub const SC_VREFEN: u8 = 0x80;
    pub const SC_REGEN: u8 = 0x40;
    pub const SC_ICOMPEN: u8 = 0x20;
    pub const SC_VREFST: u8 = 0x04;
    pub const SC_MODE_LV: u8 = 0x03;

    pub const PMC_REGSC_BGBE: u8 = 0x01;
}

/// Power management controller regulator status register, holding the band-gap buffer enable.
const PMC_REGSC: usize = 0x4007_D002;

#[repr(C)]
struct VrefRegs {
    trm: VolatileCell<u8>,
    sc: VolatileCell<u8>,
}

/// Kinetis VREF module.
#[derive(Debug, Clone, Copy)]
pub struct KinetisVref {
    base: usize,
}

impl KinetisVref {
    /// # Safety
    ///
    /// `base` must be the address of the VREF module of the running chip.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn regs(&self) -> &VrefRegs {
        // SAFETY: `new` requires `base` to be the VREF module address.
        unsafe { &*(self.base as *const VrefRegs) }
    }

    fn regsc(&self) -> &VolatileCell<u8> {
        // SAFETY: fixed PMC address on every Kinetis K20.
        unsafe { &*(PMC_REGSC as *const VolatileCell<u8>) }
    }
}

impl VoltageReference for KinetisVref {
    fn start(&self, mode: VrefMode, trim: u8) {
        let regs = self.regs();
        let regsc = self.regsc();
        regsc.set(regsc.get() | bits::PMC_REGSC_BGBE);
        regs.trm.set(bits::TRM_CHOPEN | (trim & bits::TRM_TRIM));
        regs.sc.set(bits::SC_VREFEN | bits::SC_REGEN | bits::SC_ICOMPEN | (mode as u8 & bits::SC_MODE_LV));
        trace!("vref started, mode {}, trim {}", mode as u8, trim);
    }

    fn stop(&self) {
        let regsc = self.regsc();
        self.regs().sc.set(0);
        regsc.set(regsc.get() & !bits::PMC_REGSC_BGBE);
        trace!("vref stopped");
    }

    fn is_on(&self) -> bool {
        self.regs().sc.get() & bits::SC_VREFEN != 0
    }

    fn is_stable(&self) -> bool {
        self.regs().sc.get() & bits::SC_VREFST != 0
    }

    fn set_trim(&self, trim: u8) {
        let trm = &self.regs().trm;
        trm.set((trm.get() & !bits::TRM_TRIM) | (trim & bits::TRM_TRIM));
    }
}
