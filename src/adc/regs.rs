//! Register access for the converter modules.
//!
//! Every hardware touch of the driver goes through [`RegisterAccess`]. The
//! read-modify-write helpers run inside an [`IrqGuard`] so they are atomic with
//! respect to the conversion-complete interrupt handler; platforms with
//! bit-band or bit-manipulation aliases may override them with single store
//! implementations as long as that atomicity holds.

use core::marker::PhantomData;

use volatile_register::RW;

/// Registers of one converter module, in address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reg {
    Sc1a,
    Sc1b,
    Cfg1,
    Cfg2,
    Ra,
    Rb,
    Cv1,
    Cv2,
    Sc2,
    Sc3,
    Ofs,
    Pg,
    Mg,
    Clpd,
    Clps,
    Clp4,
    Clp3,
    Clp2,
    Clp1,
    Clp0,
    Pga,
    Clmd,
    Clms,
    Clm4,
    Clm3,
    Clm2,
    Clm1,
    Clm0,
}

impl Reg {
    /// Number of 32-bit registers in a converter bank.
    pub const COUNT: usize = 28;

    /// Plus-side calibration results summed into the plus-side gain.
    pub const PLUS_CAL: [Reg; 6] = [Reg::Clps, Reg::Clp4, Reg::Clp3, Reg::Clp2, Reg::Clp1, Reg::Clp0];

    /// Minus-side calibration results summed into the minus-side gain.
    pub const MINUS_CAL: [Reg; 6] = [Reg::Clms, Reg::Clm4, Reg::Clm3, Reg::Clm2, Reg::Clm1, Reg::Clm0];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Byte offset from the bank base address.
    pub const fn offset(self) -> usize {
        self.index() * 4
    }
}

/// Status and control register 1 (channel select).
pub mod sc1 {
    pub const COCO: u32 = 1 << 7;
    pub const AIEN: u32 = 1 << 6;
    pub const DIFF: u32 = 1 << 5;
    pub const ADCH: u32 = 0x1F;
}

/// Configuration register 1.
pub mod cfg1 {
    pub const ADLPC: u32 = 1 << 7;
    pub const ADIV: u32 = 0x3 << 5;
    pub const ADLSMP: u32 = 1 << 4;
    pub const MODE: u32 = 0x3 << 2;
    pub const ADICLK: u32 = 0x3;
}

/// Configuration register 2.
pub mod cfg2 {
    pub const MUXSEL: u32 = 1 << 4;
    pub const ADACKEN: u32 = 1 << 3;
    pub const ADHSC: u32 = 1 << 2;
    pub const ADLSTS: u32 = 0x3;
}

/// Status and control register 2.
pub mod sc2 {
    pub const ADACT: u32 = 1 << 7;
    pub const ADTRG: u32 = 1 << 6;
    pub const ACFE: u32 = 1 << 5;
    pub const ACFGT: u32 = 1 << 4;
    pub const ACREN: u32 = 1 << 3;
    pub const DMAEN: u32 = 1 << 2;
    pub const REFSEL: u32 = 0x3;
    /// Writable part of the register.
    pub const WRITABLE: u32 = 0x7F;
}

/// Status and control register 3.
pub mod sc3 {
    pub const CAL: u32 = 1 << 7;
    pub const CALF: u32 = 1 << 6;
    pub const ADCO: u32 = 1 << 3;
    pub const AVGE: u32 = 1 << 2;
    pub const AVGS: u32 = 0x3;
    /// Conversion configuration part of the register, without the calibration bits.
    pub const CONFIG: u32 = 0x0F;
}

/// Programmable gain amplifier register.
pub mod pga {
    pub const PGAEN: u32 = 1 << 23;
    pub const PGAG: u32 = 0xF << 16;
}

/// Mask of the result and compare value registers.
pub const DATA_MASK: u32 = 0xFFFF;

/// Fixed bit the gain registers need on top of the calibration sum.
pub const GAIN_SENTINEL: u16 = 0x8000;

/// Scoped interrupt mask.
///
/// Interrupts stay masked until the guard is dropped, including on early
/// returns. Guards nest and must be released in reverse order, which scoping
/// guarantees.
pub struct IrqGuard {
    state: critical_section::RestoreState,
    _not_send: PhantomData<*mut ()>,
}

impl IrqGuard {
    pub fn new() -> Self {
        // SAFETY: released exactly once in `Drop`, on the same context and in
        // reverse acquisition order since the guard is neither `Send` nor `Copy`.
        let state = unsafe { critical_section::acquire() };
        Self {
            state,
            _not_send: PhantomData,
        }
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        // SAFETY: paired with the acquire in `new`.
        unsafe { critical_section::release(self.state) }
    }
}

/// Atomic access to a converter register bank.
pub trait RegisterAccess {
    fn read(&self, reg: Reg) -> u32;

    fn write(&self, reg: Reg, value: u32);

    fn set_bits(&self, reg: Reg, mask: u32) {
        let _cs = IrqGuard::new();
        let value = self.read(reg);
        self.write(reg, value | mask);
    }

    fn clear_bits(&self, reg: Reg, mask: u32) {
        let _cs = IrqGuard::new();
        let value = self.read(reg);
        self.write(reg, value & !mask);
    }

    fn change_bits(&self, reg: Reg, mask: u32, state: bool) {
        if state {
            self.set_bits(reg, mask)
        } else {
            self.clear_bits(reg, mask)
        }
    }

    /// Writes `value` into the field selected by `mask`, shifted to the mask position.
    fn write_field(&self, reg: Reg, mask: u32, value: u32) {
        let shift = mask.trailing_zeros();
        let _cs = IrqGuard::new();
        let old = self.read(reg);
        self.write(reg, (old & !mask) | ((value << shift) & mask));
    }

    fn read_field(&self, reg: Reg, mask: u32) -> u32 {
        (self.read(reg) & mask) >> mask.trailing_zeros()
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &T {
    #[inline]
    fn read(&self, reg: Reg) -> u32 {
        T::read(self, reg)
    }

    #[inline]
    fn write(&self, reg: Reg, value: u32) {
        T::write(self, reg, value)
    }
}

#[repr(C)]
struct RegisterBlock {
    regs: [RW<u32>; Reg::COUNT],
}

static_assertions::const_assert_eq!(core::mem::size_of::<RegisterBlock>(), 0x70);

/// Memory-mapped converter bank.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the address of a converter register bank, and no other
    /// `Mmio` for that bank may be used concurrently outside of this driver.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> usize {
        self.base
    }

    fn block(&self) -> &RegisterBlock {
        // SAFETY: `new` requires `base` to point at a register bank, which lives forever.
        unsafe { &*(self.base as *const RegisterBlock) }
    }
}

impl RegisterAccess for Mmio {
    #[inline]
    fn read(&self, reg: Reg) -> u32 {
        self.block().regs[reg.index()].read()
    }

    #[inline]
    fn write(&self, reg: Reg, value: u32) {
        // SAFETY: volatile store into a device register of this bank.
        unsafe { self.block().regs[reg.index()].write(value) }
    }
}
