//! Interrupt plumbing.
//!
//! Each converter module has a conversion complete interrupt and a DMA
//! completion interrupt. The vector handlers of the application call
//! [`on_interrupt`] and [`on_dma_interrupt`], which dispatch to the callbacks
//! registered for that module.

use core::cell::Cell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

use crate::adc::{ModuleIndex, MODULE_COUNT};

/// Interrupt callback, run in interrupt context.
pub type Callback = fn();

/// Enables and prioritises peripheral interrupt lines.
pub trait InterruptController {
    fn enable(&mut self, irq: u16, priority: u8);

    fn disable(&mut self, irq: u16);
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rt")] {
        use cortex_m::peripheral::NVIC;

        #[derive(Debug, Clone, Copy)]
        struct Irq(u16);

        // SAFETY: the numbers come from the board description, which only lists
        // interrupt lines of the running chip.
        unsafe impl cortex_m::interrupt::InterruptNumber for Irq {
            fn number(self) -> u16 {
                self.0
            }
        }

        impl InterruptController for NVIC {
            fn enable(&mut self, irq: u16, priority: u8) {
                // SAFETY: the handlers only touch state guarded by critical sections.
                unsafe {
                    self.set_priority(Irq(irq), priority);
                    NVIC::unmask(Irq(irq));
                }
            }

            fn disable(&mut self, irq: u16) {
                NVIC::mask(Irq(irq));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Conversion,
    Dma,
}

type Slot = CriticalSectionMutex<Cell<Option<Callback>>>;

static CONVERSION: [Slot; MODULE_COUNT] = [Slot::new(Cell::new(None)), Slot::new(Cell::new(None))];
static DMA: [Slot; MODULE_COUNT] = [Slot::new(Cell::new(None)), Slot::new(Cell::new(None))];

fn slot(event: Event, index: ModuleIndex) -> &'static Slot {
    match event {
        Event::Conversion => &CONVERSION[index.to_index()],
        Event::Dma => &DMA[index.to_index()],
    }
}

pub(crate) fn register(event: Event, index: ModuleIndex, callback: Option<Callback>) {
    slot(event, index).lock(|c| c.set(callback));
}

pub(crate) fn registered(event: Event, index: ModuleIndex) -> Option<Callback> {
    slot(event, index).lock(|c| c.get())
}

fn dispatch(event: Event, index: ModuleIndex) {
    match registered(event, index) {
        Some(callback) => callback(),
        None => trace!("unhandled adc{} interrupt", index.to_index()),
    }
}

/// Runs the conversion complete callback of a module.
pub fn on_interrupt(index: ModuleIndex) {
    dispatch(Event::Conversion, index)
}

/// Runs the DMA completion callback of a module.
pub fn on_dma_interrupt(index: ModuleIndex) {
    dispatch(Event::Dma, index)
}

#[cfg(test)]
mod test {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    static HITS: AtomicU32 = AtomicU32::new(0);

    fn hit() {
        HITS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn dma_callbacks_dispatch_per_module() {
        on_dma_interrupt(ModuleIndex::Adc1);
        assert_eq!(HITS.load(Ordering::Relaxed), 0);

        register(Event::Dma, ModuleIndex::Adc1, Some(hit));
        on_dma_interrupt(ModuleIndex::Adc1);
        on_dma_interrupt(ModuleIndex::Adc0);
        assert_eq!(HITS.load(Ordering::Relaxed), 1);

        register(Event::Dma, ModuleIndex::Adc1, None);
        on_dma_interrupt(ModuleIndex::Adc1);
        assert_eq!(HITS.load(Ordering::Relaxed), 1);
    }
}
