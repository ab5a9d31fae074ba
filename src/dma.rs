//! Bulk transfer of conversion results.
//!
//! With DMA requests enabled, every completed conversion asks the DMA engine
//! to move the result register into memory. The engine itself lives outside
//! this crate, behind [`BulkTransferSink`]; [`AnalogBufferDma`] ties it to a
//! converter module.

use crate::adc::regs::RegisterAccess;
use crate::adc::{AdcModule, ModuleIndex};
use crate::interrupt::{self, Callback, Event};
use crate::vref::VoltageReference;

/// DMA engine filling a pair of buffers from a module's result register.
pub trait BulkTransferSink {
    /// Prepares transfers from the result register of `module` into `buffers`,
    /// alternating between them.
    fn init(&mut self, module: ModuleIndex, buffers: (&'static mut [u16], &'static mut [u16]));

    fn stop(&mut self);
}

pub struct AnalogBufferDma<'a, R: RegisterAccess, V: VoltageReference, S: BulkTransferSink> {
    adc: &'a AdcModule<R, V>,
    sink: S,
    running: bool,
}

impl<'a, R: RegisterAccess, V: VoltageReference, S: BulkTransferSink> AnalogBufferDma<'a, R, V, S> {
    pub fn new(adc: &'a AdcModule<R, V>, sink: S) -> Self {
        Self {
            adc,
            sink,
            running: false,
        }
    }

    /// Starts moving results into `buffers`. `callback` runs from the DMA
    /// completion interrupt of the module.
    pub fn start(&mut self, buffers: (&'static mut [u16], &'static mut [u16]), callback: Option<Callback>) {
        let index = self.adc.index();
        interrupt::register(Event::Dma, index, callback);
        self.sink.init(index, buffers);
        self.adc.enable_dma();
        self.running = true;
        debug!("adc{} dma started", index.to_index());
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.adc.disable_dma();
        self.sink.stop();
        interrupt::register(Event::Dma, self.adc.index(), None);
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<'a, R: RegisterAccess, V: VoltageReference, S: BulkTransferSink> Drop for AnalogBufferDma<'a, R, V, S> {
    fn drop(&mut self) {
        self.stop();
    }
}
