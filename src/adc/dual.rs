use core::cell::Cell;

use embassy_futures::yield_now;
use embassy_hal_internal::drop::OnDrop;

use super::module::{AdcModule, Armed, Input};
use super::pins::PIN_INVALID;
use super::regs::{IrqGuard, RegisterAccess};
use super::{into_raw, AdcError, Error, ModuleIndex};
use crate::vref::{NoVref, VoltageReference};

/// Module choice of a single-module operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcSelect {
    /// Whichever module can measure the pin. When both can, the one with
    /// fewer pending measurements, ties going to module 1.
    #[default]
    Any,
    Adc0,
    Adc1,
}

/// Results of a synchronized measurement, one per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncResult {
    pub result_adc0: Result<i32, Error>,
    pub result_adc1: Result<i32, Error>,
}

impl SyncResult {
    /// Both results in the raw integer convention.
    pub fn raw(&self) -> (i32, i32) {
        (into_raw(self.result_adc0), into_raw(self.result_adc1))
    }

    pub fn is_ok(&self) -> bool {
        self.result_adc0.is_ok() && self.result_adc1.is_ok()
    }

    /// The error that caused the failure, preferring the root cause over `Synch`.
    fn cause(&self) -> Error {
        match (self.result_adc0, self.result_adc1) {
            (Err(e), _) if e != Error::Synch => e,
            (_, Err(e)) => e,
            _ => Error::Synch,
        }
    }
}

/// Both converter modules of a board.
///
/// Single-module operations are routed to one module, synchronized ones
/// start a conversion on each module back to back.
pub struct Adc<'a, R: RegisterAccess, V: VoltageReference = NoVref> {
    adc0: &'a AdcModule<R, V>,
    adc1: Option<&'a AdcModule<R, V>>,
}

impl<'a, R: RegisterAccess, V: VoltageReference> Adc<'a, R, V> {
    /// Groups the modules of a board. `adc1` is `None` on single converter boards.
    pub fn new(adc0: &'a AdcModule<R, V>, adc1: Option<&'a AdcModule<R, V>>) -> Result<Self, Error> {
        if adc0.index() != ModuleIndex::Adc0 || adc1.map_or(false, |a| a.index() != ModuleIndex::Adc1) {
            return Err(Error::WrongAdc);
        }
        Ok(Self { adc0, adc1 })
    }

    pub fn adc0(&self) -> &'a AdcModule<R, V> {
        self.adc0
    }

    pub fn adc1(&self) -> Option<&'a AdcModule<R, V>> {
        self.adc1
    }

    /// The module with the given index. A missing module is recorded as
    /// `WRONG_ADC` on module 0.
    pub fn module(&self, index: ModuleIndex) -> Result<&'a AdcModule<R, V>, Error> {
        match index {
            ModuleIndex::Adc0 => Ok(self.adc0),
            ModuleIndex::Adc1 => self.adc1.ok_or_else(|| {
                self.adc0.record(AdcError::WRONG_ADC);
                warn!("{} has a single adc", self.adc0.board().name);
                Error::WrongAdc
            }),
        }
    }

    fn route(&self, input: Input, select: AdcSelect) -> Result<&'a AdcModule<R, V>, Error> {
        match select {
            AdcSelect::Adc0 => Ok(self.adc0),
            AdcSelect::Adc1 => self.module(ModuleIndex::Adc1),
            AdcSelect::Any => {
                let valid = |adc: &AdcModule<R, V>| match input {
                    Input::Single(pin) => adc.check_pin(pin),
                    Input::Differential(pin_p, pin_n) => adc.check_differential_pins(pin_p, pin_n),
                };
                let adc1 = self.adc1.filter(|adc| valid(*adc));
                match (valid(self.adc0), adc1) {
                    (true, Some(adc1)) => {
                        if self.adc0.pending_measurements() >= adc1.pending_measurements() {
                            Ok(adc1)
                        } else {
                            Ok(self.adc0)
                        }
                    }
                    (true, None) => Ok(self.adc0),
                    (false, Some(adc1)) => Ok(adc1),
                    (false, None) => {
                        self.adc0.record(AdcError::WRONG_PIN);
                        warn!("no adc can measure {:?}", input);
                        Err(Error::WrongPin)
                    }
                }
            }
        }
    }

    /// Module a single-ended measurement of `pin` would run on.
    pub fn select_module(&self, pin: u8, select: AdcSelect) -> Result<ModuleIndex, Error> {
        self.route(Input::Single(pin), select).map(|adc| adc.index())
    }

    pub async fn analog_read(&self, pin: u8, select: AdcSelect) -> Result<i32, Error> {
        self.route(Input::Single(pin), select)?.analog_read(pin).await
    }

    pub async fn analog_read_differential(&self, pin_p: u8, pin_n: u8, select: AdcSelect) -> Result<i32, Error> {
        self.route(Input::Differential(pin_p, pin_n), select)?
            .analog_read_differential(pin_p, pin_n)
            .await
    }

    /// Starts a conversion of `pin` and returns the module running it.
    pub async fn start_single_read(&self, pin: u8, select: AdcSelect) -> Result<ModuleIndex, Error> {
        let adc = self.route(Input::Single(pin), select)?;
        adc.start_single_read(pin).await?;
        Ok(adc.index())
    }

    pub async fn start_single_differential(
        &self,
        pin_p: u8,
        pin_n: u8,
        select: AdcSelect,
    ) -> Result<ModuleIndex, Error> {
        let adc = self.route(Input::Differential(pin_p, pin_n), select)?;
        adc.start_single_differential(pin_p, pin_n).await?;
        Ok(adc.index())
    }

    pub fn read_single(&self, index: ModuleIndex) -> Result<i32, Error> {
        Ok(self.module(index)?.read_single())
    }

    pub async fn start_continuous(&self, pin: u8, select: AdcSelect) -> Result<ModuleIndex, Error> {
        let adc = self.route(Input::Single(pin), select)?;
        adc.start_continuous(pin).await?;
        Ok(adc.index())
    }

    pub async fn start_continuous_differential(
        &self,
        pin_p: u8,
        pin_n: u8,
        select: AdcSelect,
    ) -> Result<ModuleIndex, Error> {
        let adc = self.route(Input::Differential(pin_p, pin_n), select)?;
        adc.start_continuous_differential(pin_p, pin_n).await?;
        Ok(adc.index())
    }

    pub fn analog_read_continuous(&self, index: ModuleIndex) -> Result<i32, Error> {
        Ok(self.module(index)?.analog_read_continuous())
    }

    pub fn stop_continuous(&self, index: ModuleIndex) -> Result<(), Error> {
        self.module(index)?.stop_continuous();
        Ok(())
    }

    // Synchronized measurements

    fn missing_adc1(&self) -> SyncResult {
        self.adc0.record(AdcError::SYNCH);
        SyncResult {
            result_adc0: Err(Error::Synch),
            result_adc1: Err(Error::WrongAdc),
        }
    }

    /// A valid half of a synchronized measurement cannot run without the other one.
    fn abandon(adc: &AdcModule<R, V>, armed: Result<Armed, Error>) -> Result<i32, Error> {
        match armed {
            Ok(_) => {
                adc.record(AdcError::SYNCH);
                Err(Error::Synch)
            }
            Err(e) => Err(e),
        }
    }

    fn prepare(&self, input0: Input, input1: Input) -> Result<(&'a AdcModule<R, V>, Armed, Armed), SyncResult> {
        let adc1 = self.module(ModuleIndex::Adc1).map_err(|_| self.missing_adc1())?;
        match (self.adc0.validate(input0), adc1.validate(input1)) {
            (Ok(armed0), Ok(armed1)) => Ok((adc1, armed0, armed1)),
            (armed0, armed1) => Err(SyncResult {
                result_adc0: Self::abandon(self.adc0, armed0),
                result_adc1: Self::abandon(adc1, armed1),
            }),
        }
    }

    async fn synchronized(&self, input0: Input, input1: Input) -> SyncResult {
        let (adc1, armed0, armed1) = match self.prepare(input0, input1) {
            Ok(prepared) => prepared,
            Err(result) => return result,
        };
        let adc0 = self.adc0;

        adc0.acquire();
        adc1.acquire();
        let saved0 = Cell::new(None);
        let saved1 = Cell::new(None);
        let _done = OnDrop::new(|| {
            if let Some(snapshot) = saved0.take() {
                adc0.restore(snapshot);
            }
            if let Some(snapshot) = saved1.take() {
                adc1.restore(snapshot);
            }
            adc0.release();
            adc1.release();
        });

        adc0.wait_for_calibration().await;
        adc1.wait_for_calibration().await;
        saved0.set(adc0.save_if_busy());
        saved1.set(adc1.save_if_busy());
        adc0.arm(&armed0, false);
        adc1.arm(&armed1, false);

        while adc0.is_converting() || adc1.is_converting() {
            yield_now().await;
        }

        let _cs = IrqGuard::new();
        let result = SyncResult {
            result_adc0: adc0.take_result(armed0.differential),
            result_adc1: adc1.take_result(armed1.differential),
        };
        if let Some(snapshot) = saved0.take() {
            adc0.restore(snapshot);
        }
        if let Some(snapshot) = saved1.take() {
            adc1.restore(snapshot);
        }
        result
    }

    /// Measures `pin0` on module 0 and `pin1` on module 1 at the same time.
    pub async fn analog_synchronized_read(&self, pin0: u8, pin1: u8) -> SyncResult {
        self.synchronized(Input::Single(pin0), Input::Single(pin1)).await
    }

    pub async fn analog_synchronized_read_differential(
        &self,
        pin0_p: u8,
        pin0_n: u8,
        pin1_p: u8,
        pin1_n: u8,
    ) -> SyncResult {
        self.synchronized(
            Input::Differential(pin0_p, pin0_n),
            Input::Differential(pin1_p, pin1_n),
        )
        .await
    }

    async fn start_synchronized(&self, input0: Input, input1: Input) -> Result<(), Error> {
        let (adc1, armed0, armed1) = self.prepare(input0, input1).map_err(|r| r.cause())?;
        let adc0 = self.adc0;

        adc0.wait_for_calibration().await;
        adc1.wait_for_calibration().await;

        let _cs = IrqGuard::new();
        adc0.stash();
        adc1.stash();
        adc0.acquire();
        adc1.acquire();
        adc0.arm(&armed0, false);
        adc1.arm(&armed1, false);
        Ok(())
    }

    /// Starts a conversion on each module; collect both with
    /// [`read_synchronized_single`](Self::read_synchronized_single).
    pub async fn start_synchronized_single_read(&self, pin0: u8, pin1: u8) -> Result<(), Error> {
        self.start_synchronized(Input::Single(pin0), Input::Single(pin1)).await
    }

    pub async fn start_synchronized_single_differential(
        &self,
        pin0_p: u8,
        pin0_n: u8,
        pin1_p: u8,
        pin1_n: u8,
    ) -> Result<(), Error> {
        self.start_synchronized(
            Input::Differential(pin0_p, pin0_n),
            Input::Differential(pin1_p, pin1_n),
        )
        .await
    }

    pub fn read_synchronized_single(&self) -> SyncResult {
        let Some(adc1) = self.adc1 else {
            return self.missing_adc1();
        };
        let _cs = IrqGuard::new();
        SyncResult {
            result_adc0: Ok(self.adc0.read_single()),
            result_adc1: Ok(adc1.read_single()),
        }
    }

    /// Restarts both continuous conversions together, so they stay in step.
    fn resynchronize(&self, adc1: &AdcModule<R, V>) {
        let sc1a0 = self.adc0.channel_select();
        let sc1a1 = adc1.channel_select();
        self.adc0.write_channel(PIN_INVALID as u32);
        adc1.write_channel(PIN_INVALID as u32);

        let _cs = IrqGuard::new();
        self.adc0.write_channel(sc1a0);
        adc1.write_channel(sc1a1);
    }

    async fn start_synchronized_continuous_inputs(&self, input0: Input, input1: Input) -> Result<(), Error> {
        let (adc1, armed0, armed1) = self.prepare(input0, input1).map_err(|r| r.cause())?;
        self.adc0.start(armed0, true).await;
        adc1.start(armed1, true).await;
        self.resynchronize(adc1);
        Ok(())
    }

    /// Converts `pin0` on module 0 and `pin1` on module 1 continuously, in step.
    pub async fn start_synchronized_continuous(&self, pin0: u8, pin1: u8) -> Result<(), Error> {
        self.start_synchronized_continuous_inputs(Input::Single(pin0), Input::Single(pin1))
            .await
    }

    pub async fn start_synchronized_continuous_differential(
        &self,
        pin0_p: u8,
        pin0_n: u8,
        pin1_p: u8,
        pin1_n: u8,
    ) -> Result<(), Error> {
        self.start_synchronized_continuous_inputs(
            Input::Differential(pin0_p, pin0_n),
            Input::Differential(pin1_p, pin1_n),
        )
        .await
    }

    pub fn read_synchronized_continuous(&self) -> SyncResult {
        let Some(adc1) = self.adc1 else {
            return self.missing_adc1();
        };
        let _cs = IrqGuard::new();
        SyncResult {
            result_adc0: Ok(self.adc0.analog_read_continuous()),
            result_adc1: Ok(adc1.analog_read_continuous()),
        }
    }

    pub fn stop_synchronized_continuous(&self) {
        self.adc0.stop_continuous();
        if let Some(adc1) = self.adc1 {
            adc1.stop_continuous();
        }
    }
}
