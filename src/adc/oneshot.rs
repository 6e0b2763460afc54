use super::{Adc, RegularTrigger, MAX_CHANNEL};
use embedded_hal::adc::{Channel, OneShot};
use opencm3_core::{AdcId, Dependencies};
use void::Void;

/// Analog input channel `N` of any converter, for use with
/// [`OneShot::read`]. The pin must be configured as analog input.
#[derive(Debug, Default)]
pub struct AdcChannel<const N: u8>;

impl<const N: u8> AdcChannel<N> {
    const VALID: () = assert!(N <= MAX_CHANNEL, "ADC channel out of range");

    /// Channel `N`. Fails to compile for channels above 17.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID;
        Self
    }
}

impl<Id: AdcId, const N: u8> Channel<Id> for AdcChannel<N> {
    type ID = u8;

    fn channel() -> u8 {
        N
    }
}

/// Single regular conversion started by software. The first call programs
/// the sequence and starts the conversion, later calls return
/// `WouldBlock` until the result is ready. The converter must be powered.
impl<Id, D, const N: u8> OneShot<Id, u16, AdcChannel<N>> for Adc<Id, D>
where
    Id: AdcId,
    D: Dependencies<Id>,
{
    type Error = Void;

    fn read(&mut self, _pin: &mut AdcChannel<N>) -> nb::Result<u16, Void> {
        if self.pending == Some(N) {
            if !self.eoc() {
                return Err(nb::Error::WouldBlock);
            }
            self.pending = None;
            // Only the lower half word holds this converter's result.
            return Ok(self.read_regular() as u16);
        }

        let regs = self.regs();
        regs.sqr[0].write(|w| *w = 0);
        regs.sqr[1].write(|w| *w = 0);
        regs.sqr[2].write(|w| *w = u32::from(N));
        regs.cr2.modify(|_, w| {
            w.set_extsel(RegularTrigger::Software as u8);
            w.set_exttrig(true);
            w.set_swstart(true);
        });
        self.pending = Some(N);
        Err(nb::Error::WouldBlock)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{fake_peripheral, FixedClock};
    use fugit::HertzU32;

    #[test]
    fn conversion_completes_on_a_later_call() {
        fake_peripheral!(Regs, 20);
        unsafe impl AdcId for Regs {}
        let mut adc = Adc::<Regs, _>::new(FixedClock(HertzU32::MHz(12)));
        let mut pin = AdcChannel::<5>::new();

        assert!(matches!(adc.read(&mut pin), Err(nb::Error::WouldBlock)));
        assert_eq!(Regs::block().word(0x34), 5);
        assert_eq!(Regs::block().word(0x2c), 0);
        assert_eq!(Regs::block().word(0x08), 7 << 17 | 1 << 20 | 1 << 22);

        assert!(matches!(adc.read(&mut pin), Err(nb::Error::WouldBlock)));
        Regs::block().set_word(0x00, 1 << 1);
        Regs::block().set_word(0x4c, 0x0000_0765);
        assert_eq!(adc.read(&mut pin).ok(), Some(0x765));
        assert_eq!(<AdcChannel<5> as Channel<Regs>>::channel(), 5);
    }
}
