/// Which byte of a word an 8-bit register aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Low,
    High,
}

pub trait Bits {
    fn get_low(&self) -> u8;
    fn get_high(&self) -> u8;
    fn set_low(&mut self, value: u8);
    fn set_high(&mut self, value: u8);

    fn get_half(&self, half: Half) -> u8 {
        match half {
            Half::Low => self.get_low(),
            Half::High => self.get_high(),
        }
    }

    fn set_half(&mut self, half: Half, value: u8) {
        match half {
            Half::Low => self.set_low(value),
            Half::High => self.set_high(value),
        }
    }
}

impl Bits for u16 {
    fn get_low(&self) -> u8 {
        (self & 0x00FF) as u8
    }
    fn get_high(&self) -> u8 {
        ((self & 0xFF00) >> 8) as u8
    }
    fn set_low(&mut self, value: u8) {
        *self &= 0xFF00;
        *self |= value as u16;
    }
    fn set_high(&mut self, value: u8) {
        *self &= 0x00FF;
        *self |= (value as u16) << 8;
    }
}
