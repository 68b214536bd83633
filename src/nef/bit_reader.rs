//! MSB-first bit reader for the NEF compressed pixel data.

use crate::error::NefError;

/// Pulls bits most-significant-first from a byte slice.
///
/// Bytes are fetched one at a time and only when the buffered bits run out,
/// so at most a partial byte is ever held in the buffer.
pub struct BitReader<'a> {
    source: &'a [u8],
    position: usize,
    bit_buffer: u32,
    bits_in_buffer: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            bit_buffer: 0,
            bits_in_buffer: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<u32, NefError> {
        self.read_bits(1)
    }

    /// Reads `count` bits (at most 16) as an unsigned value.
    pub fn read_bits(&mut self, count: u8) -> Result<u32, NefError> {
        debug_assert!(count <= 16);
        if count == 0 {
            return Ok(0);
        }
        let count = count as u32;
        while self.bits_in_buffer < count {
            self.fill_byte()?;
        }

        let shift = self.bits_in_buffer - count;
        let value = (self.bit_buffer >> shift) & ((1 << count) - 1);
        self.bits_in_buffer -= count;
        self.bit_buffer &= (1 << self.bits_in_buffer) - 1;
        Ok(value)
    }

    /// Returns the next `count` bits (at most 16) without consuming them.
    pub fn peek_bits(&self, count: u8) -> Result<u32, NefError> {
        let mut lookahead = BitReader {
            source: self.source,
            position: self.position,
            bit_buffer: self.bit_buffer,
            bits_in_buffer: self.bits_in_buffer,
        };
        lookahead.read_bits(count)
    }

    /// Drops the buffered partial byte; the next read starts at a byte boundary.
    pub fn reset(&mut self) {
        self.bit_buffer = 0;
        self.bits_in_buffer = 0;
    }

    /// Number of source bytes fetched so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn bits_consumed(&self) -> usize {
        self.position * 8 - self.bits_in_buffer as usize
    }

    fn fill_byte(&mut self) -> Result<(), NefError> {
        let byte = *self
            .source
            .get(self.position)
            .ok_or(NefError::BitstreamExhausted)?;
        self.position += 1;
        self.bit_buffer = (self.bit_buffer << 8) | byte as u32;
        self.bits_in_buffer += 8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() -> Result<(), NefError> {
        let data = [0b1010_0101, 0b1100_0011];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bit()?, 1);
        assert_eq!(reader.read_bit()?, 0);
        assert_eq!(reader.read_bits(3)?, 0b100);
        assert_eq!(reader.read_bits(7)?, 0b101_1100);
        assert_eq!(reader.read_bits(4)?, 0b0011);
        assert_eq!(reader.bits_consumed(), 16);
        Ok(())
    }

    #[test]
    fn test_read_sixteen_bits_across_partial_byte() -> Result<(), NefError> {
        let data = [0xAB, 0xCD, 0xEF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(4)?, 0xA);
        assert_eq!(reader.read_bits(16)?, 0xBCDE);
        assert_eq!(reader.read_bits(4)?, 0xF);
        Ok(())
    }

    #[test]
    fn test_read_zero_bits_consumes_nothing() -> Result<(), NefError> {
        let data: [u8; 0] = [];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(0)?, 0);
        assert_eq!(reader.read_bit(), Err(NefError::BitstreamExhausted));
        Ok(())
    }

    #[test]
    fn test_reset_discards_partial_byte() -> Result<(), NefError> {
        let data = [0xFF, 0x5A];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3)?, 0b111);
        reader.reset();
        assert_eq!(reader.read_bits(8)?, 0x5A);
        assert_eq!(reader.read_bit(), Err(NefError::BitstreamExhausted));
        Ok(())
    }

    #[test]
    fn test_peek_does_not_consume() -> Result<(), NefError> {
        let data = [0x80, 0x01];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.peek_bits(16)?, 0x8001);
        assert_eq!(reader.read_bit()?, 1);
        assert_eq!(reader.peek_bits(15)?, 0x0001);
        assert_eq!(reader.position(), 1);
        Ok(())
    }

    #[test]
    fn test_exhausted_mid_read() {
        let data = [0x00];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(9), Err(NefError::BitstreamExhausted));
    }
}
