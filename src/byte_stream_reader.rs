use crate::error::NefError;

/// Byte order of the 16-bit values stored in the maker note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// Cursor over the linearization table bytes.
///
/// Running past the end of the source is reported as a malformed header: the
/// table is a fixed-layout block and a short read means its size is wrong.
pub struct ByteStreamReader<'a> {
    source: &'a [u8],
    position: usize,
    byte_order: ByteOrder,
}

impl<'a> ByteStreamReader<'a> {
    pub fn new(source: &'a [u8], byte_order: ByteOrder) -> Self {
        Self {
            source,
            position: 0,
            byte_order,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn read_u8(&mut self) -> Result<u8, NefError> {
        if self.position >= self.source.len() {
            return Err(NefError::MalformedHeader);
        }
        let val = self.source[self.position];
        self.position += 1;
        Ok(val)
    }

    pub fn read_u16(&mut self) -> Result<u16, NefError> {
        let b1 = self.read_u8()? as u16;
        let b2 = self.read_u8()? as u16;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => (b1 << 8) | b2,
            ByteOrder::LittleEndian => (b2 << 8) | b1,
        })
    }

    pub fn read_u16_into(&mut self, destination: &mut [u16]) -> Result<(), NefError> {
        for value in destination.iter_mut() {
            *value = self.read_u16()?;
        }
        Ok(())
    }

    /// Moves to an absolute position; seeking exactly to the end is allowed.
    pub fn seek(&mut self, position: usize) -> Result<(), NefError> {
        if position > self.source.len() {
            return Err(NefError::MalformedHeader);
        }
        self.position = position;
        Ok(())
    }
}
