pub mod byte_stream_reader;
pub mod constants;
pub mod error;
pub mod nef;
pub mod raster;

#[cfg(feature = "ffi")]
pub mod ffi;
pub mod wasm;

use num_enum::TryFromPrimitive;

pub use byte_stream_reader::ByteOrder;
pub use error::NefError;
pub use nef::NefDecoder;
pub use raster::{RasterGeometry, RasterSink, RasterView, RawImage};

/// Sample precision of the compressed strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum BitDepth {
    Twelve = 12,
    Fourteen = 14,
}

impl BitDepth {
    pub fn from_bits(bits: u8) -> Result<Self, NefError> {
        Self::try_from(bits).map_err(|_| NefError::InvalidParameterBitDepth)
    }

    pub fn bits(self) -> u32 {
        self as u32
    }
}

/// Bit position of the stream when the Huffman table switches mid-image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitAlignment {
    /// Discard buffered bits; the first split row starts on a byte boundary.
    #[default]
    ByteAligned,
    /// Keep reading from the current bit.
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NefParameters {
    pub bit_depth: BitDepth,
    pub height: usize,
    /// Coded samples per row.
    pub raw_width: usize,
    /// Samples written per row, starting at `left_margin`.
    pub width: usize,
    pub left_margin: usize,
    pub byte_order: ByteOrder,
    pub split_alignment: SplitAlignment,
}

impl NefParameters {
    /// Parameters writing every coded column, with big-endian metadata.
    pub fn new(bit_depth: BitDepth, height: usize, raw_width: usize) -> Result<Self, NefError> {
        let parameters = Self {
            bit_depth,
            height,
            raw_width,
            width: raw_width,
            left_margin: 0,
            byte_order: ByteOrder::default(),
            split_alignment: SplitAlignment::default(),
        };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn with_visible_window(mut self, left_margin: usize, width: usize) -> Self {
        self.left_margin = left_margin;
        self.width = width;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_split_alignment(mut self, split_alignment: SplitAlignment) -> Self {
        self.split_alignment = split_alignment;
        self
    }

    pub fn geometry(&self) -> RasterGeometry {
        RasterGeometry {
            height: self.height,
            raw_width: self.raw_width,
            width: self.width,
            left_margin: self.left_margin,
        }
    }

    pub fn validate(&self) -> Result<(), NefError> {
        if self.height == 0 {
            return Err(NefError::InvalidParameterHeight);
        }
        if self.raw_width == 0 || self.width == 0 {
            return Err(NefError::InvalidParameterWidth);
        }
        Ok(())
    }
}

/// Decodes a compressed NEF strip into a `width * height` image.
pub fn decode_nef(
    source: &[u8],
    meta_offset: usize,
    data_offset: usize,
    parameters: NefParameters,
) -> Result<RawImage, NefError> {
    NefDecoder::new(source, parameters)?.decode(meta_offset, data_offset)
}
