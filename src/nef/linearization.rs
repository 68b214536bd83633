//! Linearization table (Nikon maker note tag 0x96).
//!
//! Layout, all 16-bit values in maker note byte order:
//!
//! | offset | size         | field                                    |
//! |--------|--------------|------------------------------------------|
//! | 0      | 1            | version byte 0                           |
//! | 1      | 1            | version byte 1                           |
//! | 2      | 4 x u16      | vertical predictor seeds `vpred[2][2]`   |
//! | 10     | u16          | curve sample count                       |
//! | 12     | count x u16  | curve samples                            |
//! | 562    | u16          | split row (lossy type 2 only)            |
//!
//! Known version bytes: `0x44 0x10` lossy type 1 (explicit curve), `0x44 0x20`
//! lossy type 2 (sparse curve, split row), `0x46 0x30` lossless.

use log::{debug, trace, warn};
use num_enum::TryFromPrimitive;

use crate::BitDepth;
use crate::byte_stream_reader::{ByteOrder, ByteStreamReader};
use crate::constants::{
    CURVE_CAPACITY, CURVE_INDEX_LIMIT, MAXIMUM_EXPLICIT_CURVE_SIZE, MAXIMUM_VALUE_MASK,
    REVISION_INTERPOLATED, SPLIT_ROW_OFFSET, VERSION_LOSSLESS, VERSION_LOSSY, VERSION_UPDATE,
    VERSION_UPDATE_REVISION,
};
use crate::error::NefError;
use crate::nef::huffman::HuffmanVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum HeaderVersion {
    Lossy = VERSION_LOSSY,
    Lossless = VERSION_LOSSLESS,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    /// Curve samples are stored one per code value.
    LossyType1,
    /// Sparse curve samples are interpolated; the Huffman table changes at the split row.
    LossyType2,
    /// No curve is stored; values map through unchanged.
    Lossless,
}

impl CompressionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::LossyType1 => "lossy type 1",
            Self::LossyType2 => "lossy type 2",
            Self::Lossless => "lossless",
        }
    }
}

/// Lookup table mapping pre-curve values to output samples.
///
/// Backed by a full 16-bit identity-initialised buffer; only the first `len`
/// entries are considered part of the curve. Values are whatever the camera
/// stored and are not assumed to be monotonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearizationCurve {
    values: Vec<u16>,
    len: usize,
}

impl LinearizationCurve {
    pub fn identity(len: usize) -> Self {
        Self {
            values: (0..CURVE_CAPACITY).map(|i| i as u16).collect(),
            len: len.min(CURVE_CAPACITY),
        }
    }

    pub fn from_samples(samples: &[u16]) -> Self {
        let mut curve = Self::identity(samples.len());
        let count = curve.len;
        curve.values[..count].copy_from_slice(&samples[..count]);
        curve
    }

    /// Places `samples` every `max / (count - 1)` entries and fills the gaps by
    /// linear interpolation with truncating integer division.
    pub fn interpolated(samples: &[u16], max: usize) -> Result<Self, NefError> {
        if samples.len() < 2 {
            return Err(NefError::MalformedHeader);
        }
        let step = max / (samples.len() - 1);
        if step == 0 || max + step > CURVE_CAPACITY {
            return Err(NefError::MalformedHeader);
        }

        let mut curve = Self::identity(max);
        for (i, &sample) in samples.iter().enumerate() {
            curve.values[i * step] = sample;
        }
        for i in 0..max {
            let rem = i % step;
            let base = i - rem;
            let low = curve.values[base] as usize;
            let high = curve.values[base + step] as usize;
            curve.values[i] = ((low * (step - rem) + high * rem) / step) as u16;
        }
        Ok(curve)
    }

    /// Shrinks the logical length while the last two entries are equal.
    /// Returns the number of entries removed.
    pub fn trim_flat_tail(&mut self) -> usize {
        let original = self.len;
        while self.len >= 2 && self.values[self.len - 2] == self.values[self.len - 1] {
            self.len -= 1;
        }
        original - self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.values[..self.len]
    }

    pub fn get(&self, index: usize) -> Option<u16> {
        self.as_slice().get(index).copied()
    }

    /// Maps a predictor lane value, read as signed and clamped to 14 bits.
    pub fn lookup(&self, lane: u16) -> u16 {
        let index = (lane as i16 as i32).clamp(0, CURVE_INDEX_LIMIT);
        self.values[index as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearizationHeader {
    pub version: [u8; 2],
    pub kind: CompressionKind,
    /// Seeds of the vertical predictors, indexed by `[row & 1][col]`.
    pub vertical_predictors: [[u16; 2]; 2],
    pub curve_size: u16,
    /// Distance between stored samples of a lossy type 2 curve, zero otherwise.
    pub step: usize,
    /// Row at which the second Huffman table takes over; zero when there is none.
    pub split_row: usize,
    pub curve: LinearizationCurve,
}

impl LinearizationHeader {
    /// Parses the table from `metadata`, which starts at the tag's value offset.
    pub fn read(
        metadata: &[u8],
        bit_depth: BitDepth,
        byte_order: ByteOrder,
    ) -> Result<Self, NefError> {
        let mut reader = ByteStreamReader::new(metadata, byte_order);
        let ver0 = reader.read_u8()?;
        let ver1 = reader.read_u8()?;
        debug!(
            "NEF linearization table: bits: {}, ver0: {:#04x}, ver1: {:#04x}",
            bit_depth.bits(),
            ver0,
            ver1
        );

        // Seen in firmware update files only; the layout past the reserved block is unknown.
        if ver0 == VERSION_UPDATE || ver1 == VERSION_UPDATE_REVISION {
            warn!("NEF firmware update linearization table is not supported");
            return Err(NefError::MalformedHeader);
        }
        let version = HeaderVersion::try_from(ver0).map_err(|_| NefError::MalformedHeader)?;

        let mut seeds = [0u16; 4];
        reader.read_u16_into(&mut seeds)?;
        let vertical_predictors = [[seeds[0], seeds[1]], [seeds[2], seeds[3]]];

        let max = (1usize << bit_depth.bits()) & MAXIMUM_VALUE_MASK;
        let curve_size = reader.read_u16()?;
        let step = if curve_size > 1 {
            max / (curve_size as usize - 1)
        } else {
            0
        };

        let (kind, mut curve, split_row) = match version {
            HeaderVersion::Lossy if ver1 == REVISION_INTERPOLATED && step > 0 => {
                let mut samples = vec![0u16; curve_size as usize];
                reader.read_u16_into(&mut samples)?;
                let curve = LinearizationCurve::interpolated(&samples, max)?;
                reader.seek(SPLIT_ROW_OFFSET)?;
                let split_row = reader.read_u16()? as usize;
                (CompressionKind::LossyType2, curve, split_row)
            }
            HeaderVersion::Lossy => {
                if curve_size < 2 || curve_size as usize > MAXIMUM_EXPLICIT_CURVE_SIZE {
                    warn!("NEF curve sample count {} out of range", curve_size);
                    return Err(NefError::MalformedHeader);
                }
                let mut samples = vec![0u16; curve_size as usize];
                reader.read_u16_into(&mut samples)?;
                (CompressionKind::LossyType1, LinearizationCurve::from_samples(&samples), 0)
            }
            HeaderVersion::Lossless => (CompressionKind::Lossless, LinearizationCurve::identity(max), 0),
        };

        let trimmed = curve.trim_flat_tail();
        trace!("NEF curve trimmed by {} entries to {}", trimmed, curve.len());
        debug!(
            "NEF curve: kind: {}, size: {}, step: {}, split: {}, length: {}",
            kind.name(),
            curve_size,
            if kind == CompressionKind::LossyType2 { step } else { 0 },
            split_row,
            curve.len()
        );

        Ok(Self {
            version: [ver0, ver1],
            kind,
            vertical_predictors,
            curve_size,
            step: if kind == CompressionKind::LossyType2 { step } else { 0 },
            split_row,
            curve,
        })
    }

    pub fn is_lossless(&self) -> bool {
        self.kind == CompressionKind::Lossless
    }

    pub fn huffman_variant(&self, bit_depth: BitDepth) -> HuffmanVariant {
        HuffmanVariant::select(self.is_lossless(), bit_depth)
    }
}
