//! Huffman tables of the NEF compressed raw format.
//!
//! A packed table is 16 code-length counts (lengths 1..=16) followed by the
//! symbols in code order. Each symbol is itself the decoded payload: its low
//! nibble is the residual bit length and its high nibble a left shift applied
//! to the raw residual bits.

use num_enum::TryFromPrimitive;

use crate::BitDepth;
use crate::constants::{HUFFMAN_COUNT_SIZE, MAXIMUM_CODE_LENGTH, PACKED_HUFFMAN_SPEC_SIZE};
use crate::error::NefError;
use crate::nef::bit_reader::BitReader;

pub type PackedHuffmanSpec = [u8; PACKED_HUFFMAN_SPEC_SIZE];

/// The six tables used by Nikon cameras, indexed by [`HuffmanVariant`].
pub const NIKON_TREES: [PackedHuffmanSpec; 6] = [
    // 12-bit lossy
    [
        0, 1, 5, 1, 1, 1, 1, 1, 1, 2, 0, 0, 0, 0, 0, 0, //
        5, 4, 3, 6, 2, 7, 1, 0, 8, 9, 11, 10, 12, 0, 0, 0,
    ],
    // 12-bit lossy after split
    [
        0, 1, 5, 1, 1, 1, 1, 1, 1, 2, 0, 0, 0, 0, 0, 0, //
        0x39, 0x5a, 0x38, 0x27, 0x16, 5, 4, 3, 2, 1, 0, 11, 12, 12, 0, 0,
    ],
    // 12-bit lossless
    [
        0, 1, 4, 2, 3, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
        5, 4, 6, 3, 7, 2, 8, 1, 9, 0, 10, 11, 12, 0, 0, 0,
    ],
    // 14-bit lossy
    [
        0, 1, 4, 3, 1, 1, 1, 1, 1, 2, 0, 0, 0, 0, 0, 0, //
        5, 6, 4, 7, 8, 3, 9, 2, 1, 0, 10, 11, 12, 13, 14, 0,
    ],
    // 14-bit lossy after split
    [
        0, 1, 5, 1, 1, 1, 1, 1, 1, 1, 2, 0, 0, 0, 0, 0, //
        8, 0x5c, 0x4b, 0x3a, 0x29, 7, 6, 5, 4, 3, 2, 1, 0, 13, 14, 0,
    ],
    // 14-bit lossless
    [
        0, 1, 4, 2, 2, 3, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, //
        7, 6, 8, 5, 9, 4, 10, 3, 11, 12, 2, 0, 1, 13, 14, 0,
    ],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum HuffmanVariant {
    Lossy12 = 0,
    Lossy12AfterSplit = 1,
    Lossless12 = 2,
    Lossy14 = 3,
    Lossy14AfterSplit = 4,
    Lossless14 = 5,
}

impl HuffmanVariant {
    pub const ALL: [Self; 6] = [
        Self::Lossy12,
        Self::Lossy12AfterSplit,
        Self::Lossless12,
        Self::Lossy14,
        Self::Lossy14AfterSplit,
        Self::Lossless14,
    ];

    /// Table used from the first row of an image.
    pub fn select(lossless: bool, bit_depth: BitDepth) -> Self {
        match (lossless, bit_depth) {
            (false, BitDepth::Twelve) => Self::Lossy12,
            (true, BitDepth::Twelve) => Self::Lossless12,
            (false, BitDepth::Fourteen) => Self::Lossy14,
            (true, BitDepth::Fourteen) => Self::Lossless14,
        }
    }

    /// Table that replaces this one at the split row. Only lossy tables have one.
    pub fn after_split(self) -> Option<Self> {
        match self {
            Self::Lossy12 => Some(Self::Lossy12AfterSplit),
            Self::Lossy14 => Some(Self::Lossy14AfterSplit),
            _ => None,
        }
    }

    pub fn packed_spec(self) -> &'static PackedHuffmanSpec {
        &NIKON_TREES[self as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Lossy12 => "12-bit lossy",
            Self::Lossy12AfterSplit => "12-bit lossy after split",
            Self::Lossless12 => "12-bit lossless",
            Self::Lossy14 => "14-bit lossy",
            Self::Lossy14AfterSplit => "14-bit lossy after split",
            Self::Lossless14 => "14-bit lossless",
        }
    }
}

/// Decoded payload of a Huffman code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HuffmanLeaf {
    /// Bit length of the residual.
    pub len: u8,
    /// Left shift applied to the raw residual bits.
    pub shl: u8,
}

impl HuffmanLeaf {
    pub fn unpack(packed: u8) -> Self {
        Self {
            len: packed & 0x0f,
            shl: packed >> 4,
        }
    }

    pub fn pack(self) -> u8 {
        (self.shl << 4) | self.len
    }

    /// Number of raw bits following the code in the bitstream.
    pub fn raw_bit_count(self) -> u8 {
        self.len - self.shl
    }
}

/// A code assigned to a slot of the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanSlot {
    pub length: u8,
    pub leaf: HuffmanLeaf,
}

/// Canonical Huffman decoding table.
///
/// Holds `2^max_length` slots; a code of length `l` owns `2^(max_length - l)`
/// consecutive slots starting at `code << (max_length - l)`. Slots past the
/// last assigned code stay empty when the table is incomplete.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    max_length: u8,
    code_count: usize,
    slots: Vec<Option<HuffmanSlot>>,
}

impl HuffmanTable {
    pub fn from_variant(variant: HuffmanVariant) -> Result<Self, NefError> {
        Self::from_packed(variant.packed_spec())
    }

    pub fn from_packed(spec: &PackedHuffmanSpec) -> Result<Self, NefError> {
        let (counts, symbols) = spec.split_at(HUFFMAN_COUNT_SIZE);

        let max_length = (1..=MAXIMUM_CODE_LENGTH)
            .rev()
            .find(|&length| counts[length - 1] != 0)
            .ok_or(NefError::HuffmanTableInvalid)?;

        let code_count: usize = counts.iter().map(|&count| count as usize).sum();
        if code_count > symbols.len() {
            return Err(NefError::HuffmanTableInvalid);
        }

        let mut slots = vec![None; 1 << max_length];
        let mut next_slot = 0usize;
        let mut symbol_index = 0usize;

        for length in 1..=max_length {
            let span = 1usize << (max_length - length);
            for _ in 0..counts[length - 1] {
                let leaf = HuffmanLeaf::unpack(symbols[symbol_index]);
                if leaf.shl > leaf.len {
                    return Err(NefError::HuffmanTableInvalid);
                }
                if next_slot + span > slots.len() {
                    return Err(NefError::HuffmanTableInvalid);
                }
                let slot = HuffmanSlot {
                    length: length as u8,
                    leaf,
                };
                slots[next_slot..next_slot + span].fill(Some(slot));
                next_slot += span;
                symbol_index += 1;
            }
        }

        Ok(Self {
            max_length: max_length as u8,
            code_count,
            slots,
        })
    }

    pub fn max_code_length(&self) -> u8 {
        self.max_length
    }

    pub fn code_count(&self) -> usize {
        self.code_count
    }

    pub fn slots(&self) -> &[Option<HuffmanSlot>] {
        &self.slots
    }

    /// Number of slots covered by a code. Equals `2^max_length` for a complete table.
    pub fn assigned_slot_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Decodes the next leaf, consuming the code one bit at a time.
    pub fn decode(&self, reader: &mut BitReader) -> Result<HuffmanLeaf, NefError> {
        let mut code = 0usize;
        for length in 1..=self.max_length {
            code = (code << 1) | reader.read_bit()? as usize;
            match self.slots[code << (self.max_length - length)] {
                Some(slot) if slot.length == length => return Ok(slot.leaf),
                Some(_) => continue,
                // Assigned slots form a prefix of the table.
                None => break,
            }
        }
        Err(NefError::InvalidHuffmanCode)
    }
}
