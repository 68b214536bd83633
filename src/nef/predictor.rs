//! Predictive decoding of NEF compressed rows.
//!
//! Every sample is a Huffman-coded residual added to one of six running
//! predictors: columns 0 and 1 continue the vertical predictor of their row
//! parity, later columns continue the horizontal predictor of their column
//! parity. The decoded value is mapped through the linearization curve.

use log::{debug, warn};

use crate::SplitAlignment;
use crate::constants::SPLIT_MINIMUM;
use crate::error::NefError;
use crate::nef::bit_reader::BitReader;
use crate::nef::huffman::{HuffmanLeaf, HuffmanTable};
use crate::nef::linearization::LinearizationCurve;
use crate::raster::{RasterGeometry, RasterSink};

/// Rebuilds a signed residual from its raw bits.
///
/// Codes whose top bit is clear are negative. When the leaf carries no shift
/// the correction is one smaller, which keeps both halves of the range
/// symmetric around zero.
pub fn residual(raw: u32, leaf: HuffmanLeaf) -> i32 {
    let len = leaf.len as u32;
    let shl = leaf.shl as u32;
    if len == 0 {
        return 0;
    }
    let mut diff = ((((raw as i32) << 1) + 1) << shl) >> 1;
    if diff & (1 << (len - 1)) == 0 {
        diff -= (1 << len) - if shl == 0 { 1 } else { 0 };
    }
    diff
}

/// Running predictors, reset only once per image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredictorState {
    /// Indexed by `[row & 1][col]` for columns 0 and 1.
    pub vertical: [[u16; 2]; 2],
    /// Indexed by `col & 1`.
    pub horizontal: [u16; 2],
}

impl PredictorState {
    pub fn new(vertical: [[u16; 2]; 2]) -> Self {
        Self {
            vertical,
            horizontal: [0; 2],
        }
    }

    /// Adds `diff` to the lane owning `(row, col)` and returns the updated value.
    pub fn apply(&mut self, row: usize, col: usize, diff: i32) -> u16 {
        if col < 2 {
            let lane = &mut self.vertical[row & 1][col];
            *lane = lane.wrapping_add(diff as u16);
            self.horizontal[col] = *lane;
        } else {
            let lane = &mut self.horizontal[col & 1];
            *lane = lane.wrapping_add(diff as u16);
        }
        self.horizontal[col & 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePhase {
    Normal,
    Split,
}

/// Huffman table and saturation window in effect for the current row.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    table: HuffmanTable,
    after_split: Option<HuffmanTable>,
    min: u32,
    max: u32,
    split_row: usize,
    phase: DecodePhase,
    alignment: SplitAlignment,
}

impl DecodeContext {
    /// `max` is the exclusive upper bound of decoded values, normally the curve length.
    /// A non-zero `split_row` requires the table that takes over at that row.
    pub fn new(
        table: HuffmanTable,
        after_split: Option<HuffmanTable>,
        max: usize,
        split_row: usize,
        alignment: SplitAlignment,
    ) -> Result<Self, NefError> {
        if split_row > 0 && after_split.is_none() {
            return Err(NefError::HuffmanTableInvalid);
        }
        Ok(Self {
            table,
            after_split,
            min: 0,
            max: max as u32,
            split_row,
            phase: DecodePhase::Normal,
            alignment,
        })
    }

    pub fn table(&self) -> &HuffmanTable {
        &self.table
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn phase(&self) -> DecodePhase {
        self.phase
    }

    /// Switches to the after-split table when `row` is the split row.
    /// Returns whether the switch happened.
    pub fn begin_row(&mut self, row: usize, reader: &mut BitReader) -> Result<bool, NefError> {
        if self.phase == DecodePhase::Split || self.split_row == 0 || row != self.split_row {
            return Ok(false);
        }
        self.table = self
            .after_split
            .take()
            .ok_or(NefError::HuffmanTableInvalid)?;
        if self.alignment == SplitAlignment::ByteAligned {
            reader.reset();
        }
        self.min = SPLIT_MINIMUM;
        self.max += SPLIT_MINIMUM << 1;
        self.phase = DecodePhase::Split;
        debug!(
            "NEF split at row {}: min: {}, max: {}, bit position: {}",
            row,
            self.min,
            self.max,
            reader.bits_consumed()
        );
        Ok(true)
    }
}

pub struct PredictiveDecoder<'c> {
    context: DecodeContext,
    curve: &'c LinearizationCurve,
}

impl<'c> PredictiveDecoder<'c> {
    pub fn new(context: DecodeContext, curve: &'c LinearizationCurve) -> Self {
        Self { context, curve }
    }

    /// Decodes one sample and returns its predictor lane value, before the curve.
    pub fn decode_pixel(
        &self,
        reader: &mut BitReader,
        predictors: &mut PredictorState,
        row: usize,
        col: usize,
    ) -> Result<u16, NefError> {
        let leaf = self.context.table.decode(reader)?;
        let raw = reader.read_bits(leaf.raw_bit_count())?;
        let value = predictors.apply(row, col, residual(raw, leaf));

        if value.wrapping_add(self.context.min as u16) as u32 >= self.context.max {
            warn!(
                "NEF predictor overflow at row {}, column {}: value {}, window [{}, {})",
                row, col, value, self.context.min, self.context.max
            );
            return Err(NefError::PredictorOverflow);
        }
        Ok(value)
    }

    /// Decodes `height` rows of `raw_width` samples and writes the visible window.
    ///
    /// On error the raster holds the rows written so far.
    pub fn decode<R: RasterSink>(
        &mut self,
        reader: &mut BitReader,
        predictors: &mut PredictorState,
        geometry: &RasterGeometry,
        raster: &mut R,
    ) -> Result<(), NefError> {
        if raster.width() < geometry.width || raster.height() < geometry.height {
            return Err(NefError::DestinationTooSmall);
        }

        for row in 0..geometry.height {
            self.context.begin_row(row, reader)?;
            for col in 0..geometry.raw_width {
                let value = self.decode_pixel(reader, predictors, row, col)?;
                if let Some(visible) = geometry.visible_column(col) {
                    raster.put(row, visible, self.curve.lookup(value));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PACKED_HUFFMAN_SPEC_SIZE;
    use crate::nef::huffman::{HuffmanVariant, PackedHuffmanSpec};
    use crate::raster::RawImage;

    /// One code of length 1 whose leaf carries `payload`.
    fn single_code_spec(payload: u8) -> PackedHuffmanSpec {
        let mut spec = [0u8; PACKED_HUFFMAN_SPEC_SIZE];
        spec[0] = 1;
        spec[16] = payload;
        spec
    }

    #[test]
    fn test_residual_sign_correction_without_shift() {
        let leaf = HuffmanLeaf { len: 8, shl: 0 };
        // Top bit clear: corrected by 2^8 - 1.
        assert_eq!(residual(0x12, leaf), 0x12 - 255);
        assert_eq!(residual(0x00, leaf), -255);
        assert_eq!(residual(0x7f, leaf), -128);
        // Top bit set: unchanged.
        assert_eq!(residual(0x80, leaf), 128);
        assert_eq!(residual(0xff, leaf), 255);
    }

    #[test]
    fn test_residual_sign_correction_with_shift() {
        let leaf = HuffmanLeaf { len: 9, shl: 3 };
        // ((5 << 1) + 1) << 3 >> 1 = 44, top bit clear, corrected by 2^9 only.
        assert_eq!(residual(5, leaf), 44 - 512);
        // ((0x25 << 1) + 1) << 3 >> 1 = 300, top bit set.
        assert_eq!(residual(0x25, leaf), 300);
    }

    #[test]
    fn test_residual_zero_length() {
        assert_eq!(residual(0, HuffmanLeaf::default()), 0);
    }

    #[test]
    fn test_residual_single_bit() {
        let leaf = HuffmanLeaf { len: 1, shl: 0 };
        assert_eq!(residual(0, leaf), -1);
        assert_eq!(residual(1, leaf), 1);
    }

    #[test]
    fn test_predictor_lanes() {
        let mut state = PredictorState::new([[100, 200], [300, 400]]);
        assert_eq!(state.apply(0, 0, 5), 105);
        assert_eq!(state.apply(0, 1, -5), 195);
        assert_eq!(state.apply(0, 2, 1), 106);
        assert_eq!(state.apply(0, 3, 1), 196);
        assert_eq!(state.apply(1, 0, 0), 300);
        assert_eq!(state.apply(1, 2, -1), 299);
        // Vertical lanes keep accumulating across rows of the same parity.
        assert_eq!(state.apply(2, 0, 1), 106);
        assert_eq!(state.vertical, [[106, 195], [300, 400]]);
    }

    #[test]
    fn test_predictor_lanes_wrap() {
        let mut state = PredictorState::new([[0, 0], [0, 0]]);
        assert_eq!(state.apply(0, 0, -1), 0xffff);
        assert_eq!(state.apply(0, 2, 2), 1);
    }

    #[test]
    fn test_split_transition_happens_once() -> Result<(), NefError> {
        let before = HuffmanTable::from_variant(HuffmanVariant::Lossy12)?;
        let after = HuffmanTable::from_variant(HuffmanVariant::Lossy12AfterSplit)?;
        let mut context =
            DecodeContext::new(before, Some(after), 4096, 10, SplitAlignment::ByteAligned)?;
        let data = [0u8; 4];
        let mut reader = BitReader::new(&data);

        let mut transitions = 0;
        for row in 0..300 {
            if row < 10 {
                assert_eq!((context.min(), context.max()), (0, 4096));
                assert_eq!(context.table().slots()[0].map(|s| s.leaf.pack()), Some(5));
            }
            if context.begin_row(row, &mut reader)? {
                transitions += 1;
                assert_eq!(row, 10);
            }
            if row >= 10 {
                assert_eq!(context.phase(), DecodePhase::Split);
                assert_eq!((context.min(), context.max()), (16, 4128));
                assert_eq!(context.table().slots()[0].map(|s| s.leaf.pack()), Some(0x39));
            }
        }
        assert_eq!(transitions, 1);
        Ok(())
    }

    #[test]
    fn test_split_without_table_is_rejected() -> Result<(), NefError> {
        let table = HuffmanTable::from_variant(HuffmanVariant::Lossless12)?;
        assert!(matches!(
            DecodeContext::new(table, None, 4096, 3, SplitAlignment::ByteAligned),
            Err(NefError::HuffmanTableInvalid)
        ));
        Ok(())
    }

    #[test]
    fn test_split_alignment_modes() -> Result<(), NefError> {
        let spec = single_code_spec(0);
        let data = [0x00, 0x00];
        for (alignment, expected) in [
            (SplitAlignment::ByteAligned, 8),
            (SplitAlignment::Continuous, 3),
        ] {
            let table = HuffmanTable::from_packed(&spec)?;
            let mut context = DecodeContext::new(table.clone(), Some(table), 100, 1, alignment)?;
            let mut reader = BitReader::new(&data);
            reader.read_bits(3)?;
            assert!(context.begin_row(1, &mut reader)?);
            assert_eq!(reader.bits_consumed(), expected);
        }
        Ok(())
    }

    #[test]
    fn test_seeded_block_with_zero_residuals() -> Result<(), NefError> {
        let table = HuffmanTable::from_packed(&single_code_spec(0))?;
        let curve = LinearizationCurve::identity(1 << 12);
        let context = DecodeContext::new(table, None, curve.len(), 0, SplitAlignment::ByteAligned)?;
        let mut decoder = PredictiveDecoder::new(context, &curve);

        let seeds = [[11, 22], [33, 44]];
        let mut predictors = PredictorState::new(seeds);
        let data = [0u8; 2];
        let mut reader = BitReader::new(&data);
        let geometry = RasterGeometry {
            height: 4,
            raw_width: 4,
            width: 4,
            left_margin: 0,
        };
        let mut image = RawImage::new(4, 4);
        decoder.decode(&mut reader, &mut predictors, &geometry, &mut image)?;

        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(image.get(row, col), seeds[row & 1][col & 1]);
            }
        }
        Ok(())
    }

    #[test]
    fn test_overflow_is_rejected_before_write() -> Result<(), NefError> {
        // Every code is a residual of +1 (len 1, raw bit 1).
        let table = HuffmanTable::from_packed(&single_code_spec(1))?;
        let curve = LinearizationCurve::identity(8);
        let context = DecodeContext::new(table, None, curve.len(), 0, SplitAlignment::ByteAligned)?;
        let mut decoder = PredictiveDecoder::new(context, &curve);

        let mut predictors = PredictorState::new([[6, 0], [0, 0]]);
        // Code bit 0 then raw bit 1, repeated.
        let data = [0b0101_0101, 0b0101_0101];
        let mut reader = BitReader::new(&data);
        let geometry = RasterGeometry {
            height: 1,
            raw_width: 2,
            width: 2,
            left_margin: 0,
        };
        let mut image = RawImage::new(2, 1);
        image.data.fill(0xaaaa);

        // Column 0 reaches 7 (allowed), column 1 reaches 1.
        decoder.decode(&mut reader, &mut predictors, &geometry, &mut image)?;
        assert_eq!(image.data, vec![7, 1]);

        // Seeded at 7, the first sample reaches 8, outside [0, 8).
        let mut predictors = PredictorState::new([[7, 0], [0, 0]]);
        let mut reader = BitReader::new(&data);
        let mut image = RawImage::new(2, 1);
        image.data.fill(0xaaaa);
        assert_eq!(
            decoder.decode(&mut reader, &mut predictors, &geometry, &mut image),
            Err(NefError::PredictorOverflow)
        );
        assert_eq!(image.get(0, 0), 0xaaaa);
        Ok(())
    }

    #[test]
    fn test_window_outside_columns_are_not_written() -> Result<(), NefError> {
        let table = HuffmanTable::from_packed(&single_code_spec(1))?;
        let curve = LinearizationCurve::from_samples(&(0..64).map(|i| i * 10).collect::<Vec<_>>());
        let context = DecodeContext::new(table, None, curve.len(), 0, SplitAlignment::ByteAligned)?;
        let mut decoder = PredictiveDecoder::new(context, &curve);

        let mut predictors = PredictorState::new([[0, 0], [0, 0]]);
        let data = [0b0101_0101; 2];
        let mut reader = BitReader::new(&data);
        let geometry = RasterGeometry {
            height: 1,
            raw_width: 6,
            width: 2,
            left_margin: 1,
        };
        let mut image = RawImage::new(2, 1);
        decoder.decode(&mut reader, &mut predictors, &geometry, &mut image)?;
        // Lanes: col0 = 1, col1 = 1, col2 = 2, col3 = 2, col4 = 3, col5 = 3.
        assert_eq!(image.data, vec![10, 20]);
        // All six samples were consumed: 12 bits.
        assert_eq!(reader.bits_consumed(), 12);
        Ok(())
    }

    #[test]
    fn test_destination_too_small() -> Result<(), NefError> {
        let table = HuffmanTable::from_packed(&single_code_spec(0))?;
        let curve = LinearizationCurve::identity(16);
        let context = DecodeContext::new(table, None, curve.len(), 0, SplitAlignment::ByteAligned)?;
        let mut decoder = PredictiveDecoder::new(context, &curve);
        let data = [0u8; 1];
        let mut reader = BitReader::new(&data);
        let geometry = RasterGeometry {
            height: 2,
            raw_width: 2,
            width: 2,
            left_margin: 0,
        };
        let mut image = RawImage::new(2, 1);
        assert_eq!(
            decoder.decode(&mut reader, &mut PredictorState::default(), &geometry, &mut image),
            Err(NefError::DestinationTooSmall)
        );
        Ok(())
    }
}
