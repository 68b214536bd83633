//! NEF compressed raw decoder.

use log::debug;

use crate::error::NefError;
use crate::nef::bit_reader::BitReader;
use crate::nef::huffman::HuffmanTable;
use crate::nef::linearization::LinearizationHeader;
use crate::nef::predictor::{DecodeContext, PredictiveDecoder, PredictorState};
use crate::raster::{RasterSink, RawImage};
use crate::NefParameters;

/// Decodes the compressed raw strip of a NEF file.
///
/// `source` is the whole file (or any buffer both offsets point into); the
/// linearization table and the strip are located by the caller, typically from
/// maker note tag 0x96 and the raw IFD's strip offset.
pub struct NefDecoder<'a> {
    source: &'a [u8],
    parameters: NefParameters,
    header: Option<LinearizationHeader>,
}

impl<'a> NefDecoder<'a> {
    pub fn new(source: &'a [u8], parameters: NefParameters) -> Result<Self, NefError> {
        parameters.validate()?;
        Ok(Self {
            source,
            parameters,
            header: None,
        })
    }

    pub fn parameters(&self) -> &NefParameters {
        &self.parameters
    }

    pub fn header(&self) -> Option<&LinearizationHeader> {
        self.header.as_ref()
    }

    pub fn read_header(&mut self, meta_offset: usize) -> Result<&LinearizationHeader, NefError> {
        let metadata = self
            .source
            .get(meta_offset..)
            .ok_or(NefError::MalformedHeader)?;
        debug!(
            "NEF metadata at offset {} ({} bytes available)",
            meta_offset,
            metadata.len()
        );
        let header = LinearizationHeader::read(
            metadata,
            self.parameters.bit_depth,
            self.parameters.byte_order,
        )?;
        Ok(self.header.insert(header))
    }

    pub fn decode(&mut self, meta_offset: usize, data_offset: usize) -> Result<RawImage, NefError> {
        let mut image = RawImage::new(self.parameters.width, self.parameters.height);
        self.decode_into(meta_offset, data_offset, &mut image)?;
        Ok(image)
    }

    /// Decodes into a caller-provided raster, which must cover the visible window.
    pub fn decode_into<R: RasterSink>(
        &mut self,
        meta_offset: usize,
        data_offset: usize,
        raster: &mut R,
    ) -> Result<(), NefError> {
        let geometry = self.parameters.geometry();
        if raster.width() < geometry.width || raster.height() < geometry.height {
            return Err(NefError::DestinationTooSmall);
        }

        let source = self.source;
        let bit_depth = self.parameters.bit_depth;
        let alignment = self.parameters.split_alignment;
        let header = self.read_header(meta_offset)?;

        let variant = header.huffman_variant(bit_depth);
        let table = HuffmanTable::from_variant(variant)?;
        let after_split = match (header.split_row, variant.after_split()) {
            (0, _) => None,
            (_, Some(next)) => Some(HuffmanTable::from_variant(next)?),
            (_, None) => return Err(NefError::HuffmanTableInvalid),
        };
        debug!(
            "NEF decode: table: {}, rows: {}, raw width: {}, window: {}+{}",
            variant.name(),
            geometry.height,
            geometry.raw_width,
            geometry.left_margin,
            geometry.width
        );

        let context = DecodeContext::new(
            table,
            after_split,
            header.curve.len(),
            header.split_row,
            alignment,
        )?;
        let mut predictors = PredictorState::new(header.vertical_predictors);

        let data = source
            .get(data_offset..)
            .ok_or(NefError::BitstreamExhausted)?;
        let mut reader = BitReader::new(data);

        let mut decoder = PredictiveDecoder::new(context, &header.curve);
        decoder.decode(&mut reader, &mut predictors, &geometry, raster)?;
        debug!("NEF decode consumed {} of {} bytes", reader.position(), data.len());
        Ok(())
    }
}
