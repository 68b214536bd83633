//! WebAssembly bindings for nef-decoder-rs.
//!
//! This module provides JavaScript-compatible functions via wasm-bindgen
//! for use in browsers and Node.js.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use crate::{BitDepth, ByteOrder, NefParameters, SplitAlignment, nef::NefDecoder};

/// Linearization header summary returned from WASM API.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct HeaderInfo {
    pub version0: u8,
    pub version1: u8,
    pub lossless: bool,
    pub curve_size: u32,
    pub curve_length: u32,
    pub split_row: u32,
}

#[cfg(target_arch = "wasm32")]
fn parameters(
    bits_per_sample: u8,
    height: u32,
    raw_width: u32,
    little_endian: bool,
) -> Result<NefParameters, JsValue> {
    let bit_depth = BitDepth::from_bits(bits_per_sample)
        .map_err(|e| JsValue::from_str(&format!("Parameter error: {:?}", e)))?;
    let byte_order = if little_endian {
        ByteOrder::LittleEndian
    } else {
        ByteOrder::BigEndian
    };
    NefParameters::new(bit_depth, height as usize, raw_width as usize)
        .map(|p| p.with_byte_order(byte_order))
        .map_err(|e| JsValue::from_str(&format!("Parameter error: {:?}", e)))
}

/// Decode a NEF compressed strip to 16-bit samples.
///
/// # Arguments
/// * `data` - The NEF file bytes
/// * `meta_offset` - Offset of the linearization table (maker note tag 0x96)
/// * `data_offset` - Offset of the compressed strip
///
/// # Returns
/// `width * height` samples as Uint16Array
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn decode_nef(
    data: &[u8],
    meta_offset: u32,
    data_offset: u32,
    bits_per_sample: u8,
    height: u32,
    raw_width: u32,
    left_margin: u32,
    width: u32,
    little_endian: bool,
    continuous_split: bool,
) -> Result<Vec<u16>, JsValue> {
    let split_alignment = if continuous_split {
        SplitAlignment::Continuous
    } else {
        SplitAlignment::ByteAligned
    };
    let parameters = parameters(bits_per_sample, height, raw_width, little_endian)?
        .with_visible_window(left_margin as usize, width as usize)
        .with_split_alignment(split_alignment);

    let mut decoder = NefDecoder::new(data, parameters)
        .map_err(|e| JsValue::from_str(&format!("Parameter error: {:?}", e)))?;
    let image = decoder
        .decode(meta_offset as usize, data_offset as usize)
        .map_err(|e| JsValue::from_str(&format!("Decode error: {:?}", e)))?;
    Ok(image.data)
}

/// Parse the linearization header without decoding pixels.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn get_header_info(
    data: &[u8],
    meta_offset: u32,
    bits_per_sample: u8,
    little_endian: bool,
) -> Result<HeaderInfo, JsValue> {
    let parameters = parameters(bits_per_sample, 1, 1, little_endian)?;
    let mut decoder = NefDecoder::new(data, parameters)
        .map_err(|e| JsValue::from_str(&format!("{:?}", e)))?;
    let header = decoder
        .read_header(meta_offset as usize)
        .map_err(|e| JsValue::from_str(&format!("{:?}", e)))?;
    Ok(HeaderInfo {
        version0: header.version[0],
        version1: header.version[1],
        lossless: header.is_lossless(),
        curve_size: header.curve_size as u32,
        curve_length: header.curve.len() as u32,
        split_row: header.split_row as u32,
    })
}
