//! C Foreign Function Interface for nef-decoder-rs.
//!
//! This module provides C-compatible functions with opaque handles
//! for use from C/C++ projects. Functions return `0` on success, a
//! [`NefError`] code on decode failure, or a negative [`NefFfiStatus`].

use std::os::raw::{c_int, c_uchar};
use std::ptr;

use crate::error::NefError;
use crate::nef::NefDecoder;
use crate::raster::RasterView;
use crate::{BitDepth, ByteOrder, NefParameters, SplitAlignment};

/// Opaque decoder handle.
#[repr(C)]
pub struct NefDecoderHandle {
    _private: [u8; 0],
}

/// Linearization header summary.
#[repr(C)]
pub struct NefHeaderInfo {
    pub version0: u8,
    pub version1: u8,
    pub lossless: u8,
    pub vertical_predictors: [u16; 4],
    pub curve_size: u32,
    pub curve_length: u32,
    pub split_row: u32,
}

/// Status codes not covered by [`NefError`].
#[repr(C)]
pub enum NefFfiStatus {
    Ok = 0,
    NullPointer = -1,
}

/// Internal decoder state.
struct DecoderState {
    data: Vec<u8>,
    parameters: NefParameters,
}

fn status(result: Result<(), NefError>) -> c_int {
    match result {
        Ok(()) => NefFfiStatus::Ok as c_int,
        Err(e) => e.code(),
    }
}

/// Create a new decoder over a copy of `data`.
///
/// Returns null when `data` is null or the parameters are invalid.
///
/// # Safety
/// `data` must be a valid pointer to `len` bytes.
#[unsafe(no_mangle)]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub unsafe extern "C" fn nef_decoder_new(
    data: *const c_uchar,
    len: usize,
    bits_per_sample: u32,
    height: u32,
    raw_width: u32,
) -> *mut NefDecoderHandle {
    if data.is_null() || len == 0 {
        return ptr::null_mut();
    }
    let Ok(bits) = u8::try_from(bits_per_sample) else {
        return ptr::null_mut();
    };
    let parameters = match BitDepth::from_bits(bits)
        .and_then(|bit_depth| NefParameters::new(bit_depth, height as usize, raw_width as usize))
    {
        Ok(parameters) => parameters,
        Err(_) => return ptr::null_mut(),
    };

    let slice = unsafe { std::slice::from_raw_parts(data, len) };
    let state = Box::new(DecoderState {
        data: slice.to_vec(),
        parameters,
    });

    Box::into_raw(state) as *mut NefDecoderHandle
}

/// Free a decoder handle.
///
/// # Safety
/// `decoder` must be a valid handle from `nef_decoder_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nef_decoder_free(decoder: *mut NefDecoderHandle) {
    if !decoder.is_null() {
        let _ = unsafe { Box::from_raw(decoder as *mut DecoderState) };
    }
}

/// Restrict the written columns to `width` samples starting at `left_margin`.
///
/// # Safety
/// `decoder` must be a valid handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nef_decoder_set_window(
    decoder: *mut NefDecoderHandle,
    left_margin: u32,
    width: u32,
) -> c_int {
    if decoder.is_null() {
        return NefFfiStatus::NullPointer as c_int;
    }
    let state = unsafe { &mut *(decoder as *mut DecoderState) };
    let parameters = state
        .parameters
        .with_visible_window(left_margin as usize, width as usize);
    if let Err(e) = parameters.validate() {
        return e.code();
    }
    state.parameters = parameters;
    NefFfiStatus::Ok as c_int
}

/// Select little-endian metadata and/or continuous bit position at the split row.
///
/// # Safety
/// `decoder` must be a valid handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nef_decoder_set_options(
    decoder: *mut NefDecoderHandle,
    little_endian: c_int,
    continuous_split: c_int,
) -> c_int {
    if decoder.is_null() {
        return NefFfiStatus::NullPointer as c_int;
    }
    let state = unsafe { &mut *(decoder as *mut DecoderState) };
    let byte_order = if little_endian != 0 {
        ByteOrder::LittleEndian
    } else {
        ByteOrder::BigEndian
    };
    let split_alignment = if continuous_split != 0 {
        SplitAlignment::Continuous
    } else {
        SplitAlignment::ByteAligned
    };
    state.parameters = state
        .parameters
        .with_byte_order(byte_order)
        .with_split_alignment(split_alignment);
    NefFfiStatus::Ok as c_int
}

/// Parse the linearization header at `meta_offset`.
///
/// # Safety
/// `decoder` must be valid. `info` must point to a valid NefHeaderInfo.
#[unsafe(no_mangle)]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub unsafe extern "C" fn nef_decoder_read_header(
    decoder: *mut NefDecoderHandle,
    meta_offset: usize,
    info: *mut NefHeaderInfo,
) -> c_int {
    if decoder.is_null() || info.is_null() {
        return NefFfiStatus::NullPointer as c_int;
    }
    let state = unsafe { &*(decoder as *mut DecoderState) };

    let result = NefDecoder::new(&state.data, state.parameters).and_then(|mut decoder| {
        let header = decoder.read_header(meta_offset)?;
        let seeds = header.vertical_predictors;
        unsafe {
            (*info).version0 = header.version[0];
            (*info).version1 = header.version[1];
            (*info).lossless = header.is_lossless() as u8;
            (*info).vertical_predictors = [seeds[0][0], seeds[0][1], seeds[1][0], seeds[1][1]];
            (*info).curve_size = header.curve_size as u32;
            (*info).curve_length = header.curve.len() as u32;
            (*info).split_row = header.split_row as u32;
        }
        Ok(())
    });
    status(result)
}

/// Decode the strip at `data_offset` into `output`.
///
/// `output` holds `output_len` samples; rows are `stride` samples apart and
/// each receives the visible window.
///
/// # Safety
/// All pointers must be valid. `output` must have at least `output_len` samples.
#[unsafe(no_mangle)]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub unsafe extern "C" fn nef_decoder_decode(
    decoder: *mut NefDecoderHandle,
    meta_offset: usize,
    data_offset: usize,
    output: *mut u16,
    output_len: usize,
    stride: usize,
) -> c_int {
    if decoder.is_null() || output.is_null() {
        return NefFfiStatus::NullPointer as c_int;
    }
    let state = unsafe { &*(decoder as *mut DecoderState) };
    let output_slice = unsafe { std::slice::from_raw_parts_mut(output, output_len) };

    let result = RasterView::new(
        output_slice,
        state.parameters.width,
        state.parameters.height,
        stride,
    )
    .and_then(|mut view| {
        NefDecoder::new(&state.data, state.parameters)?.decode_into(
            meta_offset,
            data_offset,
            &mut view,
        )
    });
    status(result)
}
