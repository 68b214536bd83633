//! Nikon NEF compressed raw decoding.
//!
//! Implements the Huffman/predictive scheme Nikon cameras use for the
//! "lossy" and "lossless" compressed NEF strips.
//!
//! Features:
//! - 12-bit and 14-bit samples, lossy (type 1 and type 2) and lossless tables.
//! - Linearization curve reconstruction, including interpolated curves.
//! - Mid-image Huffman table switch ("split") with configurable bit alignment.
//! - Visible window extraction through a left margin and width.

pub mod bit_reader;
pub mod decoder;
pub mod huffman;
pub mod linearization;
pub mod predictor;

pub use decoder::NefDecoder;
pub use huffman::{HuffmanTable, HuffmanVariant};
pub use linearization::{CompressionKind, LinearizationCurve, LinearizationHeader};
