use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NefError {
    #[error("Malformed linearization header")]
    MalformedHeader = 1,
    #[error("Invalid Huffman table")]
    HuffmanTableInvalid = 2,
    #[error("Bitstream exhausted")]
    BitstreamExhausted = 3,
    #[error("Predictor overflow")]
    PredictorOverflow = 4,
    #[error("Invalid Huffman code")]
    InvalidHuffmanCode = 5,

    // Logic errors
    #[error("Invalid parameter bit depth")]
    InvalidParameterBitDepth = 100,
    #[error("Invalid parameter height")]
    InvalidParameterHeight = 101,
    #[error("Invalid parameter width")]
    InvalidParameterWidth = 102,
    #[error("Destination too small")]
    DestinationTooSmall = 103,
}

impl NefError {
    /// Numeric code of the error, stable across releases.
    pub fn code(self) -> i32 {
        self as i32
    }
}
