// Version bytes found at the start of the linearization table (maker note tag 0x96).
pub const VERSION_LOSSY: u8 = 0x44;
pub const VERSION_LOSSLESS: u8 = 0x46;
pub const VERSION_UPDATE: u8 = 0x49;
pub const VERSION_UPDATE_REVISION: u8 = 0x58;

// Second version byte of a lossy header whose curve has to be interpolated (lossy type 2).
pub const REVISION_INTERPOLATED: u8 = 0x20;

// Offset of the split row value, relative to the start of the linearization table.
pub const SPLIT_ROW_OFFSET: usize = 562;

// Largest explicit curve sample count accepted for lossy type 1 headers.
pub const MAXIMUM_EXPLICIT_CURVE_SIZE: usize = 0x4001;

// The curve is addressed by 16-bit indices.
pub const CURVE_CAPACITY: usize = 0x10000;

// Pre-curve values are clamped to 14 bits before the lookup.
pub const CURVE_INDEX_LIMIT: i32 = 0x3fff;

// The maximum value of a sample is clamped to 15 bits.
pub const MAXIMUM_VALUE_MASK: usize = 0x7fff;

// Lower saturation bound after the split row; the upper bound widens by twice this value.
pub const SPLIT_MINIMUM: u32 = 16;

pub const HUFFMAN_COUNT_SIZE: usize = 16;
pub const PACKED_HUFFMAN_SPEC_SIZE: usize = 32;
pub const MAXIMUM_CODE_LENGTH: usize = 16;
