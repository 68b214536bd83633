//! Destination rasters for decoded samples.

use crate::error::NefError;

/// Row/column extents of a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterGeometry {
    pub height: usize,
    /// Samples coded per row, including padding columns.
    pub raw_width: usize,
    /// Samples written per row.
    pub width: usize,
    /// Coded columns skipped before the first written one.
    pub left_margin: usize,
}

impl RasterGeometry {
    /// Maps a coded column to its raster column, if it lies in the visible window.
    pub fn visible_column(&self, col: usize) -> Option<usize> {
        col.checked_sub(self.left_margin)
            .filter(|&visible| visible < self.width)
    }
}

/// Indexed write access to the visible region of an image.
pub trait RasterSink {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn put(&mut self, row: usize, col: usize, value: u16);
}

/// Owned single-component 16-bit image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u16>,
}

impl RawImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> u16 {
        self.data[row * self.width + col]
    }

    pub fn row(&self, row: usize) -> &[u16] {
        &self.data[row * self.width..(row + 1) * self.width]
    }
}

impl RasterSink for RawImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn put(&mut self, row: usize, col: usize, value: u16) {
        self.data[row * self.width + col] = value;
    }
}

/// Caller-owned buffer with an explicit row stride, in samples.
pub struct RasterView<'a> {
    data: &'a mut [u16],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> RasterView<'a> {
    pub fn new(
        data: &'a mut [u16],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self, NefError> {
        if stride < width {
            return Err(NefError::InvalidParameterWidth);
        }
        let required = match height {
            0 => 0,
            _ => (height - 1)
                .checked_mul(stride)
                .and_then(|offset| offset.checked_add(width))
                .ok_or(NefError::DestinationTooSmall)?,
        };
        if data.len() < required {
            return Err(NefError::DestinationTooSmall);
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }
}

impl RasterSink for RasterView<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn put(&mut self, row: usize, col: usize, value: u16) {
        self.data[row * self.stride + col] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_column() {
        let geometry = RasterGeometry {
            height: 1,
            raw_width: 10,
            width: 4,
            left_margin: 2,
        };
        assert_eq!(geometry.visible_column(0), None);
        assert_eq!(geometry.visible_column(1), None);
        assert_eq!(geometry.visible_column(2), Some(0));
        assert_eq!(geometry.visible_column(5), Some(3));
        assert_eq!(geometry.visible_column(6), None);
    }

    #[test]
    fn test_raster_view_stride() -> Result<(), NefError> {
        let mut buffer = vec![0u16; 7];
        {
            let mut view = RasterView::new(&mut buffer, 2, 2, 5)?;
            view.put(0, 1, 11);
            view.put(1, 0, 20);
            view.put(1, 1, 21);
        }
        assert_eq!(buffer, vec![0, 11, 0, 0, 0, 20, 21]);
        Ok(())
    }

    #[test]
    fn test_raster_view_too_small() {
        let mut buffer = vec![0u16; 6];
        assert!(matches!(
            RasterView::new(&mut buffer, 2, 2, 5),
            Err(NefError::DestinationTooSmall)
        ));
        assert!(matches!(
            RasterView::new(&mut buffer, 3, 1, 2),
            Err(NefError::InvalidParameterWidth)
        ));
    }

    #[test]
    fn test_raster_view_stride_overflow() {
        let mut buffer = vec![0u16; 6];
        assert!(matches!(
            RasterView::new(&mut buffer, 2, 3, usize::MAX),
            Err(NefError::DestinationTooSmall)
        ));
        assert!(matches!(
            RasterView::new(&mut buffer, usize::MAX, 2, usize::MAX),
            Err(NefError::DestinationTooSmall)
        ));
        // A single row never multiplies by the stride.
        assert!(RasterView::new(&mut buffer, 2, 1, usize::MAX).is_ok());
    }

    #[test]
    fn test_raw_image_rows() {
        let mut image = RawImage::new(3, 2);
        image.put(1, 2, 7);
        assert_eq!(image.row(1), &[0, 0, 7]);
        assert_eq!(image.get(1, 2), 7);
    }
}
