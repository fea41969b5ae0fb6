//! RGB pixel buffer and PNG output

use crate::{RenderError, Result};
use iqkit_core::buffer::try_vec;
use std::path::Path;
use tracing::info;

/// Bytes per pixel (8-bit R, G, B)
pub const BYTES_PER_PIXEL: usize = 3;

/// Flat RGB image, row-major, `(y * width + x) * 3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RenderImage {
    /// Allocate a black image
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 || u32::try_from(width).is_err() || u32::try_from(height).is_err() {
            return Err(RenderError::InvalidDimensions {
                width,
                height,
                msg: "each side must be between 1 and u32::MAX pixels".to_string(),
            });
        }
        let bytes = width
            .checked_mul(height)
            .and_then(|p| p.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| RenderError::InvalidDimensions {
                width,
                height,
                msg: "pixel buffer size overflows".to_string(),
            })?;

        Ok(Self {
            width,
            height,
            data: try_vec(bytes, 0u8, "render image")?,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGB bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y * self.width + x) * BYTES_PER_PIXEL)
        } else {
            None
        }
    }

    /// Write one pixel; coordinates outside the image are ignored
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if let Some(i) = self.index(x, y) {
            self.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgb);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        self.index(x, y)
            .map(|i| [self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    pub fn fill(&mut self, rgb: [u8; 3]) {
        for px in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgb);
        }
    }

    /// Horizontal line from `x0` to `x1` inclusive
    pub fn hline(&mut self, x0: usize, x1: usize, y: usize, rgb: [u8; 3]) {
        for x in x0.min(x1)..=x0.max(x1) {
            self.set_pixel(x, y, rgb);
        }
    }

    /// Vertical line from `y0` to `y1` inclusive
    pub fn vline(&mut self, x: usize, y0: usize, y1: usize, rgb: [u8; 3]) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.set_pixel(x, y, rgb);
        }
    }

    /// Encode as 8-bit RGB PNG
    ///
    /// The image is encoded into a temporary file beside `path` and renamed
    /// into place, so a failure never leaves a partial or clobbered file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let encode_error = |source: ::image::ImageError| RenderError::Encode {
            path: path.to_path_buf(),
            source,
        };
        // Both sides were checked against u32 in `new`
        let (width, height) = (self.width as u32, self.height as u32);

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staged = tempfile::Builder::new()
            .prefix(".iqkit-")
            .suffix(".png")
            .tempfile_in(dir)
            .map_err(|e| encode_error(::image::ImageError::IoError(e)))?
            .into_temp_path();

        ::image::save_buffer_with_format(
            &staged,
            &self.data,
            width,
            height,
            ::image::ColorType::Rgb8,
            ::image::ImageFormat::Png,
        )
        .map_err(encode_error)?;

        staged
            .persist(path)
            .map_err(|e| encode_error(::image::ImageError::IoError(e.error)))?;

        info!("Wrote {}x{} PNG to {}", self.width, self.height, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pixel_addressing() {
        let mut img = RenderImage::new(4, 3).unwrap();
        assert_eq!(img.data().len(), 36);

        img.set_pixel(2, 1, [1, 2, 3]);
        let i = (1 * 4 + 2) * 3;
        assert_eq!(&img.data()[i..i + 3], &[1, 2, 3]);
        assert_eq!(img.pixel(2, 1), Some([1, 2, 3]));
    }

    #[test]
    fn test_out_of_bounds_writes_are_ignored() {
        let mut img = RenderImage::new(4, 3).unwrap();
        let before = img.clone();
        img.set_pixel(4, 0, [255, 255, 255]);
        img.set_pixel(0, 3, [255, 255, 255]);
        img.set_pixel(usize::MAX, usize::MAX, [255, 255, 255]);
        assert_eq!(img, before);
        assert_eq!(img.pixel(4, 0), None);
    }

    #[test]
    fn test_lines_clip_at_edges() {
        let mut img = RenderImage::new(5, 5).unwrap();
        img.hline(3, 10, 2, [9, 9, 9]);
        img.vline(0, 4, 1, [7, 7, 7]);
        assert_eq!(img.pixel(4, 2), Some([9, 9, 9]));
        assert_eq!(img.pixel(2, 2), Some([0, 0, 0]));
        assert_eq!(img.pixel(0, 1), Some([7, 7, 7]));
        assert_eq!(img.pixel(0, 4), Some([7, 7, 7]));
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            RenderImage::new(0, 10),
            Err(RenderError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_save_png_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut img = RenderImage::new(8, 6).unwrap();
        img.fill([10, 20, 30]);
        img.set_pixel(7, 5, [255, 0, 0]);
        img.save_png(&path).unwrap();

        let decoded = ::image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(decoded.get_pixel(7, 5).0, [255, 0, 0]);
    }

    #[test]
    fn test_save_png_failure_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");
        let img = RenderImage::new(2, 2).unwrap();

        let err = img.save_png(&path).unwrap_err();
        assert!(matches!(err, RenderError::Encode { .. }));
        assert!(err.to_string().contains("out.png"));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_png_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        std::fs::write(&path, b"stale").unwrap();

        let mut img = RenderImage::new(3, 2).unwrap();
        img.fill([1, 2, 3]);
        img.save_png(&path).unwrap();

        assert_eq!(::image::open(&path).unwrap().to_rgb8().dimensions(), (3, 2));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_save_leaves_destination_and_no_temporaries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), b"keep").unwrap();

        let img = RenderImage::new(2, 2).unwrap();
        let err = img.save_png(&path).unwrap_err();
        assert!(matches!(err, RenderError::Encode { .. }));
        assert_eq!(std::fs::read(path.join("keep.txt")).unwrap(), b"keep");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
