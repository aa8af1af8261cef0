//! Frame conversion
//!
//! Turns a decoded raster image into a monochrome opacity bitmap. Only the
//! alpha channel is consulted: a cell is opaque iff its alpha is above zero.

use std::path::Path;

use image::{DynamicImage, GenericImageView, Pixel, Primitive};
use tracing::debug;

use crate::error::DecodeError;

/// Monochrome opacity bitmap derived from one source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    /// Row-major, `height` rows of `width` cells
    opacity: Vec<Vec<bool>>,
}

impl Frame {
    /// Build a frame from an explicit grid.
    ///
    /// Every row must have the same length; the first row's length is taken
    /// as the width. Returns `None` for ragged input.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Option<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        Some(Self {
            width,
            height: rows.len(),
            opacity: rows,
        })
    }

    /// Threshold any image view on its native alpha channel.
    pub fn from_view<I>(img: &I) -> Self
    where
        I: GenericImageView,
    {
        let (w, h) = img.dimensions();
        let transparent = <<I::Pixel as Pixel>::Subpixel as Primitive>::DEFAULT_MIN_VALUE;

        let opacity = (0..h)
            .map(|y| {
                (0..w)
                    .map(|x| img.get_pixel(x, y).to_rgba()[3] > transparent)
                    .collect()
            })
            .collect();

        Self {
            width: w as usize,
            height: h as usize,
            opacity,
        }
    }

    /// Convert a decoded image.
    ///
    /// Images with 16-bit or float channels are read at their native depth so
    /// that faint alpha values are not rounded away to zero.
    pub fn from_image(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLumaA16(buf) => Self::from_view(buf),
            DynamicImage::ImageRgba16(buf) => Self::from_view(buf),
            DynamicImage::ImageRgba32F(buf) => Self::from_view(buf),
            DynamicImage::ImageLuma16(buf) => Self::from_view(buf),
            DynamicImage::ImageRgb16(buf) => Self::from_view(buf),
            DynamicImage::ImageRgb32F(buf) => Self::from_view(buf),
            other => Self::from_view(other),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether (x, y) is opaque. Out-of-bounds positions are transparent.
    pub fn is_opaque(&self, x: usize, y: usize) -> bool {
        self.opacity
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    /// Number of opaque cells
    pub fn opaque_count(&self) -> usize {
        self.opacity
            .iter()
            .map(|row| row.iter().filter(|&&cell| cell).count())
            .sum()
    }
}

/// Decode every path eagerly, in order.
///
/// The first unreadable or undecodable file aborts the batch; no partial list
/// is returned.
pub fn load_images<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<DynamicImage>, DecodeError> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let img = image::open(path).map_err(|source| DecodeError {
                path: path.to_path_buf(),
                source,
            })?;
            debug!("Decoded {} ({}x{})", path.display(), img.width(), img.height());
            Ok(img)
        })
        .collect()
}
