//! # Image tiling
//!
//! Cut an RGB raster into fixed-size, non-overlapping patches.
//!
//! Images are handled as dense `H × W × 3` [`ndarray`] arrays of `u8`, row-major, channel last;
//! that is also the memory layout of [`image::RgbImage`], so [`rgb_to_array`] is a plain copy.
//!
//! Patch origins advance by the patch height down the rows and by the patch width across the
//! columns. A patch is only emitted when it fits entirely inside the image
//! (`origin + size ≤ extent`): the right and bottom remainders are dropped, never padded. The
//! output is in row-major order (top to bottom, then left to right).
use image::{DynamicImage, RgbImage};
use ndarray::{s, Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::constants::DEFAULT_PATCH_EDGE;
use crate::terrasat_errors::TerrasatError;

/// Number of colour channels expected in every raster
pub const RGB_CHANNELS: usize = 3;

/// Pixel dimensions of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSize {
    pub height: usize,
    pub width: usize,
}

impl PatchSize {
    /// Build a patch size, rejecting null dimensions.
    pub fn new(height: usize, width: usize) -> Result<Self, TerrasatError> {
        let size = PatchSize { height, width };
        size.validate()?;
        Ok(size)
    }

    pub fn square(edge: usize) -> Result<Self, TerrasatError> {
        Self::new(edge, edge)
    }

    pub(crate) fn validate(&self) -> Result<(), TerrasatError> {
        if self.height == 0 || self.width == 0 {
            return Err(TerrasatError::InvalidParameter(format!(
                "patch size must be non-zero, got {}x{}",
                self.height, self.width
            )));
        }
        Ok(())
    }
}

impl Default for PatchSize {
    fn default() -> Self {
        PatchSize {
            height: DEFAULT_PATCH_EDGE,
            width: DEFAULT_PATCH_EDGE,
        }
    }
}

/// A patch cut out of a larger image, with its own copy of the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePatch {
    /// Row of the top-left pixel in the source image
    pub row: usize,
    /// Column of the top-left pixel in the source image
    pub col: usize,
    /// `height × width × 3` pixels
    pub pixels: Array3<u8>,
}

impl ImagePatch {
    pub fn origin(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    /// Copy the patch into an [`RgbImage`], e.g. to resize it.
    pub fn to_rgb_image(&self) -> Result<RgbImage, TerrasatError> {
        let (height, width, _) = self.pixels.dim();
        RgbImage::from_raw(
            width as u32,
            height as u32,
            self.pixels.iter().copied().collect(),
        )
        .ok_or_else(|| {
            TerrasatError::InvalidParameter(format!(
                "patch at ({}, {}) is not a {height}x{width} RGB buffer",
                self.row, self.col
            ))
        })
    }
}

/// Split an image into full patches.
///
/// Arguments
/// -----------------
/// * `image`: `H × W × 3` pixel grid
/// * `patch_size`: patch dimensions
///
/// Return
/// ----------
/// * the patches in row-major order, and their `(row, col)` origins in the same order, or
/// * `InvalidParameter` if the patch size is null or the image does not have 3 channels,
/// * `EmptyImage` if not a single full patch fits in the image.
pub fn tile(
    image: ArrayView3<u8>,
    patch_size: PatchSize,
) -> Result<(Vec<ImagePatch>, Vec<(usize, usize)>), TerrasatError> {
    patch_size.validate()?;

    let (height, width, channels) = image.dim();
    if channels != RGB_CHANNELS {
        return Err(TerrasatError::InvalidParameter(format!(
            "expected an RGB image with {RGB_CHANNELS} channels, got {channels}"
        )));
    }

    let PatchSize {
        height: ph,
        width: pw,
    } = patch_size;
    let n_rows = height / ph;
    let n_cols = width / pw;
    if n_rows == 0 || n_cols == 0 {
        return Err(TerrasatError::EmptyImage {
            height,
            width,
            patch_height: ph,
            patch_width: pw,
        });
    }

    let mut patches = Vec::with_capacity(n_rows * n_cols);
    let mut origins = Vec::with_capacity(n_rows * n_cols);
    for row in (0..n_rows).map(|r| r * ph) {
        for col in (0..n_cols).map(|c| c * pw) {
            patches.push(ImagePatch {
                row,
                col,
                pixels: image.slice(s![row..row + ph, col..col + pw, ..]).to_owned(),
            });
            origins.push((row, col));
        }
    }

    trace!(
        height,
        width,
        patches = patches.len(),
        "tiled image into {ph}x{pw} patches"
    );
    Ok((patches, origins))
}

/// Copy an [`RgbImage`] into an `H × W × 3` array.
pub fn rgb_to_array(image: &RgbImage) -> Result<Array3<u8>, TerrasatError> {
    let shape = (image.height() as usize, image.width() as usize, RGB_CHANNELS);
    Array3::from_shape_vec(shape, image.as_raw().clone())
        .map_err(|err| TerrasatError::InvalidParameter(format!("invalid RGB buffer: {err}")))
}

/// Convert any decoded image to RGB8 and copy it into an `H × W × 3` array.
///
/// Alpha is dropped and grayscale is replicated over the three channels.
pub fn dynamic_to_array(image: &DynamicImage) -> Result<Array3<u8>, TerrasatError> {
    rgb_to_array(&image.to_rgb8())
}
