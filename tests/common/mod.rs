#![allow(dead_code)]

use std::sync::Arc;

use camino::Utf8Path;
use ndarray::{Array2, Array3, ArrayView4, Axis};
use terrasat::classification::{InferenceModel, ModelHandle};
use terrasat::terrasat_errors::TerrasatError;
use terrasat::tle::{parse_tle_catalog, OrbitalElementSet};

pub const CATALOG_PATH: &str = "tests/data/catalog.tle";
pub const CONFIG_PATH: &str = "tests/data/terrasat.toml";

/// Decode the test catalog, returning the element sets and the number of rejected entries.
pub fn load_catalog() -> (Vec<OrbitalElementSet>, usize) {
    let text = std::fs::read_to_string(Utf8Path::new(CATALOG_PATH)).unwrap();
    parse_tle_catalog(&text)
}

pub fn satellite<'a>(catalog: &'a [OrbitalElementSet], name: &str) -> &'a OrbitalElementSet {
    catalog
        .iter()
        .find(|set| set.name == name)
        .unwrap_or_else(|| panic!("{name} missing from {CATALOG_PATH}"))
}

/// `height × width` image split vertically: the left `bright_cols` columns are white, the rest
/// black.
pub fn two_tone_image(height: usize, width: usize, bright_cols: usize) -> Array3<u8> {
    Array3::from_shape_fn((height, width, 3), |(_, c, _)| if c < bright_cols { 255 } else { 0 })
}

/// Image whose pixel (r, c) holds (r, c, r + c), truncated to u8.
pub fn gradient_image(height: usize, width: usize) -> Array3<u8> {
    Array3::from_shape_fn((height, width, 3), |(r, c, k)| match k {
        0 => r as u8,
        1 => c as u8,
        _ => (r + c) as u8,
    })
}

/// Model sending bright patches to `bright` and dark patches to `dark`, with 90% confidence.
pub struct BrightnessModel {
    pub n_classes: usize,
    pub bright: usize,
    pub dark: usize,
}

impl InferenceModel for BrightnessModel {
    fn input_size(&self) -> (u32, u32) {
        (16, 16)
    }

    fn predict(&self, batch: ArrayView4<f32>) -> Result<Array2<f32>, TerrasatError> {
        let rest = 0.1 / (self.n_classes - 1) as f32;
        let mut out = Array2::from_elem((batch.dim().0, self.n_classes), rest);
        for (i, patch) in batch.axis_iter(Axis(0)).enumerate() {
            let class = if patch.mean().unwrap_or(0.0) > 0.5 {
                self.bright
            } else {
                self.dark
            };
            out[[i, class]] = 0.9;
        }
        Ok(out)
    }
}

pub fn brightness_model(n_classes: usize, bright: usize, dark: usize) -> ModelHandle {
    Arc::new(BrightnessModel {
        n_classes,
        bright,
        dark,
    })
}
