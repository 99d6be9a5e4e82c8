use std::fmt;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use ndarray::{Array2, Array3, Array4, ArrayView4, Axis};
use tracing::trace;

use super::PatchClassifier;
use crate::imagery::{ImagePatch, RGB_CHANNELS};
use crate::terrasat_errors::TerrasatError;

/// A trained land-cover model.
///
/// The crate does not ship or train models: callers wrap their inference runtime behind this
/// trait and hand it to [`ModelClassifier::new`].
pub trait InferenceModel {
    /// Input `(height, width)` in pixels; patches are resized to it before inference.
    fn input_size(&self) -> (u32, u32);

    /// Run the model on a batch.
    ///
    /// Arguments
    /// -----------------
    /// * `batch`: `N × H × W × 3` pixels normalized to [0, 1]
    ///
    /// Return
    /// ----------
    /// * `N × C` class probabilities, one row per patch
    fn predict(&self, batch: ArrayView4<f32>) -> Result<Array2<f32>, TerrasatError>;
}

/// Shared, thread-safe handle to an [`InferenceModel`].
pub type ModelHandle = Arc<dyn InferenceModel + Send + Sync>;

/// Classifier backed by a trained model, one batched inference call per image.
#[derive(Clone)]
pub struct ModelClassifier {
    model: ModelHandle,
}

impl fmt::Debug for ModelClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClassifier")
            .field("input_size", &self.model.input_size())
            .finish()
    }
}

/// Resize a patch to the model input size with a triangle (bilinear) filter.
fn resize_patch(patch: &ImagePatch, height: u32, width: u32) -> Result<Array3<u8>, TerrasatError> {
    if patch.height() == height as usize && patch.width() == width as usize {
        return Ok(patch.pixels.clone());
    }
    let resized = imageops::resize(&patch.to_rgb_image()?, width, height, FilterType::Triangle);
    Array3::from_shape_vec(
        (height as usize, width as usize, RGB_CHANNELS),
        resized.into_raw(),
    )
    .map_err(|err| TerrasatError::ModelInference(format!("resized patch has a bad shape: {err}")))
}

impl ModelClassifier {
    pub fn new(model: ModelHandle) -> Self {
        ModelClassifier { model }
    }

    /// Build the normalized `N × H × W × 3` input batch.
    fn batch(&self, patches: &[ImagePatch]) -> Result<Array4<f32>, TerrasatError> {
        let (height, width) = self.model.input_size();
        if height == 0 || width == 0 {
            return Err(TerrasatError::ModelInference(format!(
                "model input size must be non-zero, got {height}x{width}"
            )));
        }

        let mut batch = Array4::<f32>::zeros((
            patches.len(),
            height as usize,
            width as usize,
            RGB_CHANNELS,
        ));
        for (mut slot, patch) in batch.axis_iter_mut(Axis(0)).zip(patches) {
            let pixels = resize_patch(patch, height, width)?;
            slot.zip_mut_with(&pixels, |dst, &src| *dst = src as f32 / 255.0);
        }
        Ok(batch)
    }

    /// Run the model and check the shape and values of its output.
    fn probabilities(
        &self,
        patches: &[ImagePatch],
        n_classes: usize,
    ) -> Result<Array2<f32>, TerrasatError> {
        let batch = self.batch(patches)?;
        trace!(shape = ?batch.dim(), "running model inference");

        let probabilities = self.model.predict(batch.view())?;
        if probabilities.dim() != (patches.len(), n_classes) {
            return Err(TerrasatError::ModelInference(format!(
                "expected a {}x{n_classes} output, got {:?}",
                patches.len(),
                probabilities.dim()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(TerrasatError::ModelInference(
                "model output contains non-finite values".into(),
            ));
        }
        Ok(probabilities)
    }

    /// Classify the patches and report the winning probability as a percentage.
    ///
    /// Return
    /// ----------
    /// * one `(class index, confidence in [0, 100])` pair per patch, in patch order
    pub fn classify_with_confidence(
        &self,
        patches: &[ImagePatch],
        n_classes: usize,
    ) -> Result<Vec<(usize, f64)>, TerrasatError> {
        if patches.is_empty() {
            return Ok(Vec::new());
        }
        let probabilities = self.probabilities(patches, n_classes)?;

        Ok(probabilities
            .axis_iter(Axis(0))
            .map(|row| {
                let (index, max) = row
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (i, &p)| {
                        if p > best.1 {
                            (i, p)
                        } else {
                            best
                        }
                    });
                (index, max as f64 * 100.0)
            })
            .collect())
    }
}

impl PatchClassifier for ModelClassifier {
    fn classify(&self, patches: &[ImagePatch], n_classes: usize) -> Result<Vec<usize>, TerrasatError> {
        Ok(self
            .classify_with_confidence(patches, n_classes)?
            .into_iter()
            .map(|(index, _)| index)
            .collect())
    }
}

#[cfg(test)]
mod model_test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    /// Scores each class by the distance of the mean red level to `class / (C - 1)`.
    struct RedLevelModel {
        n_classes: usize,
        size: (u32, u32),
    }

    impl InferenceModel for RedLevelModel {
        fn input_size(&self) -> (u32, u32) {
            self.size
        }

        fn predict(&self, batch: ArrayView4<f32>) -> Result<Array2<f32>, TerrasatError> {
            assert_eq!(batch.dim().1, self.size.0 as usize);
            assert_eq!(batch.dim().2, self.size.1 as usize);
            let n = batch.dim().0;
            let mut out = Array2::<f32>::zeros((n, self.n_classes));
            for (i, image) in batch.axis_iter(Axis(0)).enumerate() {
                let red = image.index_axis(Axis(2), 0).mean().unwrap_or(0.0);
                let scores: Vec<f32> = (0..self.n_classes)
                    .map(|c| 1.0 - (red - c as f32 / (self.n_classes - 1) as f32).abs())
                    .collect();
                let total: f32 = scores.iter().sum();
                for (c, s) in scores.iter().enumerate() {
                    out[[i, c]] = s / total;
                }
            }
            Ok(out)
        }
    }

    struct WrongShapeModel;

    impl InferenceModel for WrongShapeModel {
        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }

        fn predict(&self, batch: ArrayView4<f32>) -> Result<Array2<f32>, TerrasatError> {
            Ok(Array2::zeros((batch.dim().0, 2)))
        }
    }

    fn patch(red: u8, edge: usize) -> ImagePatch {
        ImagePatch {
            row: 0,
            col: 0,
            pixels: Array3::from_shape_fn((edge, edge, 3), |(_, _, k)| if k == 0 { red } else { 0 }),
        }
    }

    #[test]
    fn test_argmax_after_resize() {
        let model: ModelHandle = Arc::new(RedLevelModel {
            n_classes: 3,
            size: (16, 16),
        });
        let classifier = ModelClassifier::new(model);
        let patches = [patch(0, 64), patch(255, 64), patch(128, 32), patch(0, 16)];

        let labels = classifier.classify(&patches, 3).unwrap();
        assert_eq!(labels, vec![0, 2, 1, 0]);

        let scored = classifier.classify_with_confidence(&patches[..1], 3).unwrap();
        assert_relative_eq!(scored[0].1, 100.0 / 1.5, epsilon = 1e-3);
    }

    #[test]
    fn test_wrong_output_shape() {
        let classifier = ModelClassifier::new(Arc::new(WrongShapeModel));
        let err = classifier.classify(&[patch(10, 8)], 6).unwrap_err();
        assert!(matches!(err, TerrasatError::ModelInference(_)));
    }

    #[test]
    fn test_no_patches_skips_inference() {
        let classifier = ModelClassifier::new(Arc::new(WrongShapeModel));
        assert_eq!(classifier.classify(&[], 6).unwrap(), Vec::<usize>::new());
    }
}
