//! # Land-cover classification
//!
//! Tile an RGB image, assign a land-cover class to every patch, and aggregate the labels into a
//! percentage distribution.
//!
//! ## Classifiers
//!
//! Two implementations of [`PatchClassifier`] are available, wrapped in the [`Classifier`] enum
//! and selected when the classifier is built:
//!
//! * [`ModelClassifier`] – backed by a trained model behind the [`InferenceModel`] trait. Patches
//!   are resized to the model input with a triangle filter, normalized to [0, 1] and sent as a
//!   single `N × H × W × 3` batch; the arg-max of each output row is the label.
//! * [`SimulatedClassifier`] – a seeded stochastic stand-in, see [`SimulationParams`].
//!
//! Both return one class index per patch, in patch order.
//!
//! ## Pipeline
//!
//! [`classify_image`] chains [`tile`](crate::imagery::tile), [`PatchClassifier::classify`] and
//! [`aggregate`](crate::aggregate::aggregate); [`classify_images`] runs it over independent images
//! in parallel.
//!
//! ```rust
//! use ndarray::Array3;
//! use terrasat::classification::{classify_image, Classifier, LandCoverClasses, SimulationParams};
//! use terrasat::imagery::PatchSize;
//!
//! let image = Array3::<u8>::zeros((256, 256, 3));
//! let classifier = Classifier::simulated(SimulationParams::default(), 42);
//! let distribution = classify_image(
//!     image.view(),
//!     PatchSize::default(),
//!     &classifier,
//!     &LandCoverClasses::default(),
//! ).unwrap();
//!
//! let total: f64 = distribution.iter().map(|share| share.percentage).sum();
//! assert!((total - 100.0).abs() < 0.06);
//! ```
use ndarray::ArrayView3;
use rayon::prelude::*;
use tracing::instrument;

use crate::aggregate::{aggregate, ClassDistribution};
use crate::imagery::{tile, ImagePatch, PatchSize};
use crate::terrasat_errors::TerrasatError;

mod classes;
mod model;
mod simulated;

pub use classes::LandCoverClasses;
pub use model::{InferenceModel, ModelClassifier, ModelHandle};
pub use simulated::{DominantBoost, SimulatedClassifier, SimulationParams, SimulationParamsBuilder};

/// Assign a class index in `0..n_classes` to each patch.
pub trait PatchClassifier {
    /// Classify all patches in one call.
    ///
    /// Return
    /// ----------
    /// * one class index per patch, in the order of `patches`
    fn classify(&self, patches: &[ImagePatch], n_classes: usize) -> Result<Vec<usize>, TerrasatError>;
}

/// Patch classifier selected at construction.
#[derive(Debug, Clone)]
pub enum Classifier {
    ModelBacked(ModelClassifier),
    Simulated(SimulatedClassifier),
}

impl Classifier {
    pub fn model_backed(model: ModelHandle) -> Self {
        Classifier::ModelBacked(ModelClassifier::new(model))
    }

    pub fn simulated(params: SimulationParams, seed: u64) -> Self {
        Classifier::Simulated(SimulatedClassifier::new(params, seed))
    }
}

impl PatchClassifier for Classifier {
    fn classify(&self, patches: &[ImagePatch], n_classes: usize) -> Result<Vec<usize>, TerrasatError> {
        match self {
            Classifier::ModelBacked(c) => c.classify(patches, n_classes),
            Classifier::Simulated(c) => c.classify(patches, n_classes),
        }
    }
}

/// Tile an image, classify the patches and aggregate the labels.
///
/// Arguments
/// -----------------
/// * `image`: `H × W × 3` pixels
/// * `patch_size`: tiling patch size
/// * `classifier`: any [`PatchClassifier`]
/// * `classes`: ordered class labels; the classifier emits indices into this list
///
/// Return
/// ----------
/// * the class distribution, or the first tiling, classification or aggregation error
#[instrument(level = "debug", skip_all, fields(shape = ?image.dim()))]
pub fn classify_image<C: PatchClassifier + ?Sized>(
    image: ArrayView3<u8>,
    patch_size: PatchSize,
    classifier: &C,
    classes: &LandCoverClasses,
) -> Result<ClassDistribution, TerrasatError> {
    let (patches, _) = tile(image, patch_size)?;
    let labels = classifier.classify(&patches, classes.len())?;
    aggregate(&labels, classes.labels())
}

/// Run [`classify_image`] on several independent images in parallel.
///
/// Return
/// ----------
/// * one result per image, in input order; a failing image does not affect the others
#[instrument(level = "debug", skip_all, fields(images = images.len()))]
pub fn classify_images<C: PatchClassifier + Sync + ?Sized>(
    images: &[ArrayView3<u8>],
    patch_size: PatchSize,
    classifier: &C,
    classes: &LandCoverClasses,
) -> Vec<Result<ClassDistribution, TerrasatError>> {
    images
        .par_iter()
        .map(|image| classify_image(image.view(), patch_size, classifier, classes))
        .collect()
}

#[cfg(test)]
mod classification_test {
    use super::*;
    use ndarray::Array3;
    use std::sync::Arc;

    /// Always predicts the same class with probability 1.
    struct ConstantModel(usize, usize);

    impl InferenceModel for ConstantModel {
        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }

        fn predict(
            &self,
            batch: ndarray::ArrayView4<f32>,
        ) -> Result<ndarray::Array2<f32>, TerrasatError> {
            let mut out = ndarray::Array2::zeros((batch.dim().0, self.1));
            out.column_mut(self.0).fill(1.0);
            Ok(out)
        }
    }

    #[test]
    fn test_model_backed_pipeline() {
        let classes = LandCoverClasses::default();
        let classifier = Classifier::model_backed(Arc::new(ConstantModel(1, classes.len())));
        let image = Array3::<u8>::zeros((130, 200, 3));

        let distribution =
            classify_image(image.view(), PatchSize::default(), &classifier, &classes).unwrap();
        let dominant = distribution.dominant().unwrap();
        assert_eq!(distribution.len(), 1);
        assert_eq!(dominant.label, "Water bodies");
        assert_eq!(dominant.count, 2 * 3);
        assert_eq!(dominant.percentage, 100.0);
    }

    #[test]
    fn test_pipelines_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Classifier>();
        assert_send_sync::<crate::propagation::Sgp4>();
    }

    #[test]
    fn test_empty_image_fails_the_call() {
        let classifier = Classifier::simulated(SimulationParams::default(), 0);
        let image = Array3::<u8>::zeros((10, 10, 3));
        assert!(matches!(
            classify_image(
                image.view(),
                PatchSize::default(),
                &classifier,
                &LandCoverClasses::default()
            ),
            Err(TerrasatError::EmptyImage { .. })
        ));
    }

    #[test]
    fn test_parallel_images_keep_order() {
        let classifier = Classifier::simulated(SimulationParams::default(), 5);
        let classes = LandCoverClasses::default();
        let small = Array3::<u8>::zeros((16, 16, 3));
        let large = Array3::<u8>::zeros((256, 256, 3));
        let images = [large.view(), small.view(), large.view()];

        let results = classify_images(&images, PatchSize::default(), &classifier, &classes);
        assert_eq!(results.len(), 3);
        assert!(results[1].is_err());
        assert_eq!(results[0].as_ref().unwrap(), results[2].as_ref().unwrap());

        let sequential =
            classify_image(large.view(), PatchSize::default(), &classifier, &classes).unwrap();
        assert_eq!(results[0].as_ref().unwrap(), &sequential);
    }
}
