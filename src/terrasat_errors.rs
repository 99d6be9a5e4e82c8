use thiserror::Error;

use crate::propagation::PropagationError;
use crate::tle::TleParseError;

#[derive(Error, Debug)]
pub enum TerrasatError {
    #[error("Malformed two-line element set: {0}")]
    BadElements(#[from] TleParseError),

    #[error("SGP4 propagation failed: {0}")]
    Propagation(#[from] PropagationError),

    #[error("Image too small: no full {patch_height}x{patch_width} patch fits in {height}x{width}")]
    EmptyImage {
        height: usize,
        width: usize,
        patch_height: usize,
        patch_width: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Class index {index} out of range for {n_classes} classes")]
    UnknownClassIndex { index: usize, n_classes: usize },

    #[error("Model inference failed: {0}")]
    ModelInference(String),

    #[error("Gaussian noise generation failed: {0:?}")]
    NoiseInjectionError(rand_distr::NormalError),

    #[error("Unable to read configuration file: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("Unable to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl From<rand_distr::NormalError> for TerrasatError {
    fn from(err: rand_distr::NormalError) -> Self {
        TerrasatError::NoiseInjectionError(err)
    }
}

impl PartialEq for TerrasatError {
    fn eq(&self, other: &Self) -> bool {
        use TerrasatError::*;
        match (self, other) {
            (BadElements(a), BadElements(b)) => a == b,
            (Propagation(a), Propagation(b)) => a == b,
            (
                EmptyImage {
                    height: h1,
                    width: w1,
                    patch_height: ph1,
                    patch_width: pw1,
                },
                EmptyImage {
                    height: h2,
                    width: w2,
                    patch_height: ph2,
                    patch_width: pw2,
                },
            ) => h1 == h2 && w1 == w2 && ph1 == ph2 && pw1 == pw2,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (
                UnknownClassIndex {
                    index: i1,
                    n_classes: n1,
                },
                UnknownClassIndex {
                    index: i2,
                    n_classes: n2,
                },
            ) => i1 == i2 && n1 == n2,
            (ModelInference(a), ModelInference(b)) => a == b,
            (NoiseInjectionError(a), NoiseInjectionError(b)) => a == b,

            // io and toml errors carry no comparable payload
            (ConfigRead(_), ConfigRead(_)) => true,
            (ConfigParse(_), ConfigParse(_)) => true,

            _ => false,
        }
    }
}
