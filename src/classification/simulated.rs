//! Seeded stochastic stand-in for a trained classifier.
//!
//! Each run draws a class-bias vector `b ~ N(0, bias_std)`, adds fixed boosts to a few
//! "dominant" classes, then for every patch draws logits `b + N(0, noise_std)` and samples a class
//! from their softmax. The same seed, parameters and patch count always give the same labels.
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::PatchClassifier;
use crate::imagery::ImagePatch;
use crate::terrasat_errors::TerrasatError;
use crate::validation::ge0;

/// Additive logit boost of one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominantBoost {
    pub class: usize,
    pub boost: f64,
}

/// Parameters of the [`SimulatedClassifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    bias_std: f64,
    noise_std: f64,
    dominant: Vec<DominantBoost>,
}

impl SimulationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SimulationParamsBuilder {
        SimulationParamsBuilder::new()
    }

    /// Standard deviation of the per-run class bias
    pub fn bias_std(&self) -> f64 {
        self.bias_std
    }

    /// Standard deviation of the per-patch logit noise
    pub fn noise_std(&self) -> f64 {
        self.noise_std
    }

    pub fn dominant(&self) -> &[DominantBoost] {
        &self.dominant
    }
}

impl Default for SimulationParams {
    /// Forest (+1.2) and Agricultural land (+0.8) dominate the default class list.
    fn default() -> Self {
        SimulationParams {
            bias_std: 0.3,
            noise_std: 0.5,
            dominant: vec![
                DominantBoost {
                    class: 2,
                    boost: 1.2,
                },
                DominantBoost {
                    class: 3,
                    boost: 0.8,
                },
            ],
        }
    }
}

/// Builder for [`SimulationParams`], with validation.
#[derive(Debug, Clone)]
pub struct SimulationParamsBuilder {
    params: SimulationParams,
}

impl Default for SimulationParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: SimulationParams::default(),
        }
    }

    pub fn bias_std(mut self, v: f64) -> Self {
        self.params.bias_std = v;
        self
    }
    pub fn noise_std(mut self, v: f64) -> Self {
        self.params.noise_std = v;
        self
    }
    /// Replace the dominant classes.
    pub fn dominant(mut self, v: impl IntoIterator<Item = (usize, f64)>) -> Self {
        self.params.dominant = v
            .into_iter()
            .map(|(class, boost)| DominantBoost { class, boost })
            .collect();
        self
    }

    /// Validate and produce the [`SimulationParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `bias_std >= 0`, `noise_std >= 0`, both finite.
    /// * every boost is finite.
    /// * a class appears at most once among the dominant classes.
    ///
    /// Class indices are checked against the class list when classifying, since the list is not
    /// known here.
    pub fn build(self) -> Result<SimulationParams, TerrasatError> {
        let p = &self.params;
        if !ge0(p.bias_std) {
            return Err(TerrasatError::InvalidParameter(format!(
                "bias_std must be finite and non-negative, got {}",
                p.bias_std
            )));
        }
        if !ge0(p.noise_std) {
            return Err(TerrasatError::InvalidParameter(format!(
                "noise_std must be finite and non-negative, got {}",
                p.noise_std
            )));
        }
        for (i, d) in p.dominant.iter().enumerate() {
            if !d.boost.is_finite() {
                return Err(TerrasatError::InvalidParameter(format!(
                    "boost of class {} must be finite, got {}",
                    d.class, d.boost
                )));
            }
            if p.dominant[..i].iter().any(|other| other.class == d.class) {
                return Err(TerrasatError::InvalidParameter(format!(
                    "class {} is boosted twice",
                    d.class
                )));
            }
        }
        Ok(self.params)
    }
}

impl fmt::Display for SimulationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimulationParams(bias_std={:.2}, noise_std={:.2}, dominant=[",
            self.bias_std, self.noise_std
        )?;
        for (i, d) in self.dominant.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{:+.2}", d.class, d.boost)?;
        }
        write!(f, "])")
    }
}

/// Softmax of a logit vector, shifted by its maximum so that `exp` cannot overflow.
pub(crate) fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

/// Index of the class selected by a uniform draw `u ∈ [0, 1)` on the cumulative distribution.
///
/// Rounding may leave the last cumulative value slightly below 1; such draws fall in the last
/// class.
fn sample_categorical(probabilities: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    for (index, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return index;
        }
    }
    probabilities.len().saturating_sub(1)
}

/// Seeded stochastic classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedClassifier {
    params: SimulationParams,
    seed: u64,
}

impl SimulatedClassifier {
    pub fn new(params: SimulationParams, seed: u64) -> Self {
        SimulatedClassifier { params, seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }
}

impl PatchClassifier for SimulatedClassifier {
    fn classify(&self, patches: &[ImagePatch], n_classes: usize) -> Result<Vec<usize>, TerrasatError> {
        if n_classes == 0 {
            return Err(TerrasatError::InvalidParameter(
                "cannot classify into an empty class list".into(),
            ));
        }
        if let Some(d) = self.params.dominant.iter().find(|d| d.class >= n_classes) {
            return Err(TerrasatError::InvalidParameter(format!(
                "dominant class {} out of range for {n_classes} classes",
                d.class
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let bias_dist = Normal::new(0.0, self.params.bias_std)?;
        let noise_dist = Normal::new(0.0, self.params.noise_std)?;

        let mut bias: Vec<f64> = (0..n_classes).map(|_| rng.sample(bias_dist)).collect();
        for d in &self.params.dominant {
            bias[d.class] += d.boost;
        }

        Ok(patches
            .iter()
            .map(|_| {
                let logits: Vec<f64> = bias.iter().map(|b| b + rng.sample(noise_dist)).collect();
                sample_categorical(&softmax(&logits), rng.random::<f64>())
            })
            .collect())
    }
}
