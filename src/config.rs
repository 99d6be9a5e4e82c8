//! # Configuration
//!
//! Optional TOML configuration grouping the parameters of both pipelines. Every section and every
//! key may be omitted, defaults apply:
//!
//! ```toml
//! classes = ["Urban", "Water bodies", "Forest", "Agricultural land", "Barren land", "Cloud cover"]
//!
//! [track]
//! duration_minutes = 1440.0
//! step_minutes = 10.0
//! frame = "inertial"        # or "earth_fixed"
//! gravity = "wgs72"         # or "wgs84"
//!
//! [tiling]
//! patch_height = 64
//! patch_width = 64
//!
//! [simulation]
//! seed = 42
//! bias_std = 0.3
//! noise_std = 0.5
//! dominant = [{ class = "Forest", boost = 1.2 }, { class = "Agricultural land", boost = 0.8 }]
//! ```
//!
//! When `dominant` is omitted, the default boosts (Forest, Agricultural land) apply to those of
//! the two labels present in `classes`; a class list without them runs with no boosts.
//!
//! Values are checked by the same builders as programmatic parameters, when the typed
//! parameters are requested.
use camino::Utf8Path;
use serde::Deserialize;
use tracing::debug;

use crate::classification::{Classifier, LandCoverClasses, SimulationParams};
use crate::constants::{
    Minutes, DEFAULT_LAND_COVER_CLASSES, DEFAULT_PATCH_EDGE, DEFAULT_TRACK_DURATION_MIN,
    DEFAULT_TRACK_STEP_MIN,
};
use crate::geodetic::GeodeticFrame;
use crate::imagery::PatchSize;
use crate::propagation::GravityModel;
use crate::terrasat_errors::TerrasatError;
use crate::track::TrackParams;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackConfig {
    pub duration_minutes: Minutes,
    pub step_minutes: Minutes,
    pub frame: GeodeticFrame,
    pub gravity: GravityModel,
}

impl Default for TrackConfig {
    fn default() -> Self {
        TrackConfig {
            duration_minutes: DEFAULT_TRACK_DURATION_MIN,
            step_minutes: DEFAULT_TRACK_STEP_MIN,
            frame: GeodeticFrame::default(),
            gravity: GravityModel::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TilingConfig {
    pub patch_height: usize,
    pub patch_width: usize,
}

impl Default for TilingConfig {
    fn default() -> Self {
        TilingConfig {
            patch_height: DEFAULT_PATCH_EDGE,
            patch_width: DEFAULT_PATCH_EDGE,
        }
    }
}

/// Boost of a class named by its label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelBoost {
    pub class: String,
    pub boost: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub seed: u64,
    pub bias_std: f64,
    pub noise_std: f64,
    /// Boosted classes; when absent, the default boosts of the classes that are declared
    pub dominant: Option<Vec<LabelBoost>>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let params = SimulationParams::default();
        SimulationConfig {
            seed: 42,
            bias_std: params.bias_std(),
            noise_std: params.noise_std(),
            dominant: None,
        }
    }
}

/// Parameters of both pipelines, as read from a TOML document.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerrasatConfig {
    pub classes: LandCoverClasses,
    pub track: TrackConfig,
    pub tiling: TilingConfig,
    pub simulation: SimulationConfig,
}

impl TerrasatConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, TerrasatError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, TerrasatError> {
        debug!(%path, "reading configuration");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn track_params(&self) -> Result<TrackParams, TerrasatError> {
        TrackParams::builder()
            .duration_minutes(self.track.duration_minutes)
            .step_minutes(self.track.step_minutes)
            .frame(self.track.frame)
            .gravity(self.track.gravity)
            .build()
    }

    pub fn patch_size(&self) -> Result<PatchSize, TerrasatError> {
        PatchSize::new(self.tiling.patch_height, self.tiling.patch_width)
    }

    /// Simulation parameters, with the dominant class labels resolved against [`Self::classes`].
    ///
    /// Without an explicit `dominant` list, each default boost is kept only if its label is one
    /// of the configured classes, so a custom class list simply runs without boosts.
    pub fn simulation_params(&self) -> Result<SimulationParams, TerrasatError> {
        let dominant = match &self.simulation.dominant {
            Some(boosts) => boosts
                .iter()
                .map(|d| {
                    self.classes
                        .index_of(&d.class)
                        .map(|index| (index, d.boost))
                        .ok_or_else(|| {
                            TerrasatError::InvalidParameter(format!(
                                "dominant class {:?} is not one of {}",
                                d.class, self.classes
                            ))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => SimulationParams::default()
                .dominant()
                .iter()
                .filter_map(|d| {
                    let label = DEFAULT_LAND_COVER_CLASSES.get(d.class)?;
                    let index = self.classes.index_of(label)?;
                    Some((index, d.boost))
                })
                .collect(),
        };

        SimulationParams::builder()
            .bias_std(self.simulation.bias_std)
            .noise_std(self.simulation.noise_std)
            .dominant(dominant)
            .build()
    }

    /// Simulated classifier seeded from the configuration.
    pub fn simulated_classifier(&self) -> Result<Classifier, TerrasatError> {
        Ok(Classifier::simulated(
            self.simulation_params()?,
            self.simulation.seed,
        ))
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = TerrasatConfig::from_toml_str("").unwrap();
        assert_eq!(config, TerrasatConfig::default());
        assert_eq!(config.track_params().unwrap(), TrackParams::default());
        assert_eq!(config.patch_size().unwrap(), PatchSize::default());
        assert_eq!(config.simulation_params().unwrap(), SimulationParams::default());
    }

    #[test]
    fn test_custom_classes_alone() {
        let config = TerrasatConfig::from_toml_str(r#"classes = ["Water", "Land", "Ice"]"#).unwrap();
        let simulation = config.simulation_params().unwrap();
        assert!(simulation.dominant().is_empty());
        assert_eq!(simulation.bias_std(), 0.3);

        let Classifier::Simulated(classifier) = config.simulated_classifier().unwrap() else {
            panic!("expected a simulated classifier");
        };
        assert_eq!(classifier.seed(), 42);

        let config =
            TerrasatConfig::from_toml_str(r#"classes = ["Agricultural land", "Water"]"#).unwrap();
        let dominant = config.simulation_params().unwrap().dominant().to_vec();
        assert_eq!(dominant.len(), 1);
        assert_eq!(dominant[0].class, 0);
        assert_eq!(dominant[0].boost, 0.8);
    }

    #[test]
    fn test_explicit_empty_dominant() {
        let config = TerrasatConfig::from_toml_str("[simulation]\ndominant = []").unwrap();
        assert!(config.simulation_params().unwrap().dominant().is_empty());
    }

    #[test]
    fn test_partial_document() {
        let config = TerrasatConfig::from_toml_str(
            r#"
            classes = ["Water", "Land", "Ice"]

            [track]
            step_minutes = 5.0
            frame = "earth_fixed"

            [simulation]
            seed = 7
            dominant = [{ class = "Ice", boost = 2.0 }]
            "#,
        )
        .unwrap();

        let params = config.track_params().unwrap();
        assert_eq!(params.nominal_samples(), 288);
        assert_eq!(params.frame(), GeodeticFrame::EarthFixed);
        assert_eq!(config.classes.len(), 3);

        let simulation = config.simulation_params().unwrap();
        assert_eq!(simulation.dominant().len(), 1);
        assert_eq!(simulation.dominant()[0].class, 2);
        assert_eq!(simulation.noise_std(), 0.5);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            TerrasatConfig::from_toml_str("[track]\nstep = 3"),
            Err(TerrasatError::ConfigParse(_))
        ));
        assert!(matches!(
            TerrasatConfig::from_toml_str("classes = []"),
            Err(TerrasatError::ConfigParse(_))
        ));

        let config = TerrasatConfig::from_toml_str("[tiling]\npatch_width = 0").unwrap();
        assert!(matches!(
            config.patch_size(),
            Err(TerrasatError::InvalidParameter(_))
        ));

        let config = TerrasatConfig::from_toml_str(
            "[simulation]\ndominant = [{ class = \"Glacier\", boost = 1.0 }]",
        )
        .unwrap();
        assert!(matches!(
            config.simulation_params(),
            Err(TerrasatError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            TerrasatConfig::from_file(Utf8Path::new("/nonexistent/terrasat.toml")),
            Err(TerrasatError::ConfigRead(_))
        ));
    }
}
