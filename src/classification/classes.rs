use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_LAND_COVER_CLASSES;
use crate::terrasat_errors::TerrasatError;

/// Ordered list of land-cover category labels.
///
/// The position of a label is its class index: classifiers emit indices into this list and the
/// aggregator breaks percentage ties by it. The list is never empty and labels are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LandCoverClasses {
    labels: Vec<String>,
}

impl LandCoverClasses {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Result<Self, TerrasatError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(TerrasatError::InvalidParameter(
                "land-cover class list is empty".into(),
            ));
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(TerrasatError::InvalidParameter(format!(
                    "duplicate land-cover class {label:?}"
                )));
            }
        }
        Ok(LandCoverClasses { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Class index of a label, if declared.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

impl Default for LandCoverClasses {
    fn default() -> Self {
        LandCoverClasses {
            labels: DEFAULT_LAND_COVER_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for LandCoverClasses {
    type Error = TerrasatError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<LandCoverClasses> for Vec<String> {
    fn from(classes: LandCoverClasses) -> Self {
        classes.labels
    }
}

impl fmt::Display for LandCoverClasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.labels.join(", "))
    }
}

#[cfg(test)]
mod classes_test {
    use super::*;

    #[test]
    fn test_default_classes() {
        let classes = LandCoverClasses::default();
        assert_eq!(classes.len(), 6);
        assert_eq!(classes.label(2), Some("Forest"));
        assert_eq!(classes.index_of("Agricultural land"), Some(3));
        assert_eq!(classes.index_of("Glacier"), None);
        assert_eq!(classes.label(6), None);
    }

    #[test]
    fn test_validation() {
        assert!(LandCoverClasses::new(Vec::<String>::new()).is_err());
        assert!(LandCoverClasses::new(["Urban", "Forest", "Urban"]).is_err());
        let classes = LandCoverClasses::new(["Water", "Ice"]).unwrap();
        assert_eq!(classes.to_string(), "[Water, Ice]");
    }
}
