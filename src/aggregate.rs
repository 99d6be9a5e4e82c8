//! # Class distribution
//!
//! Turn per-patch class indices into a percentage distribution.
//!
//! Every declared class that received at least one patch gets an entry
//! `count / total × 100`, rounded to two decimals. Entries are ordered by decreasing percentage;
//! equal percentages keep the declaration order of the classes. Because of rounding, the
//! percentages sum to 100 only within `0.005 × (number of entries)`.
use itertools::Itertools;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::terrasat_errors::TerrasatError;

/// Share of one class in a distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassShare {
    pub label: String,
    /// Position of the class in the declared class list
    pub index: usize,
    /// Number of patches assigned to the class
    pub count: usize,
    /// Percentage of patches, in [0, 100], rounded to 2 decimals
    pub percentage: f64,
}

/// Class percentages ordered by decreasing share.
///
/// Serializes as a map from label to percentage, in that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDistribution {
    shares: Vec<ClassShare>,
    total: usize,
}

impl ClassDistribution {
    /// Class with the largest share, `None` for an empty distribution.
    pub fn dominant(&self) -> Option<&ClassShare> {
        self.shares.first()
    }

    /// Number of classes present.
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Number of patches aggregated.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassShare> {
        self.shares.iter()
    }

    /// Percentage of a class, `None` if no patch was assigned to it.
    pub fn percentage(&self, label: &str) -> Option<f64> {
        self.shares
            .iter()
            .find(|share| share.label == label)
            .map(|share| share.percentage)
    }
}

impl<'a> IntoIterator for &'a ClassDistribution {
    type Item = &'a ClassShare;
    type IntoIter = std::slice::Iter<'a, ClassShare>;

    fn into_iter(self) -> Self::IntoIter {
        self.shares.iter()
    }
}

impl Serialize for ClassDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.shares.len()))?;
        for share in &self.shares {
            map.serialize_entry(&share.label, &share.percentage)?;
        }
        map.end()
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Aggregate class indices into a distribution.
///
/// Arguments
/// -----------------
/// * `class_indices`: one class index per patch
/// * `class_names`: declared class labels, indexed by class
///
/// Return
/// ----------
/// * the distribution (empty when `class_indices` is empty), or
/// * `UnknownClassIndex` if an index does not name a declared class
pub fn aggregate<S: AsRef<str>>(
    class_indices: &[usize],
    class_names: &[S],
) -> Result<ClassDistribution, TerrasatError> {
    let n_classes = class_names.len();
    let mut counts = vec![0usize; n_classes];
    for &index in class_indices {
        match counts.get_mut(index) {
            Some(count) => *count += 1,
            None => return Err(TerrasatError::UnknownClassIndex { index, n_classes }),
        }
    }

    let total = class_indices.len();
    if total == 0 {
        return Ok(ClassDistribution::default());
    }

    let shares = counts
        .into_iter()
        .enumerate()
        .filter(|&(_, count)| count > 0)
        .map(|(index, count)| ClassShare {
            label: class_names[index].as_ref().to_string(),
            index,
            count,
            percentage: round2(count as f64 / total as f64 * 100.0),
        })
        // stable: equal percentages stay in declaration order
        .sorted_by(|a, b| b.percentage.total_cmp(&a.percentage))
        .collect();

    Ok(ClassDistribution { shares, total })
}
