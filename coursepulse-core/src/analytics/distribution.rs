//! Bracket distributions for percentages and skill levels.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Lower bounds of the five 20-point brackets.
pub const BRACKETS: [u32; 5] = [0, 20, 40, 60, 80];

/// Counts of values per 20-point bracket. All five brackets are always
/// present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketDistribution {
    counts: [u64; 5],
}

impl BracketDistribution {
    /// Count for the bracket starting at `bracket` (0, 20, 40, 60 or 80).
    pub fn get(&self, bracket: u32) -> Option<u64> {
        BRACKETS
            .iter()
            .position(|&b| b == bracket)
            .map(|idx| self.counts[idx])
    }

    /// Total number of values counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `(bracket, count)` pairs in ascending bracket order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        BRACKETS.iter().copied().zip(self.counts.iter().copied())
    }

    fn add(&mut self, value: f64) {
        self.counts[bracket_index(value)] += 1;
    }
}

/// Index into [`BRACKETS`] for a value, `floor(value / 20)`.
///
/// 100 falls into the 80 bracket rather than a sixth one. Values outside
/// `[0, 100]` are clamped to the nearest bracket.
fn bracket_index(value: f64) -> usize {
    let idx = (value / 20.0).floor();
    if idx.is_nan() || idx < 0.0 {
        0
    } else {
        (idx as usize).min(BRACKETS.len() - 1)
    }
}

/// Classify each value into its bracket.
pub fn bucketize<I>(values: I) -> BracketDistribution
where
    I: IntoIterator<Item = f64>,
{
    let mut distribution = BracketDistribution::default();
    for value in values {
        distribution.add(value);
    }
    distribution
}

impl Serialize for BracketDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BRACKETS.len()))?;
        for (bracket, count) in self.iter() {
            map.serialize_entry(&bracket.to_string(), &count)?;
        }
        map.end()
    }
}
