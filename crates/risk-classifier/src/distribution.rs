//! Tier distribution over a scored dataset

use crate::label::RiskLabel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Count of rows per risk tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDistribution {
    counts: [usize; 3],
}

impl TierDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: RiskLabel) {
        self.counts[label.index()] += 1;
    }

    pub fn count(&self, label: RiskLabel) -> usize {
        self.counts[label.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Share of a tier in [0, 1]; zero for an empty distribution
    pub fn share(&self, label: RiskLabel) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.count(label) as f64 / total as f64,
        }
    }

    /// Counts in tier order
    pub fn iter(&self) -> impl Iterator<Item = (RiskLabel, usize)> + '_ {
        RiskLabel::ALL.iter().map(move |l| (*l, self.count(*l)))
    }
}

impl FromIterator<RiskLabel> for TierDistribution {
    fn from_iter<I: IntoIterator<Item = RiskLabel>>(iter: I) -> Self {
        let mut dist = Self::new();
        for label in iter {
            dist.record(label);
        }
        dist
    }
}

impl fmt::Display for TierDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(label, count)| format!("{}={}", label, count))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
