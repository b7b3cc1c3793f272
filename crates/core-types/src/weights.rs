use crate::error::CoreError;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// A non-negative weight vector, normalized to sum to 1.0, paired with the
/// instruments it applies to in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Weights {
    entries: Vec<(String, f64)>,
}

impl Weights {
    /// Divides `raw` by its sum.
    ///
    /// A zero sum is an error, never a silent switch to equal weights.
    pub fn normalize(instruments: &[String], raw: &[f64]) -> Result<Self, CoreError> {
        if instruments.len() != raw.len() {
            return Err(CoreError::InvalidWeights(format!(
                "{} weights were given for {} instruments",
                raw.len(),
                instruments.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = instruments.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(CoreError::InvalidInput(
                "instrument".to_string(),
                format!("'{dup}' appears more than once"),
            ));
        }

        if let Some((id, w)) = instruments
            .iter()
            .zip(raw)
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(CoreError::InvalidWeights(format!(
                "weight {w} for '{id}' is not a non-negative number"
            )));
        }

        // Scaling by the largest weight first keeps the sum finite.
        let largest = raw.iter().copied().fold(0.0, f64::max);
        if largest <= 0.0 {
            return Err(CoreError::InvalidWeights("weights sum to zero".to_string()));
        }
        let scaled: Vec<f64> = raw.iter().map(|w| w / largest).collect();
        let sum: f64 = scaled.iter().sum();

        Ok(Self {
            entries: instruments
                .iter()
                .cloned()
                .zip(scaled.iter().map(|w| w / sum))
                .collect(),
        })
    }

    /// Drops the given instruments and renormalizes what remains.
    pub fn without(&self, dropped: &BTreeSet<String>) -> Result<Self, CoreError> {
        let (ids, raw): (Vec<String>, Vec<f64>) = self
            .entries
            .iter()
            .filter(|(id, _)| !dropped.contains(id))
            .cloned()
            .unzip();
        Self::normalize(&ids, &raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, instrument: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(id, _)| id == instrument)
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(id, w)| (id.as_str(), *w))
    }

    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }
}
