use crate::engine::{daily_returns, mean};
use crate::error::AnalyticsError;
use core_types::{AlignedPriceTable, Metric, UndefinedReason};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Per-instrument return columns that may contain gaps.
///
/// Columns are equal-length and row-aligned; `None` marks a missing
/// observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    instruments: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl ReturnMatrix {
    pub fn new(columns: Vec<(String, Vec<Option<f64>>)>) -> Result<Self, AnalyticsError> {
        let expected = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let mut seen = HashSet::new();
        for (instrument, column) in &columns {
            if !seen.insert(instrument.as_str()) {
                return Err(AnalyticsError::DuplicateInstrument(instrument.clone()));
            }
            if column.len() != expected {
                return Err(AnalyticsError::RaggedMatrix {
                    instrument: instrument.clone(),
                    expected,
                    found: column.len(),
                });
            }
        }
        let (instruments, columns) = columns.into_iter().unzip();
        Ok(Self { instruments, columns })
    }

    /// Daily returns of every column of a fully populated table.
    pub fn from_table(table: &AlignedPriceTable) -> Self {
        let (instruments, columns) = table
            .columns()
            .map(|(id, prices)| {
                (
                    id.to_string(),
                    daily_returns(prices).into_iter().map(Some).collect(),
                )
            })
            .unzip();
        Self { instruments, columns }
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Row indices at which every column has a finite observation.
    fn complete_rows(&self) -> Vec<usize> {
        let rows = self.columns.first().map(Vec::len).unwrap_or(0);
        (0..rows)
            .filter(|&row| {
                self.columns
                    .iter()
                    .all(|c| c[row].is_some_and(f64::is_finite))
            })
            .collect()
    }
}

/// A symmetric instrument × instrument correlation table.
///
/// Serializes as a nested map: `{"SPY": {"SPY": {"value": 1.0}, ...}, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "BTreeMap<String, BTreeMap<String, Metric>>")]
pub struct CorrelationMatrix {
    instruments: Vec<String>,
    values: Vec<Vec<Metric>>,
}

impl CorrelationMatrix {
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn get(&self, a: &str, b: &str) -> Option<Metric> {
        let i = self.instruments.iter().position(|x| x == a)?;
        let j = self.instruments.iter().position(|x| x == b)?;
        Some(self.values[i][j])
    }

    /// Rounds every defined entry. The diagonal stays exactly 1.0.
    pub fn rounded(&self, decimal_places: u32) -> Self {
        Self {
            instruments: self.instruments.clone(),
            values: self
                .values
                .iter()
                .map(|row| row.iter().map(|m| m.rounded(decimal_places)).collect())
                .collect(),
        }
    }

    /// Every off-diagonal pair whose correlation is undefined, listed once.
    pub fn undefined_pairs(&self) -> Vec<(&str, &str, UndefinedReason)> {
        let mut pairs = Vec::new();
        for i in 0..self.instruments.len() {
            for j in (i + 1)..self.instruments.len() {
                if let Some(reason) = self.values[i][j].undefined_reason() {
                    pairs.push((self.instruments[i].as_str(), self.instruments[j].as_str(), reason));
                }
            }
        }
        pairs
    }
}

impl From<CorrelationMatrix> for BTreeMap<String, BTreeMap<String, Metric>> {
    fn from(matrix: CorrelationMatrix) -> Self {
        matrix
            .instruments
            .iter()
            .zip(matrix.values)
            .map(|(a, row)| {
                let inner = matrix.instruments.iter().cloned().zip(row).collect();
                (a.clone(), inner)
            })
            .collect()
    }
}

/// Pearson correlation of every pair of columns.
///
/// Only rows where every column is observed are used, so all pairs share the
/// same common date range. The diagonal is exactly 1.0. A pair is undefined
/// with fewer than two complete rows, or when a column has zero variance
/// (unless both columns are identical, which is a perfect correlation).
pub fn correlation_matrix(matrix: &ReturnMatrix) -> CorrelationMatrix {
    let rows = matrix.complete_rows();
    let columns: Vec<Vec<f64>> = matrix
        .columns
        .iter()
        .map(|c| rows.iter().filter_map(|&r| c[r]).collect())
        .collect();
    let n = columns.len();

    if rows.len() < 2 && n > 1 {
        tracing::debug!(complete_rows = rows.len(), "Too few complete rows for correlation.");
    }

    let mut values = vec![vec![Metric::Value(1.0); n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let r = if rows.len() < 2 {
                Metric::Undefined(UndefinedReason::InsufficientOverlap)
            } else {
                pearson(&columns[i], &columns[j])
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        instruments: matrix.instruments.clone(),
        values,
    }
}

/// Sum-of-squares threshold below which a column counts as constant.
const ZERO_VARIANCE_EPSILON: f64 = 1e-24;
const IDENTICAL_TOLERANCE: f64 = 1e-12;

fn pearson(x: &[f64], y: &[f64]) -> Metric {
    let (Some(mx), Some(my)) = (mean(x), mean(y)) else {
        return Metric::Undefined(UndefinedReason::InsufficientOverlap);
    };

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx < ZERO_VARIANCE_EPSILON || syy < ZERO_VARIANCE_EPSILON {
        let identical = x.iter().zip(y).all(|(a, b)| (a - b).abs() < IDENTICAL_TOLERANCE);
        return if identical {
            Metric::Value(1.0)
        } else {
            Metric::Undefined(UndefinedReason::ZeroVariance)
        };
    }

    match Metric::from_f64(sxy / (sxx * syy).sqrt()) {
        Metric::Value(r) => Metric::Value(r.clamp(-1.0, 1.0)),
        undefined => undefined,
    }
}
