use crate::error::CoreError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The canonical close-price history of exactly one instrument.
///
/// Dates are strictly increasing and unique by construction, and every price
/// is positive and finite. Provider adapters build one of these before any
/// merge happens, so nothing downstream needs to know where the data came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    instrument: String,
    points: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    /// Builds a series from points that must already be valid: strictly
    /// increasing dates and positive, finite prices.
    pub fn new(
        instrument: impl Into<String>,
        points: Vec<(NaiveDate, f64)>,
    ) -> Result<Self, CoreError> {
        let instrument = instrument.into();
        let invalid = |reason: String| CoreError::InvalidSeries {
            instrument: instrument.clone(),
            reason,
        };

        if let Some(pair) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(invalid(format!(
                "date {} does not follow {}",
                pair[1].0, pair[0].0
            )));
        }
        if let Some((date, price)) = points.iter().find(|(_, p)| !(p.is_finite() && *p > 0.0)) {
            return Err(invalid(format!("price {price} on {date} is not a positive number")));
        }

        Ok(Self {
            points: points.into_iter().collect(),
            instrument,
        })
    }

    /// Builds a series from raw provider points in any order.
    ///
    /// A repeated date keeps the last value seen. Points whose price is not a
    /// positive finite number are dropped.
    pub fn normalized(
        instrument: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        let instrument = instrument.into();
        let mut map = BTreeMap::new();
        let mut dropped = 0usize;
        for (date, price) in points {
            if price.is_finite() && price > 0.0 {
                map.insert(date, price);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::warn!(instrument = %instrument, dropped, "Dropped invalid price points during normalization.");
        }
        Self { instrument, points: map }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<f64> {
        self.points.get(date).copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.points.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &f64)> {
        self.points.iter()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    /// Returns a copy containing only points on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Self {
        Self {
            instrument: self.instrument.clone(),
            points: self.points.range(start..).map(|(d, p)| (*d, *p)).collect(),
        }
    }
}

/// A date × instrument table in which every cell is populated.
///
/// The date axis is the intersection of the dates of all input series; rows
/// missing any instrument are excluded rather than forward-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPriceTable {
    dates: Vec<NaiveDate>,
    instruments: Vec<String>,
    /// One column per instrument, each `dates.len()` long.
    columns: Vec<Vec<f64>>,
}

impl AlignedPriceTable {
    /// Joins the series on the dates present in all of them.
    ///
    /// Column order follows the order of `series`.
    pub fn intersect(series: &[PriceSeries]) -> Result<Self, CoreError> {
        let Some(first) = series.first() else {
            return Err(CoreError::AlignmentEmpty(
                "no price series were available to align".to_string(),
            ));
        };

        let mut seen = BTreeSet::new();
        for s in series {
            if !seen.insert(s.instrument()) {
                return Err(CoreError::InvalidInput(
                    "instrument".to_string(),
                    format!("'{}' appears more than once", s.instrument()),
                ));
            }
        }

        let dates: Vec<NaiveDate> = first
            .dates()
            .filter(|date| series[1..].iter().all(|s| s.points.contains_key(date)))
            .copied()
            .collect();

        if dates.is_empty() {
            let names: Vec<&str> = series.iter().map(|s| s.instrument()).collect();
            return Err(CoreError::AlignmentEmpty(names.join(", ")));
        }

        let columns = series
            .iter()
            .map(|s| dates.iter().map(|d| s.points[d]).collect())
            .collect();

        Ok(Self {
            dates,
            instruments: series.iter().map(|s| s.instrument().to_string()).collect(),
            columns,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Number of rows (dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, instrument: &str) -> bool {
        self.instruments.iter().any(|i| i == instrument)
    }

    pub fn column(&self, instrument: &str) -> Option<&[f64]> {
        self.instruments
            .iter()
            .position(|i| i == instrument)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Iterates `(instrument, column)` pairs in table order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.instruments
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn strict_constructor_rejects_unsorted_and_duplicate_dates() {
        assert!(PriceSeries::new("X", vec![(d(2), 1.0), (d(1), 2.0)]).is_err());
        assert!(PriceSeries::new("X", vec![(d(1), 1.0), (d(1), 2.0)]).is_err());
        assert!(PriceSeries::new("X", vec![(d(1), 0.0)]).is_err());
        assert!(PriceSeries::new("X", vec![(d(1), 1.0), (d(3), 2.0)]).is_ok());
    }

    #[test]
    fn normalized_constructor_sorts_dedups_and_drops_bad_prices() {
        let series = PriceSeries::normalized(
            "X",
            vec![(d(3), 3.0), (d(1), 1.0), (d(3), 3.5), (d(2), f64::NAN), (d(4), -1.0)],
        );
        let points: Vec<_> = series.iter().map(|(d, p)| (*d, *p)).collect();
        assert_eq!(points, vec![(d(1), 1.0), (d(3), 3.5)]);
    }

    #[test]
    fn intersect_keeps_only_common_dates() {
        let a = PriceSeries::new("A", vec![(d(1), 1.0), (d(2), 2.0), (d(3), 3.0)]).unwrap();
        let b = PriceSeries::new("B", vec![(d(2), 20.0), (d(3), 30.0), (d(4), 40.0)]).unwrap();
        let table = AlignedPriceTable::intersect(&[a, b]).unwrap();

        assert_eq!(table.dates(), &[d(2), d(3)]);
        assert_eq!(table.instruments(), &["A".to_string(), "B".to_string()]);
        assert_eq!(table.column("A").unwrap(), &[2.0, 3.0]);
        assert_eq!(table.column("B").unwrap(), &[20.0, 30.0]);
    }

    #[test]
    fn intersect_without_common_dates_is_alignment_empty() {
        let a = PriceSeries::new("A", vec![(d(1), 1.0)]).unwrap();
        let b = PriceSeries::new("B", vec![(d(2), 2.0)]).unwrap();
        assert!(matches!(
            AlignedPriceTable::intersect(&[a, b]),
            Err(CoreError::AlignmentEmpty(_))
        ));
        assert!(matches!(
            AlignedPriceTable::intersect(&[]),
            Err(CoreError::AlignmentEmpty(_))
        ));
    }
}
