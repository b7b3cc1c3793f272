use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A relative lookback period, named the way upstream chart APIs name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookbackPeriod {
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl LookbackPeriod {
    /// The canonical token for this period, e.g. `"1y"`.
    pub fn as_token(&self) -> &'static str {
        match self {
            LookbackPeriod::FiveDays => "5d",
            LookbackPeriod::OneMonth => "1mo",
            LookbackPeriod::ThreeMonths => "3mo",
            LookbackPeriod::SixMonths => "6mo",
            LookbackPeriod::OneYear => "1y",
            LookbackPeriod::TwoYears => "2y",
            LookbackPeriod::FiveYears => "5y",
            LookbackPeriod::TenYears => "10y",
            LookbackPeriod::YearToDate => "ytd",
            LookbackPeriod::Max => "max",
        }
    }
}

impl FromStr for LookbackPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let period = match s.trim().to_ascii_lowercase().as_str() {
            "5d" => LookbackPeriod::FiveDays,
            "1mo" => LookbackPeriod::OneMonth,
            "3mo" => LookbackPeriod::ThreeMonths,
            "6mo" => LookbackPeriod::SixMonths,
            "1y" => LookbackPeriod::OneYear,
            "2y" => LookbackPeriod::TwoYears,
            "5y" => LookbackPeriod::FiveYears,
            "10y" => LookbackPeriod::TenYears,
            "ytd" => LookbackPeriod::YearToDate,
            "max" => LookbackPeriod::Max,
            _ => return Err(CoreError::InvalidWindow(s.to_string())),
        };
        Ok(period)
    }
}

/// The history window requested for every instrument in one acquisition.
///
/// Providers may honor only one of the two forms; a provider that cannot
/// honor the form it is given reports `Unsupported` rather than guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Window {
    /// A relative period ending today.
    Lookback(LookbackPeriod),
    /// Everything from an explicit start date up to today.
    Since(NaiveDate),
}

impl FromStr for Window {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Window::Since(date));
        }
        trimmed.parse::<LookbackPeriod>().map(Window::Lookback)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Lookback(period) => f.write_str(period.as_token()),
            Window::Since(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl TryFrom<String> for Window {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Window> for String {
    fn from(window: Window) -> Self {
        window.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_window_forms() {
        assert_eq!(
            "2023-01-01".parse::<Window>().unwrap(),
            Window::Since(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
        );
        assert_eq!(
            "1Y".parse::<Window>().unwrap(),
            Window::Lookback(LookbackPeriod::OneYear)
        );
        assert!("fortnight".parse::<Window>().is_err());
    }

    #[test]
    fn window_serializes_as_its_token() {
        let window = Window::Lookback(LookbackPeriod::SixMonths);
        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(json, "\"6mo\"");
        let back: Window = serde_json::from_str(&json).unwrap();
        assert_eq!(back, window);
    }
}
