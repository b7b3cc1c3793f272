use crate::error::PortfolioError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashSet;

/// The move required for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub instrument: String,
    pub current_value: Decimal,
    /// The target weight after normalization.
    pub target_weight: Decimal,
    pub target_value: Decimal,
    /// Positive to buy, negative to sell.
    pub trade_delta: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradePlan {
    pub total_value: Decimal,
    pub trades: Vec<Trade>,
}

impl TradePlan {
    pub fn get(&self, instrument: &str) -> Option<&Trade> {
        self.trades.iter().find(|t| t.instrument == instrument)
    }
}

/// Computes the trades that move `current_values` onto `target_weights`.
///
/// The total value is conserved: target values sum to exactly the current
/// total and the deltas to exactly zero. Any division residue is assigned to
/// the instrument with the largest target weight.
pub fn rebalance(
    instrument_ids: &[String],
    current_values: &[Decimal],
    target_weights: &[Decimal],
) -> Result<TradePlan, PortfolioError> {
    // --- 1. Validation ---
    if instrument_ids.len() != target_weights.len() || instrument_ids.len() != current_values.len() {
        return Err(PortfolioError::InvalidWeights(format!(
            "{} instruments, {} current values and {} target weights must line up",
            instrument_ids.len(),
            current_values.len(),
            target_weights.len()
        )));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = instrument_ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(PortfolioError::InvalidInput(format!(
            "instrument '{dup}' appears more than once"
        )));
    }
    if let Some((id, w)) = instrument_ids
        .iter()
        .zip(target_weights)
        .find(|(_, w)| **w < dec!(0))
    {
        return Err(PortfolioError::InvalidWeights(format!(
            "weight {w} for '{id}' is negative"
        )));
    }
    if let Some((id, v)) = instrument_ids
        .iter()
        .zip(current_values)
        .find(|(_, v)| **v < dec!(0))
    {
        return Err(PortfolioError::InvalidInput(format!(
            "current value {v} for '{id}' is negative"
        )));
    }

    let weight_sum = checked_sum(target_weights, "target weights")?;
    if weight_sum <= dec!(0) {
        return Err(PortfolioError::InvalidWeights("target weights sum to zero".to_string()));
    }

    // --- 2. Target allocation ---
    // Weights are normalized before scaling so raw weights of any size stay in range.
    let total_value = checked_sum(current_values, "current values")?;
    let mut trades = Vec::with_capacity(instrument_ids.len());
    for ((id, current), weight) in instrument_ids.iter().zip(current_values).zip(target_weights) {
        let target_weight = weight
            .checked_div(weight_sum)
            .ok_or_else(|| overflow("target weight"))?;
        let target_value = total_value
            .checked_mul(target_weight)
            .ok_or_else(|| overflow("target value"))?;
        trades.push(Trade {
            instrument: id.clone(),
            current_value: *current,
            target_weight,
            target_value,
            trade_delta: target_value
                .checked_sub(*current)
                .ok_or_else(|| overflow("trade delta"))?,
        });
    }

    // --- 3. Conserve the total ---
    let targets: Vec<Decimal> = trades.iter().map(|t| t.target_value).collect();
    let allocated = checked_sum(&targets, "target values")?;
    let residue = total_value
        .checked_sub(allocated)
        .ok_or_else(|| overflow("residue"))?;
    if !residue.is_zero() {
        let largest = trades
            .iter_mut()
            .max_by(|a, b| a.target_weight.cmp(&b.target_weight));
        if let Some(trade) = largest {
            trade.target_value = trade
                .target_value
                .checked_add(residue)
                .ok_or_else(|| overflow("target value"))?;
            trade.trade_delta = trade
                .trade_delta
                .checked_add(residue)
                .ok_or_else(|| overflow("trade delta"))?;
        }
        tracing::debug!(%residue, "Assigned rounding residue to the largest target.");
    }

    Ok(TradePlan {
        total_value,
        trades,
    })
}

fn overflow(what: &str) -> PortfolioError {
    PortfolioError::InvalidInput(format!("{what} is out of the representable decimal range"))
}

fn checked_sum(values: &[Decimal], what: &str) -> Result<Decimal, PortfolioError> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| overflow(what))
}
