//! Balance delta calculation for the advance ledger.
//!
//! Pure computation: given the current balance, the event total, a requested
//! operation and an amount, work out what to submit and what the balance will
//! become. Nothing here talks to the network.

use shared::ChangeType;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What the user asked for. `Set` targets an absolute balance and is translated
/// into an add or subtract before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvanceOperation {
    Add,
    Subtract,
    Set,
}

impl fmt::Display for AdvanceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdvanceOperation::Add => "add",
            AdvanceOperation::Subtract => "subtract",
            AdvanceOperation::Set => "set",
        };
        f.write_str(name)
    }
}

impl FromStr for AdvanceOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(AdvanceOperation::Add),
            "subtract" => Ok(AdvanceOperation::Subtract),
            "set" => Ok(AdvanceOperation::Set),
            other => Err(format!("Unknown advance operation: {}", other)),
        }
    }
}

/// Local validation failures. These never reach the server and are not logged as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeltaRejection {
    #[error("Please enter an amount greater than zero")]
    InvalidAmount,

    #[error("The advance already equals this amount; nothing to change")]
    NoChange,

    #[error("The advance cannot become negative")]
    NegativeBalance,
}

/// The signed movement to submit and the balance it produces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvanceDelta {
    /// Always positive; the direction lives in `change_type`
    pub amount: f64,
    pub change_type: ChangeType,
    pub new_balance: f64,
    /// Advisory: the new balance is above the event total and needs user confirmation
    pub exceeds_total: bool,
}

/// Compute the delta for `operation` applied to `current`.
///
/// `total` only drives the advisory `exceeds_total` flag; it never rejects.
pub fn compute_delta(
    current: f64,
    total: f64,
    operation: AdvanceOperation,
    amount: f64,
) -> Result<AdvanceDelta, DeltaRejection> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DeltaRejection::InvalidAmount);
    }

    let (delta_amount, change_type) = match operation {
        AdvanceOperation::Add => (amount, ChangeType::Add),
        AdvanceOperation::Subtract => (amount, ChangeType::Subtract),
        AdvanceOperation::Set => {
            let difference = amount - current;
            if difference == 0.0 {
                return Err(DeltaRejection::NoChange);
            } else if difference > 0.0 {
                (difference, ChangeType::Add)
            } else {
                (difference.abs(), ChangeType::Subtract)
            }
        }
    };

    let new_balance = current + change_type.sign() * delta_amount;
    if new_balance < 0.0 {
        return Err(DeltaRejection::NegativeBalance);
    }

    Ok(AdvanceDelta {
        amount: delta_amount,
        change_type,
        new_balance,
        exceeds_total: new_balance > total,
    })
}

/// Parse a user-typed amount. Grouping spaces and commas are ignored, so
/// `"1 500 000"` and `"1,500,000"` both read as 1500000.
pub fn parse_amount_input(input: &str) -> Result<f64, DeltaRejection> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    if cleaned.is_empty() {
        return Err(DeltaRejection::InvalidAmount);
    }

    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(DeltaRejection::InvalidAmount),
    }
}
