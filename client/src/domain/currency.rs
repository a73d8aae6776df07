//! Conversion between USD and the local currency using one externally supplied rate.
//!
//! Every currency in the system is a boolean flag: `true` is USD, `false` is the
//! local currency. There is exactly one rate (local units per 1 USD), fetched once
//! per session; no rate history is kept.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CurrencyError {
    /// A cross-currency conversion was requested before the rate was fetched
    #[error("The exchange rate is not available yet; try again once it has loaded")]
    RateUnavailable,

    #[error("Exchange rate must be a positive finite number")]
    InvalidRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Usd,
    Local,
}

impl Currency {
    pub fn from_flag(is_usd: bool) -> Self {
        if is_usd {
            Currency::Usd
        } else {
            Currency::Local
        }
    }

    pub fn is_usd(&self) -> bool {
        matches!(self, Currency::Usd)
    }

    /// ISO code for display, given the configured local currency code
    pub fn code<'a>(&self, local_code: &'a str) -> &'a str {
        match self {
            Currency::Usd => "USD",
            Currency::Local => local_code,
        }
    }
}

/// Local currency units per 1 USD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRate(f64);

impl ExchangeRate {
    pub fn new(local_per_usd: f64) -> Result<Self, CurrencyError> {
        if local_per_usd.is_finite() && local_per_usd > 0.0 {
            Ok(Self(local_per_usd))
        } else {
            Err(CurrencyError::InvalidRate)
        }
    }

    pub fn local_per_usd(&self) -> f64 {
        self.0
    }
}

/// Convert `amount` between the two currencies.
///
/// Same-currency conversions return the amount unchanged and never need a rate.
/// A cross-currency conversion without a rate fails instead of passing the
/// amount through unconverted.
pub fn convert(
    amount: f64,
    rate: Option<ExchangeRate>,
    from_is_usd: bool,
    to_is_usd: bool,
) -> Result<f64, CurrencyError> {
    if from_is_usd == to_is_usd {
        return Ok(amount);
    }

    let rate = rate.ok_or(CurrencyError::RateUnavailable)?.local_per_usd();
    if from_is_usd {
        Ok(amount * rate)
    } else {
        Ok(amount / rate)
    }
}

/// Format an amount for display: USD with cents, the local currency in whole
/// units, thousands grouped with spaces. `1234.5, true` -> `"1 234.50 USD"`.
pub fn format_amount(amount: f64, is_usd: bool, local_code: &str) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let magnitude = amount.abs();
    let currency = Currency::from_flag(is_usd);

    let number = if is_usd {
        let fixed = format!("{:.2}", magnitude);
        match fixed.split_once('.') {
            Some((whole, cents)) => format!("{}.{}", group_thousands(whole), cents),
            None => group_thousands(&fixed),
        }
    } else {
        // Local amounts are shown as whole units, truncating any fraction
        group_thousands(&format!("{}", magnitude.trunc() as i64))
    };

    format!("{}{} {}", sign, number, currency.code(local_code))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    grouped
}
