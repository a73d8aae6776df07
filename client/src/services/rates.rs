//! Exchange-rate provider client.
//!
//! The provider quotes every currency against USD (`{"rates": {"UZS": 12650.0, ...}}`),
//! which is exactly the "local units per 1 USD" rate the converter needs.

use reqwest::Client;
use shared::ExchangeRatesResponse;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::domain::currency::{CurrencyError, ExchangeRate};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Rate provider did not quote {0}")]
    MissingCurrency(String),

    #[error("Rate provider returned an invalid rate for {code}: {value}")]
    InvalidRate { code: String, value: f64 },
}

#[derive(Clone)]
pub struct ExchangeRateClient {
    url: String,
    timeout: Duration,
    http: Client,
}

impl ExchangeRateClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: config.rates_url.clone(),
            timeout: config.http_timeout,
            http,
        })
    }

    /// Client for a custom provider URL with the default request timeout
    pub fn with_url(url: String) -> Result<Self, ApiError> {
        Self::new(&ClientConfig {
            rates_url: url,
            ..ClientConfig::default()
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the current rate for `local_code` (local units per 1 USD).
    /// Called once per session; the caller keeps the result.
    pub async fn fetch_rate(&self, local_code: &str) -> Result<ExchangeRate, RateError> {
        let response = self.http.get(&self.url).send().await.map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Rate provider answered {}", status);
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: None,
            }
            .into());
        }

        let payload = response
            .json::<ExchangeRatesResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let rate = rate_from_payload(&payload, local_code)?;
        info!("Loaded exchange rate: 1 USD = {} {}", rate.local_per_usd(), local_code);
        Ok(rate)
    }
}

fn rate_from_payload(payload: &ExchangeRatesResponse, local_code: &str) -> Result<ExchangeRate, RateError> {
    let code = local_code.to_uppercase();
    let value = *payload
        .rates
        .get(&code)
        .ok_or_else(|| RateError::MissingCurrency(code.clone()))?;

    ExchangeRate::new(value).map_err(|e| match e {
        CurrencyError::InvalidRate | CurrencyError::RateUnavailable => {
            RateError::InvalidRate { code, value }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn payload(pairs: &[(&str, f64)]) -> ExchangeRatesResponse {
        ExchangeRatesResponse {
            rates: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_rate_for_local_code() {
        let rates = payload(&[("USD", 1.0), ("UZS", 12_650.0)]);
        let rate = rate_from_payload(&rates, "uzs").unwrap();
        assert_eq!(rate.local_per_usd(), 12_650.0);
    }

    #[test]
    fn test_custom_url_keeps_default_timeout() {
        let client = ExchangeRateClient::with_url("http://127.0.0.1:9/latest/USD".to_string()).unwrap();
        assert_eq!(client.timeout(), ClientConfig::default().http_timeout);
    }

    #[test]
    fn test_missing_code() {
        let rates = payload(&[("USD", 1.0)]);
        assert_eq!(
            rate_from_payload(&rates, "UZS"),
            Err(RateError::MissingCurrency("UZS".to_string()))
        );
    }

    #[test]
    fn test_non_positive_rate_is_rejected() {
        let rates = payload(&[("UZS", 0.0)]);
        assert!(matches!(
            rate_from_payload(&rates, "UZS"),
            Err(RateError::InvalidRate { .. })
        ));
    }
}
