//! HTTP services: the event API client and the exchange-rate client.

pub mod api;
pub mod rates;

pub use api::{ApiClient, EventsApi};
pub use rates::{ExchangeRateClient, RateError};
