//! # Event Console Client
//!
//! Client-side core of the event console: the advance-payment ledger and the
//! payment notice dispatcher. Everything here is UI-agnostic; a screen drives
//! these types and renders whatever state they hand back.
//!
//! ## Module Organization
//!
//! - **domain**: Currency conversion, delta calculation, the ledger, the dispatcher
//!   and history reconciliation
//! - **services**: REST client for the event API and the exchange-rate client
//! - **config**: Environment-driven client configuration
//! - **error**: Error types shared by the services and the domain
//!
//! ## Flow
//!
//! ```text
//! UI action -> compute_delta (validate) -> AdvanceLedger (submit, refetch) -> UI
//! UI action -> NotificationDispatcher (single send) -> local history -> refresh_log
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod services;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::ClientConfig;
pub use domain::*;
pub use error::{ApiError, LedgerError};
pub use services::{ApiClient, EventsApi, ExchangeRateClient};
