//! # Domain Module
//!
//! Business logic of the advance ledger and the notification dispatcher.
//!
//! ## Module Organization
//!
//! - **currency**: Two-currency conversion against a single exchange rate, display formatting
//! - **advance_delta**: Pure add/subtract/set delta calculation with bounds checks
//! - **advance_ledger**: Submit-then-refetch client for an event's advance balance
//! - **notification_dispatcher**: Single-flight payment notice sending with local history
//! - **reconciliation**: Merging optimistic local history with the server log
//! - **single_flight**: Single-slot and per-key in-flight guards
//!
//! ## Business Rules
//!
//! - The advance is a single running balance per event; history is append-only
//! - "Set" is translated to an add or subtract before it reaches the server
//! - A balance may never go negative; exceeding the event total needs explicit confirmation
//! - At most one advance submission per event and one notice send per dispatcher at a time

pub mod advance_delta;
pub mod advance_ledger;
pub mod currency;
pub mod notification_dispatcher;
pub mod reconciliation;
pub mod single_flight;

pub use advance_delta::*;
pub use advance_ledger::*;
pub use currency::*;
pub use notification_dispatcher::*;
pub use reconciliation::*;
pub use single_flight::*;
