//! # Storage Module
//!
//! SQLite persistence for events, the append-only advance history, advance
//! idempotency records and the notification log.
//!
//! - **connection**: Pool setup and schema creation
//! - **traits**: Storage interfaces the domain services depend on
//! - **repositories**: SQLite implementations of those interfaces
//!
//! Queries are built at runtime with `sqlx::query` and explicit binds.

pub mod connection;
pub mod repositories;
pub mod traits;

pub use connection::DbConnection;
pub use repositories::{EventRepository, NotificationRepository};
pub use traits::{EventStorage, NotificationLogStorage};
