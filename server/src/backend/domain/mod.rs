//! # Domain Module
//!
//! Business rules for events, their advance balance and advance notices.
//!
//! ## Module Organization
//!
//! - **event_service**: Event creation and lookup
//! - **advance_service**: Validated, versioned and idempotent advance writes
//! - **notification_service**: Notice delivery with per-phone single flight and the attempt log
//! - **message_templates**: Rendering of the notice text
//! - **phone**: Normalization of recipient numbers
//! - **commands** / **models**: Inputs and entities the services work with
//!
//! ## Business Rules
//!
//! - The advance never becomes negative
//! - The advance keeps one currency once money has moved
//! - History is append-only; every write adds exactly one entry and bumps the version
//! - A write carrying an already applied idempotency key changes nothing

pub mod advance_service;
pub mod commands;
pub mod errors;
pub mod event_service;
pub mod message_templates;
pub mod models;
pub mod notification_service;
pub mod phone;

pub use advance_service::AdvanceService;
pub use errors::DomainError;
pub use event_service::EventService;
pub use notification_service::NotificationService;
