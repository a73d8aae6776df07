//! # IO Module
//!
//! Adapters between the outside world and the domain services:
//!
//! - **rest**: Axum handlers and DTO mappers for the `/api` surface
//! - **messaging**: Outbound channels that deliver advance notices

pub mod messaging;
pub mod rest;
