//! # Gymgate Worker Library
//!
//! This library provides the scheduled side of the attendance engine:
//! the nightly auto-checkout sweep that closes sessions members forgot
//! to scan out of.
//!
//! ## Modules
//!
//! - `config`: Worker configuration from environment variables
//! - `sweeper`: Daily sweep scheduler

pub mod config;
pub mod sweeper;
