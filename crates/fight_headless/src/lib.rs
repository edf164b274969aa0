//! # Fight Headless
//!
//! Runs fights without any frontend: scenarios in, a JSON report out.
//! Designed for CI verification, replay checking and balance passes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod driver;
pub mod scenario;
