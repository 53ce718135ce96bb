//! Stocksheet Library
//!
//! This crate provides the core functionality for the Stocksheet warehouse
//! inventory tracker: a spreadsheet-backed remote store client, an
//! optimistic synchronization controller, and the read-side queries the
//! CLI is built from.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod queries;
pub mod services;

pub mod prelude {
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::models::*;
    pub use crate::queries::*;
    pub use crate::services::*;
}
