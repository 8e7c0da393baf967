//! Authoritative registry and tally engine for a single election.
//!
//! The [`model::Registry`] owns every voter and candidate record and the
//! identity of the election commission. [`api::SharedRegistry`] serialises
//! calls from any number of threads against one registry and optionally
//! persists it after each change.

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate registry_test;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use api::{Operation, Outcome, SharedRegistry};
pub use config::Config;
pub use error::{Error, Result};
