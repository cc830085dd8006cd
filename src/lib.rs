//! `plant-monitor` library crate.
//!
//! The polling-and-alerting core of the plant monitoring dashboard:
//! a scheduler samples a [`source::ParameterSource`] on a fixed interval,
//! the [`store::StateStore`] keeps the latest reading per parameter, and
//! [`evaluator::evaluate`] turns a snapshot into the read model the UI
//! renders. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod scheduler;
pub mod server;
pub mod source;
pub mod store;
