//! Commissioning rollup engine.
//!
//! Rolls Plan, Rephase and Actual commissioning records of a renewable
//! energy portfolio up into KPIs, period comparisons, trend series and
//! summary tables for one fiscal year, and reports duplicate, incomplete
//! and malformed records along the way.
//!
//! The [`engine`] is pure and synchronous. [`store`] models the record
//! lifecycle, [`input`] decodes snapshots and [`report`] assembles and
//! renders the result.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod models;
pub mod report;
pub mod store;
