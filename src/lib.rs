//! Checklist and delegation dashboard library.
//!
//! This module exports the core components for testing and integration.
//! Reads flow one way: [`query`] builds a [`query::TaskQuery`], a
//! [`store::TaskStore`] answers it, and [`aggregate`], [`rollup`] and
//! [`views`] shape the results for [`state`] containers and the API.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod db;
pub mod directory;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod logging;
pub mod query;
pub mod rollup;
pub mod state;
pub mod store;
pub mod types;
pub mod views;
