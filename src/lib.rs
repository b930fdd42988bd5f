//! Core library for the `twist-loadtest` CLI.
//!
//! The binary drives everything; the library re-exposes the building blocks
//! (load shape, task catalog, virtual users, run engine, metrics and
//! reporting) so integration tests and embedders can assemble a run without
//! going through argument parsing.
pub mod args;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod session;
pub mod shape;
pub mod shutdown;
pub mod user;
pub mod web;
