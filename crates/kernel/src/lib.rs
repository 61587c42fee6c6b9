//! Voltcart catalog kernel library.
//!
//! Product filtering and listing for the storefront. The main entry point
//! for running the server is the `voltcart` binary.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
