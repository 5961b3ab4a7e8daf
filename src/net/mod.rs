//! Network module: the worker's seam to the live network.
//!
//! This module provides the `Fetch` trait the router and sync agent go
//! through for every live request, and `HttpClient`, the reqwest-backed
//! implementation used in production. Tests substitute stub fetchers.

pub mod client;
pub mod error;

pub use client::{Fetch, HttpClient};
pub use error::FetchError;
