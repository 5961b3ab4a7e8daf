//! Offline cache worker for the Zhwane Driving School site.
//!
//! This crate implements the site's offline shell as an ordinary,
//! host-testable library: versioned precache of the application shell,
//! network-first routing for navigations and API calls, cache-first
//! routing for static assets, background replay of booking submissions
//! queued while offline, and push notification presentation.
//!
//! The browser-facing surface is the [`platform`] event loop; in-process
//! hosts and tests drive [`worker::ServiceWorker`] directly through its
//! `on_*` methods.

pub mod cache;
pub mod config;
pub mod models;
pub mod net;
pub mod platform;
pub mod worker;

pub use cache::{CacheStore, SyncQueue};
pub use config::WorkerConfig;
pub use models::{Request, Response};
pub use net::{Fetch, FetchError, HttpClient};
pub use platform::{WorkerEvent, WorkerHandle, WorkerHost};
pub use worker::ServiceWorker;
